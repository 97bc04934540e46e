//! Chain, direction and asset vocabulary shared by the feed and the snapshot extracts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::ChainFamily;
use crate::outcome::RejectReason;

/// GGUSD contract, identical across the EVM chains.
const GGUSD_CONTRACT: &str = "0xffffff9936bd58a008855b0812b44d2c8dffe2aa";

/// BSC-USD (reported as BUSD) on BNB Chain.
const BSC_USD_CONTRACT: &str = "0x55d398326f99059ff775485246999027b3197955";

/// Chains the payment service receives on, named as the feed names them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Chain {
    #[serde(rename = "Ethereum")]
    Ethereum,
    #[serde(rename = "BNB Chain")]
    BnbChain,
    #[serde(rename = "Polygon")]
    Polygon,
    #[serde(rename = "Solana")]
    Solana,
}

impl Chain {
    pub const ALL: [Chain; 4] = [Chain::Ethereum, Chain::BnbChain, Chain::Polygon, Chain::Solana];

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum",
            Self::BnbChain => "BNB Chain",
            Self::Polygon => "Polygon",
            Self::Solana => "Solana",
        }
    }

    pub fn family(self) -> ChainFamily {
        match self {
            Self::Solana => ChainFamily::Solana,
            Self::Ethereum | Self::BnbChain | Self::Polygon => ChainFamily::Evm,
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|chain| chain.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown chain: {s}"))
    }
}

/// Chain column of a holder extract (`sol`, `pol`, `bnb`, `eth`).
pub fn family_for_tag(tag: &str) -> Result<ChainFamily, RejectReason> {
    match tag.trim().to_lowercase().as_str() {
        "" => Err(RejectReason::MissingField),
        "sol" => Ok(ChainFamily::Solana),
        "pol" | "bnb" | "eth" => Ok(ChainFamily::Evm),
        _ => Err(RejectReason::UnknownChainTag),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inflow,
    Outflow,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inflow" => Ok(Self::Inflow),
            "outflow" => Ok(Self::Outflow),
            other => Err(format!("unknown direction: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    Usdc,
    Usdt,
    Ggusd,
    Busd,
    Other,
}

impl Asset {
    /// Stablecoins accepted for card purchases.
    pub const SUPPORTED: [Asset; 3] = [Asset::Usdc, Asset::Usdt, Asset::Ggusd];

    /// Identify a token from its transfer metadata. Contract address wins over symbol.
    pub fn identify(symbol: &str, contract: &str) -> Self {
        let contract = contract.trim().to_lowercase();
        if contract == GGUSD_CONTRACT {
            return Self::Ggusd;
        }
        if contract == BSC_USD_CONTRACT {
            return Self::Busd;
        }

        let symbol = symbol.to_uppercase();
        if symbol.contains("GGUSD") {
            Self::Ggusd
        } else if symbol.contains("BUSD") || symbol.contains("BSC-USD") {
            Self::Busd
        } else if symbol.contains("USDT") {
            Self::Usdt
        } else if symbol.contains("USDC") {
            Self::Usdc
        } else {
            Self::Other
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Usdc => "USDC",
            Self::Usdt => "USDT",
            Self::Ggusd => "GGUSD",
            Self::Busd => "BUSD",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Asset {
    type Err = String;

    /// Parses the already-normalized symbol column of the feed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::identify(s, ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_round_trip_names() {
        for chain in Chain::ALL {
            assert_eq!(chain.display_name().parse::<Chain>().unwrap(), chain);
        }
        assert_eq!("bnb chain".parse::<Chain>().unwrap(), Chain::BnbChain);
        assert!("Arbitrum".parse::<Chain>().is_err());
    }

    #[test]
    fn test_chain_families() {
        assert_eq!(Chain::Polygon.family(), ChainFamily::Evm);
        assert_eq!(Chain::Solana.family(), ChainFamily::Solana);
    }

    #[test]
    fn test_snapshot_tags() {
        assert_eq!(family_for_tag("sol"), Ok(ChainFamily::Solana));
        assert_eq!(family_for_tag(" ETH "), Ok(ChainFamily::Evm));
        assert_eq!(family_for_tag("pol"), Ok(ChainFamily::Evm));
        assert_eq!(family_for_tag("bnb"), Ok(ChainFamily::Evm));
        assert_eq!(family_for_tag("arb"), Err(RejectReason::UnknownChainTag));
        assert_eq!(family_for_tag(""), Err(RejectReason::MissingField));
    }

    #[test]
    fn test_asset_identification() {
        assert_eq!(Asset::identify("whatever", "0xFFFFFF9936BD58A008855B0812B44D2C8DFFE2AA"), Asset::Ggusd);
        assert_eq!(Asset::identify("USDT", BSC_USD_CONTRACT), Asset::Busd);
        assert_eq!(Asset::identify("BSC-USD", ""), Asset::Busd);
        assert_eq!(Asset::identify("USDT0", ""), Asset::Usdt);
        assert_eq!(Asset::identify("usdc.e", ""), Asset::Usdc);
        assert_eq!(Asset::identify("WETH", ""), Asset::Other);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("Inflow".parse::<Direction>().unwrap(), Direction::Inflow);
        assert!("sideways".parse::<Direction>().is_err());
    }
}
