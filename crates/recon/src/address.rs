//! Chain account identifiers.
//!
//! Two families exist and are never compared with each other: EVM hex
//! addresses (normalized to lowercase) and Solana base58 addresses (kept
//! verbatim, case-sensitive).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::outcome::RejectReason;

/// Length of an EVM address including the `0x` prefix.
pub const EVM_ADDRESS_LEN: usize = 42;

/// Solana addresses shorter than or equal to this are treated as malformed.
pub const SOLANA_MIN_EXCLUSIVE_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChainFamily {
    Evm,
    Solana,
}

/// Lowercased `0x`-prefixed hex account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvmAddress(String);

impl EvmAddress {
    pub fn parse(raw: &str) -> Result<Self, RejectReason> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(RejectReason::MissingField);
        }
        if !normalized.starts_with("0x") || normalized.len() != EVM_ADDRESS_LEN {
            return Err(RejectReason::MalformedAddress);
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Base58 Solana account, stored exactly as supplied (minus surrounding whitespace).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolanaAddress(String);

impl SolanaAddress {
    pub fn parse(raw: &str) -> Result<Self, RejectReason> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RejectReason::MissingField);
        }
        if trimmed.len() <= SOLANA_MIN_EXCLUSIVE_LEN {
            return Err(RejectReason::MalformedAddress);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An account of either family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Address {
    Evm(EvmAddress),
    Solana(SolanaAddress),
}

impl Address {
    /// Parse `raw` under the normalization rules of `family`.
    pub fn parse(family: ChainFamily, raw: &str) -> Result<Self, RejectReason> {
        match family {
            ChainFamily::Evm => EvmAddress::parse(raw).map(Self::Evm),
            ChainFamily::Solana => SolanaAddress::parse(raw).map(Self::Solana),
        }
    }

    pub fn family(&self) -> ChainFamily {
        match self {
            Self::Evm(_) => ChainFamily::Evm,
            Self::Solana(_) => ChainFamily::Solana,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Evm(a) => a.as_str(),
            Self::Solana(a) => a.as_str(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
