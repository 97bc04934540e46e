use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::address::Address;
use crate::chain::{Asset, Chain, Direction};
use crate::outcome::RejectReason;

/// One normalized payment transfer as delivered by the chain fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub timestamp: DateTime<Utc>,
    pub chain: Chain,
    pub from: Address,
    pub asset: Asset,
    pub amount: Decimal,
    pub direction: Direction,
    pub tx_hash: String,
}

impl Transaction {
    /// Build a transaction, parsing the payer under `chain`'s address family.
    pub fn new(
        timestamp: DateTime<Utc>,
        chain: Chain,
        from: &str,
        asset: Asset,
        amount: Decimal,
        direction: Direction,
        tx_hash: impl Into<String>,
    ) -> Result<Self, RejectReason> {
        Ok(Self {
            timestamp,
            chain,
            from: Address::parse(chain.family(), from)?,
            asset,
            amount,
            direction,
            tx_hash: tx_hash.into(),
        })
    }

    /// UTC calendar date of the transfer.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// A finite batch of transactions for one historical window.
#[derive(Debug, Clone, Default)]
pub struct Feed {
    pub transactions: Vec<Transaction>,
    /// `false` when the fetcher hit pagination or rate limits and the batch may be truncated.
    pub complete: bool,
}

impl Feed {
    pub fn complete(transactions: Vec<Transaction>) -> Self {
        Self { transactions, complete: true }
    }

    pub fn partial(transactions: Vec<Transaction>) -> Self {
        Self { transactions, complete: false }
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
