//! Discount eligibility classification.
//!
//! Each purchase is resolved to its governing snapshot week, checked for
//! membership, priced, and labelled by the first matching rule in
//! [`STATUS_RULES`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::chain::{Asset, Chain};
use crate::denomination::{DenominationTable, FaceValue};
use crate::pricing::FeePolicy;
use crate::snapshot::SnapshotTimeline;
use crate::transaction::Transaction;
use crate::window::WeekNumber;

/// Payment noise absorbed when comparing paid amount with the VIP price.
pub const DEFAULT_TOLERANCE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountStatus {
    /// Purchased before the discount program began.
    BeforeActivity,
    /// No snapshot for the week, or the payer was not in it.
    NotInSnapshot,
    /// Eligible and paid no more than the VIP price plus tolerance.
    DiscountHonored,
    /// Eligible but paid above the VIP price plus tolerance; needs follow-up.
    DiscountMissed,
}

impl DiscountStatus {
    pub const ALL: [DiscountStatus; 4] = [
        DiscountStatus::BeforeActivity,
        DiscountStatus::NotInSnapshot,
        DiscountStatus::DiscountHonored,
        DiscountStatus::DiscountMissed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeActivity => "BEFORE_ACTIVITY",
            Self::NotInSnapshot => "NOT_IN_SNAPSHOT",
            Self::DiscountHonored => "DISCOUNT_HONORED",
            Self::DiscountMissed => "DISCOUNT_MISSED",
        }
    }
}

impl fmt::Display for DiscountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown status: {s}"))
    }
}

/// Inputs the status rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facts {
    pub before_activity: bool,
    pub in_snapshot: bool,
    /// `vip_price - actual_paid`.
    pub savings: Decimal,
    pub tolerance: Decimal,
}

/// One guard/status pair of the decision list.
#[derive(Clone, Copy)]
pub struct StatusRule {
    pub status: DiscountStatus,
    pub guard: fn(&Facts) -> bool,
}

impl fmt::Debug for StatusRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusRule").field("status", &self.status).finish()
    }
}

fn before_activity(facts: &Facts) -> bool {
    facts.before_activity
}

fn not_in_snapshot(facts: &Facts) -> bool {
    !facts.in_snapshot
}

// Underpaying the VIP price also lands here.
fn within_vip_price(facts: &Facts) -> bool {
    facts.savings >= -facts.tolerance
}

fn always(_: &Facts) -> bool {
    true
}

/// Evaluated top-down; first match wins. The last rule is the catch-all.
pub const STATUS_RULES: [StatusRule; 4] = [
    StatusRule { status: DiscountStatus::BeforeActivity, guard: before_activity },
    StatusRule { status: DiscountStatus::NotInSnapshot, guard: not_in_snapshot },
    StatusRule { status: DiscountStatus::DiscountHonored, guard: within_vip_price },
    StatusRule { status: DiscountStatus::DiscountMissed, guard: always },
];

pub fn decide(facts: &Facts) -> DiscountStatus {
    STATUS_RULES
        .iter()
        .find(|rule| (rule.guard)(facts))
        .map(|rule| rule.status)
        .unwrap_or(DiscountStatus::DiscountMissed)
}

/// Outcome for one card purchase. A pure function of its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedPurchase {
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    pub chain: Chain,
    pub wallet: Address,
    pub asset: Asset,
    pub tx_hash: String,
    pub face_value: FaceValue,
    pub actual_paid: Decimal,
    pub normal_price: Decimal,
    pub vip_price: Decimal,
    pub discount_entitlement: Decimal,
    pub savings: Decimal,
    pub snapshot_week: WeekNumber,
    pub in_snapshot: bool,
    pub is_after_activity: bool,
    pub status: DiscountStatus,
}

impl ClassifiedPurchase {
    /// Total output order: time, then hash, then the fields that tell apart
    /// several transfers carried by one transaction.
    pub fn sort_key(&self) -> (DateTime<Utc>, &str, Chain, &Address, Asset, Decimal) {
        (
            self.timestamp,
            &self.tx_hash,
            self.chain,
            &self.wallet,
            self.asset,
            self.actual_paid,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    denominations: DenominationTable,
    fees: FeePolicy,
    activity_start: NaiveDate,
    tolerance: Decimal,
}

impl Classifier {
    pub fn new(activity_start: NaiveDate) -> Self {
        Self {
            denominations: DenominationTable::default(),
            fees: FeePolicy::default(),
            activity_start,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_denominations(mut self, denominations: DenominationTable) -> Self {
        self.denominations = denominations;
        self
    }

    pub fn with_fees(mut self, fees: FeePolicy) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_tolerance(mut self, tolerance: Decimal) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn activity_start(&self) -> NaiveDate {
        self.activity_start
    }

    pub fn denominations(&self) -> &DenominationTable {
        &self.denominations
    }

    /// Bucket, resolve and classify. `None` when the amount matches no denomination.
    pub fn evaluate(&self, tx: &Transaction, timeline: &SnapshotTimeline) -> Option<ClassifiedPurchase> {
        let face_value = self.denominations.classify(tx.amount)?;
        let week = timeline.window().resolve_week(tx.timestamp);
        Some(self.classify(tx, face_value, week, timeline))
    }

    /// Classify a purchase already bucketed to `face_value` and resolved to `week`.
    pub fn classify(
        &self,
        tx: &Transaction,
        face_value: FaceValue,
        week: WeekNumber,
        timeline: &SnapshotTimeline,
    ) -> ClassifiedPurchase {
        let quote = self.fees.price(face_value);
        let date = tx.date();
        let is_after_activity = date >= self.activity_start;
        let in_snapshot = timeline.is_eligible(week, &tx.from);
        let savings = quote.vip_price - tx.amount;

        let status = decide(&Facts {
            before_activity: !is_after_activity,
            in_snapshot,
            savings,
            tolerance: self.tolerance,
        });

        ClassifiedPurchase {
            timestamp: tx.timestamp,
            date,
            chain: tx.chain,
            wallet: tx.from.clone(),
            asset: tx.asset,
            tx_hash: tx.tx_hash.clone(),
            face_value,
            actual_paid: tx.amount,
            normal_price: quote.normal_price,
            vip_price: quote.vip_price,
            discount_entitlement: quote.discount_entitlement(),
            savings,
            snapshot_week: week,
            in_snapshot,
            is_after_activity,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn facts(before_activity: bool, in_snapshot: bool, savings: &str) -> Facts {
        Facts { before_activity, in_snapshot, savings: d(savings), tolerance: DEFAULT_TOLERANCE }
    }

    #[test]
    fn test_default_tolerance() {
        assert_eq!(DEFAULT_TOLERANCE, d("0.5"));
    }

    #[test]
    fn test_rule_priority_order() {
        let order: Vec<_> = STATUS_RULES.iter().map(|r| r.status).collect();
        assert_eq!(order, DiscountStatus::ALL);
    }

    #[test]
    fn test_before_activity_beats_everything() {
        assert_eq!(decide(&facts(true, true, "0")), DiscountStatus::BeforeActivity);
        assert_eq!(decide(&facts(true, false, "-50")), DiscountStatus::BeforeActivity);
    }

    #[test]
    fn test_not_in_snapshot() {
        assert_eq!(decide(&facts(false, false, "0")), DiscountStatus::NotInSnapshot);
        assert_eq!(decide(&facts(false, false, "-1.2")), DiscountStatus::NotInSnapshot);
    }

    #[test]
    fn test_tolerance_boundary() {
        assert_eq!(decide(&facts(false, true, "-0.5")), DiscountStatus::DiscountHonored);
        assert_eq!(decide(&facts(false, true, "-0.51")), DiscountStatus::DiscountMissed);
        assert_eq!(decide(&facts(false, true, "0.3")), DiscountStatus::DiscountHonored);
    }

    // Paying far below the VIP price is not distinguished from a correct discount.
    #[test]
    fn test_underpayment_counts_as_honored() {
        assert_eq!(decide(&facts(false, true, "20")), DiscountStatus::DiscountHonored);
    }

    #[test]
    fn test_status_names() {
        for status in DiscountStatus::ALL {
            assert_eq!(status.as_str().parse::<DiscountStatus>().unwrap(), status);
        }
        assert_eq!("discount_missed".parse::<DiscountStatus>().unwrap(), DiscountStatus::DiscountMissed);
    }
}
