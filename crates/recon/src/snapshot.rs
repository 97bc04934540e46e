//! Weekly holder snapshots and the timeline that indexes them by week.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::address::{Address, EvmAddress, SolanaAddress};
use crate::chain::family_for_tag;
use crate::outcome::{ParseOutcome, RejectReason};
use crate::window::{PRE_ACTIVITY_WEEK, SnapshotWindow, WeekNumber};

static WEEK_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(st|nd|rd|th)\s+week").expect("static regex"));

/// Extract the ordinal week from a label such as `nft-owners-3rd week.tsv`.
pub fn parse_week_label(label: &str) -> Option<WeekNumber> {
    let caps = WEEK_LABEL.captures(label)?;
    let week: WeekNumber = caps.get(1)?.as_str().parse().ok()?;
    (week != PRE_ACTIVITY_WEEK).then_some(week)
}

/// One row of a weekly holder extract, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub week_label: String,
    pub chain_tag: Option<String>,
    pub holder: Option<String>,
}

impl SnapshotRow {
    pub fn new(week_label: impl Into<String>, chain_tag: Option<&str>, holder: Option<&str>) -> Self {
        Self {
            week_label: week_label.into(),
            chain_tag: chain_tag.map(str::to_string),
            holder: holder.map(str::to_string),
        }
    }

    /// Validate the row into a `(week, holder)` membership.
    pub fn parse(&self) -> ParseOutcome<(WeekNumber, Address)> {
        let Some(week) = parse_week_label(&self.week_label) else {
            return ParseOutcome::Rejected(RejectReason::UnparseableWeek);
        };
        let (Some(tag), Some(holder)) = (self.chain_tag.as_deref(), self.holder.as_deref()) else {
            return ParseOutcome::Rejected(RejectReason::MissingField);
        };
        family_for_tag(tag)
            .and_then(|family| Address::parse(family, holder))
            .map(|address| (week, address))
            .into()
    }
}

/// Eligible holders at one point in time. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklySnapshot {
    week: WeekNumber,
    evm: HashSet<EvmAddress>,
    solana: HashSet<SolanaAddress>,
}

impl WeeklySnapshot {
    pub fn new<I>(week: WeekNumber, holders: I) -> Self
    where
        I: IntoIterator<Item = Address>,
    {
        let mut snapshot = Self { week, ..Self::default() };
        holders.into_iter().for_each(|holder| snapshot.insert(holder));
        snapshot
    }

    fn insert(&mut self, holder: Address) {
        match holder {
            Address::Evm(addr) => {
                self.evm.insert(addr);
            }
            Address::Solana(addr) => {
                self.solana.insert(addr);
            }
        }
    }

    pub fn week(&self) -> WeekNumber {
        self.week
    }

    /// Membership is checked only within the address's own family.
    pub fn contains(&self, address: &Address) -> bool {
        match address {
            Address::Evm(addr) => self.evm.contains(addr),
            Address::Solana(addr) => self.solana.contains(addr),
        }
    }

    pub fn evm_count(&self) -> usize {
        self.evm.len()
    }

    pub fn solana_count(&self) -> usize {
        self.solana.len()
    }
}

/// Accepted and rejected row counts from one timeline build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub accepted: usize,
    pub rejected: BTreeMap<RejectReason, usize>,
}

impl BuildReport {
    pub fn record<T>(&mut self, outcome: &ParseOutcome<T>) {
        match outcome {
            ParseOutcome::Accepted(_) => self.accepted += 1,
            ParseOutcome::Rejected(reason) => *self.rejected.entry(*reason).or_default() += 1,
        }
    }

    pub fn total_rejected(&self) -> usize {
        self.rejected.values().sum()
    }
}

/// Week-indexed snapshots plus the window parameters that map instants to weeks.
/// Missing weeks mean "no snapshot, no eligibility".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotTimeline {
    window: SnapshotWindow,
    weeks: BTreeMap<WeekNumber, WeeklySnapshot>,
}

impl SnapshotTimeline {
    pub fn new<I>(window: SnapshotWindow, snapshots: I) -> Self
    where
        I: IntoIterator<Item = WeeklySnapshot>,
    {
        let weeks = snapshots.into_iter().map(|s| (s.week(), s)).collect();
        Self { window, weeks }
    }

    /// Aggregate extract rows into one snapshot per encountered week.
    /// Malformed rows are dropped and counted in the returned report.
    pub fn build<I>(window: SnapshotWindow, rows: I) -> (Self, BuildReport)
    where
        I: IntoIterator<Item = SnapshotRow>,
    {
        let mut report = BuildReport::default();
        let mut weeks: BTreeMap<WeekNumber, WeeklySnapshot> = BTreeMap::new();

        for row in rows {
            let outcome = row.parse();
            report.record(&outcome);
            match outcome {
                ParseOutcome::Accepted((week, holder)) => weeks
                    .entry(week)
                    .or_insert_with(|| WeeklySnapshot { week, ..WeeklySnapshot::default() })
                    .insert(holder),
                ParseOutcome::Rejected(reason) => {
                    tracing::debug!(label = %row.week_label, %reason, "Dropped snapshot row");
                }
            }
        }

        for snapshot in weeks.values() {
            tracing::debug!(
                week = snapshot.week(),
                evm = snapshot.evm_count(),
                solana = snapshot.solana_count(),
                "Snapshot week loaded"
            );
        }

        (Self { window, weeks }, report)
    }

    pub fn window(&self) -> &SnapshotWindow {
        &self.window
    }

    pub fn get(&self, week: WeekNumber) -> Option<&WeeklySnapshot> {
        self.weeks.get(&week)
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weeks.len()
    }

    pub fn week_numbers(&self) -> impl Iterator<Item = WeekNumber> + '_ {
        self.weeks.keys().copied()
    }

    /// Whether `address` was eligible in `week`. Week 0 and absent weeks are never eligible.
    pub fn is_eligible(&self, week: WeekNumber, address: &Address) -> bool {
        week != PRE_ACTIVITY_WEEK && self.get(week).is_some_and(|s| s.contains(address))
    }

    /// Whether `address` appears in any week.
    pub fn is_known_holder(&self, address: &Address) -> bool {
        self.weeks.values().any(|s| s.contains(address))
    }

    /// Distinct holders across all weeks, per family: `(evm, solana)`.
    pub fn distinct_holders(&self) -> (usize, usize) {
        let evm: HashSet<&EvmAddress> = self.weeks.values().flat_map(|s| s.evm.iter()).collect();
        let solana: HashSet<&SolanaAddress> =
            self.weeks.values().flat_map(|s| s.solana.iter()).collect();
        (evm.len(), solana.len())
    }
}
