//! Batch reconciliation: filter the feed, classify in parallel, aggregate.

use rayon::prelude::*;
use serde::Serialize;
use vippulse_core::AppError;

use crate::chain::{Asset, Direction};
use crate::classifier::{ClassifiedPurchase, Classifier};
use crate::report::{Report, aggregate};
use crate::snapshot::SnapshotTimeline;
use crate::transaction::{Feed, Transaction};

/// Why a feed transaction did not reach classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exclusion {
    Outflow,
    UnsupportedAsset,
    UnknownPayer,
    NoDenomination,
}

/// Counts of feed transactions left out of the classified set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Exclusions {
    pub outflow: usize,
    pub unsupported_asset: usize,
    pub unknown_payer: usize,
    pub no_denomination: usize,
}

impl Exclusions {
    fn record(&mut self, exclusion: Exclusion) {
        match exclusion {
            Exclusion::Outflow => self.outflow += 1,
            Exclusion::UnsupportedAsset => self.unsupported_asset += 1,
            Exclusion::UnknownPayer => self.unknown_payer += 1,
            Exclusion::NoDenomination => self.no_denomination += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.outflow + self.unsupported_asset + self.unknown_payer + self.no_denomination
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    /// Sorted by [`ClassifiedPurchase::sort_key`].
    pub purchases: Vec<ClassifiedPurchase>,
    pub report: Report,
    pub exclusions: Exclusions,
    /// The feed was flagged as possibly incomplete.
    pub partial: bool,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    classifier: Classifier,
    supported_assets: Vec<Asset>,
    holders_only: bool,
}

impl Pipeline {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            supported_assets: Asset::SUPPORTED.to_vec(),
            holders_only: false,
        }
    }

    pub fn with_supported_assets(mut self, assets: Vec<Asset>) -> Self {
        self.supported_assets = assets;
        self
    }

    /// Restrict classification to payers present in at least one snapshot.
    pub fn holders_only(mut self, holders_only: bool) -> Self {
        self.holders_only = holders_only;
        self
    }

    fn screen(&self, tx: &Transaction, timeline: &SnapshotTimeline) -> Result<ClassifiedPurchase, Exclusion> {
        if tx.direction != Direction::Inflow {
            return Err(Exclusion::Outflow);
        }
        if !self.supported_assets.contains(&tx.asset) {
            return Err(Exclusion::UnsupportedAsset);
        }
        if self.holders_only && !timeline.is_known_holder(&tx.from) {
            return Err(Exclusion::UnknownPayer);
        }
        self.classifier
            .evaluate(tx, timeline)
            .ok_or(Exclusion::NoDenomination)
    }

    /// Classify every card purchase in `feed` against `timeline`.
    ///
    /// Fails only when a required input is absent altogether; per-record
    /// problems are counted in [`Exclusions`].
    pub fn run(&self, feed: &Feed, timeline: &SnapshotTimeline) -> Result<Analysis, AppError> {
        if timeline.is_empty() {
            return Err(AppError::NoSnapshots);
        }
        if feed.is_empty() {
            return Err(AppError::NoTransactions);
        }

        let outcomes: Vec<Result<ClassifiedPurchase, Exclusion>> = feed
            .transactions
            .par_iter()
            .map(|tx| self.screen(tx, timeline))
            .collect();

        let mut exclusions = Exclusions::default();
        let mut purchases = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(purchase) => purchases.push(purchase),
                Err(exclusion) => exclusions.record(exclusion),
            }
        }
        purchases.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let report = aggregate(
            &purchases,
            self.classifier.activity_start(),
            timeline.distinct_holders(),
        );

        let partial = !feed.complete;
        if partial {
            tracing::warn!(
                transactions = feed.transactions.len(),
                "Feed flagged as possibly incomplete; results are partial"
            );
        }
        tracing::info!(
            classified = purchases.len(),
            excluded = exclusions.total(),
            exceptions = report.exceptions.len(),
            weeks = timeline.len(),
            "Reconciliation complete"
        );

        Ok(Analysis { purchases, report, exclusions, partial })
    }
}
