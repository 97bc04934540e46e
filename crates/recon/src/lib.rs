//! Reconciliation of card-purchase payments against weekly NFT holder snapshots.
//!
//! Flow: [`snapshot`] builds the week-indexed holder timeline; each feed
//! [`transaction`] is bucketed by [`denomination`], mapped to its governing
//! week by [`window`], priced by [`pricing`] and labelled by [`classifier`];
//! [`report`] folds the results and [`pipeline`] ties the steps together.

pub mod address;
pub mod chain;
pub mod classifier;
pub mod denomination;
pub mod outcome;
pub mod pipeline;
pub mod pricing;
pub mod report;
pub mod snapshot;
pub mod transaction;
pub mod window;

pub use address::{Address, ChainFamily, EvmAddress, SolanaAddress};
pub use chain::{Asset, Chain, Direction};
pub use classifier::{ClassifiedPurchase, Classifier, DiscountStatus, STATUS_RULES};
pub use denomination::{DenominationBand, DenominationTable, FaceValue};
pub use outcome::{ParseOutcome, RejectReason};
pub use pipeline::{Analysis, Exclusions, Pipeline};
pub use pricing::{FeePolicy, Quote};
pub use report::{DailyChainSummary, DenominationSummary, Overview, Report};
pub use snapshot::{BuildReport, SnapshotRow, SnapshotTimeline, WeeklySnapshot};
pub use transaction::{Feed, Transaction};
pub use window::{PRE_ACTIVITY_WEEK, SnapshotWindow, WeekNumber};
