use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use vippulse_recon::{Analysis, ClassifiedPurchase};

// ─── Analysis Run ───────────────────────────────────────────────────────────

/// Metadata of one completed reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisRun {
    pub id: i64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub snapshot_weeks: i32,
    pub purchase_count: i64,
    pub exception_count: i64,
    pub excluded_count: i64,
    pub partial: bool,
}

/// Insert-ready run (no `id`).
#[derive(Debug, Clone)]
pub struct NewAnalysisRun {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub snapshot_weeks: i32,
    pub purchase_count: i64,
    pub exception_count: i64,
    pub excluded_count: i64,
    pub partial: bool,
}

impl NewAnalysisRun {
    pub fn from_analysis(analysis: &Analysis, snapshot_weeks: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: Utc::now(),
            snapshot_weeks: snapshot_weeks as i32,
            purchase_count: analysis.purchases.len() as i64,
            exception_count: analysis.report.exceptions.len() as i64,
            excluded_count: analysis.exclusions.total() as i64,
            partial: analysis.partial,
        }
    }
}

// ─── Classified Purchase ────────────────────────────────────────────────────

/// A persisted classification result.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PurchaseRow {
    pub id: i64,
    pub run_id: i64,
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    pub chain: String,
    pub wallet: String,
    pub asset: String,
    pub tx_hash: String,
    pub face_value: i32,
    pub actual_paid: Decimal,
    pub normal_price: Decimal,
    pub vip_price: Decimal,
    pub discount_entitlement: Decimal,
    pub savings: Decimal,
    pub snapshot_week: i32,
    pub in_snapshot: bool,
    pub is_after_activity: bool,
    pub status: String,
}

/// Insert-ready purchase (no `id` or `run_id`).
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub timestamp: DateTime<Utc>,
    pub date: NaiveDate,
    pub chain: String,
    pub wallet: String,
    pub asset: String,
    pub tx_hash: String,
    pub face_value: i32,
    pub actual_paid: Decimal,
    pub normal_price: Decimal,
    pub vip_price: Decimal,
    pub discount_entitlement: Decimal,
    pub savings: Decimal,
    pub snapshot_week: i32,
    pub in_snapshot: bool,
    pub is_after_activity: bool,
    pub status: String,
}

impl From<&ClassifiedPurchase> for NewPurchase {
    fn from(p: &ClassifiedPurchase) -> Self {
        Self {
            timestamp: p.timestamp,
            date: p.date,
            chain: p.chain.to_string(),
            wallet: p.wallet.to_string(),
            asset: p.asset.to_string(),
            tx_hash: p.tx_hash.clone(),
            face_value: p.face_value as i32,
            actual_paid: p.actual_paid,
            normal_price: p.normal_price,
            vip_price: p.vip_price,
            discount_entitlement: p.discount_entitlement,
            savings: p.savings,
            snapshot_week: p.snapshot_week as i32,
            in_snapshot: p.in_snapshot,
            is_after_activity: p.is_after_activity,
            status: p.status.to_string(),
        }
    }
}

// ─── Summaries ──────────────────────────────────────────────────────────────

/// Per day and chain totals, money rounded to cents.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailySummaryRow {
    pub date: NaiveDate,
    pub chain: String,
    pub card_count: i64,
    pub face_value_sum: Decimal,
    pub actual_paid_sum: Decimal,
    pub expected_paid_sum: Decimal,
    pub discount_sum: Decimal,
}

/// Per face value averages, money rounded to cents.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DenominationSummaryRow {
    pub face_value: i32,
    pub card_count: i64,
    pub mean_expected: Decimal,
    pub mean_actual: Decimal,
    pub mean_discount: Decimal,
}
