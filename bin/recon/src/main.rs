//! vippulse reconciliation runner: matches card purchases against weekly
//! holder snapshots and reports missed VIP discounts.
//!
//! Flow per pass:
//! 1. Load the weekly holder extracts into a snapshot timeline
//! 2. Load the normalized transaction feed
//! 3. Classify and aggregate on a blocking thread
//! 4. Export CSV tables, then persist to PostgreSQL when configured
//!
//! Without `--once` the pass repeats every `REFRESH_INTERVAL_SECS` until Ctrl-C.

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use clap::Parser;
use eyre::Result;
use vippulse_core::{AppError, Settings, telemetry};
use vippulse_recon::{
    Analysis, Classifier, DiscountStatus, Pipeline, SnapshotTimeline, SnapshotWindow,
};
use vippulse_storage::{self as storage, PgPool, export, feed, models::*, snapshots};

#[derive(Debug, Parser)]
#[command(name = "recon", about = "Reconcile VIP card purchases against holder snapshots")]
struct Args {
    /// Run a single pass and exit.
    #[arg(long)]
    once: bool,

    /// Skip database persistence even if DATABASE_URL is set.
    #[arg(long)]
    no_db: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Initialisation ──────────────────────────────────────────────────
    telemetry::init();
    let args = Args::parse();
    let settings = Settings::from_env()?;

    tracing::info!(
        feed = %settings.feed_path.display(),
        snapshots = %settings.snapshot_dir.display(),
        activity_start = %settings.activity_start,
        "Starting vippulse reconciliation"
    );

    let pool = match (&settings.database_url, args.no_db) {
        (Some(url), false) => {
            let pool = storage::connect(url).await?;
            storage::migrate(&pool).await?;
            tracing::info!("Database ready");
            Some(pool)
        }
        _ => {
            tracing::info!("No database configured, results go to CSV only");
            None
        }
    };

    let pipeline = Pipeline::new(Classifier::new(settings.activity_start))
        .holders_only(settings.holders_only);

    if args.once {
        run_pass(&settings, &pipeline, pool.as_ref()).await?;
        return Ok(());
    }

    // ── Refresh Loop ────────────────────────────────────────────────────
    let refresh = Duration::from_secs(settings.refresh_interval_secs);
    let retry = Duration::from_secs(settings.retry_delay_secs);
    tracing::info!(interval_secs = refresh.as_secs(), "Starting refresh loop");

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let delay = tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully…");
                break;
            }
            result = run_pass(&settings, &pipeline, pool.as_ref()) => match result {
                Ok(()) => refresh,
                Err(e) => {
                    log_pass_failure(&e);
                    retry
                }
            }
        };

        tracing::info!(secs = delay.as_secs(), "Waiting for next pass");
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down gracefully…");
                break;
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }

    tracing::info!("Reconciliation stopped.");
    Ok(())
}

fn log_pass_failure(e: &eyre::Report) {
    match e.downcast_ref::<AppError>() {
        Some(app) if app.is_unavailable() => {
            tracing::warn!(reason = %app, "Analysis unavailable, retrying later")
        }
        _ => tracing::error!(error = %e, "Reconciliation pass failed, retrying later"),
    }
}

/// One full load → classify → export → persist pass.
async fn run_pass(settings: &Settings, pipeline: &Pipeline, pool: Option<&PgPool>) -> Result<()> {
    let started_at = Utc::now();

    // ── Inputs ──────────────────────────────────────────────────────────
    let window = SnapshotWindow::new(
        settings.first_snapshot_at,
        TimeDelta::days(i64::from(settings.snapshot_period_days)),
    )?;
    let rows = snapshots::load_rows(&settings.snapshot_dir, &settings.snapshot_pattern)?;
    let (timeline, build) = SnapshotTimeline::build(window, rows);
    tracing::info!(
        weeks = timeline.len(),
        accepted = build.accepted,
        rejected = build.total_rejected(),
        "Snapshot timeline built"
    );

    let load = feed::load_feed(&settings.feed_path, settings.feed_complete)?;

    // ── Classification ──────────────────────────────────────────────────
    let snapshot_weeks = timeline.len();
    let pipeline = pipeline.clone();
    let analysis = tokio::task::spawn_blocking(move || pipeline.run(&load.feed, &timeline)).await??;

    log_overview(&analysis);

    // ── Outputs ─────────────────────────────────────────────────────────
    export::export_all(&settings.output_dir, &analysis)?;

    if let Some(pool) = pool {
        let run = NewAnalysisRun::from_analysis(&analysis, snapshot_weeks, started_at);
        let purchases: Vec<NewPurchase> = analysis.purchases.iter().map(NewPurchase::from).collect();
        storage::repos::replace_results(pool, &run, &purchases)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
    }

    Ok(())
}

fn log_overview(analysis: &Analysis) {
    let o = &analysis.report.overview;
    tracing::info!(
        known_holders = o.known_holders_evm + o.known_holders_solana,
        paying_wallets = o.paying_wallets_evm + o.paying_wallets_solana,
        cards = o.card_count,
        face_value = %o.face_value_sum,
        normal_price = %o.normal_price_sum.round_dp(2),
        vip_price = %o.vip_price_sum.round_dp(2),
        actual_paid = %o.actual_paid_sum.round_dp(2),
        entitlement = %o.discount_entitlement_sum.round_dp(2),
        partial = analysis.partial,
        "Run overview"
    );
    tracing::info!(
        before_activity = o.count(DiscountStatus::BeforeActivity),
        not_in_snapshot = o.count(DiscountStatus::NotInSnapshot),
        honored = o.count(DiscountStatus::DiscountHonored),
        missed = o.count(DiscountStatus::DiscountMissed),
        "Discount status breakdown"
    );
    if let Some(savings) = o.mean_savings_missed {
        let mean_overpaid = (-savings).round_dp(2);
        tracing::warn!(
            exceptions = analysis.report.exceptions.len(),
            %mean_overpaid,
            "Eligible holders paid above the VIP price; check discount recognition"
        );
    }
}
