//! CSV result tables for the dashboard and for manual follow-up.

use std::io::Write;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use vippulse_core::AppError;
use vippulse_recon::{Analysis, ClassifiedPurchase, DailyChainSummary, DenominationSummary};

pub const PURCHASES_FILE: &str = "vip_users_purchases.csv";
pub const EXCEPTIONS_FILE: &str = "vip_missing_discount_after_activity.csv";
pub const DAILY_FILE: &str = "vip_daily_summary.csv";
pub const DENOMINATIONS_FILE: &str = "vip_denomination_summary.csv";
pub const RUN_FILE: &str = "vip_run_summary.csv";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn csv_err(e: csv::Error) -> AppError {
    AppError::Input(format!("CSV write failed: {e}"))
}

pub fn write_purchases<W: Write>(writer: W, purchases: &[ClassifiedPurchase]) -> Result<(), AppError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "DateTime", "Date", "Chain", "Wallet", "Asset", "Card_Value", "Actual_Paid", "Expected_VIP",
        "Normal_User", "VIP_Discount", "Savings", "Snapshot_Week", "In_Snapshot", "Status",
        "After_Activity", "TxHash",
    ])
    .map_err(csv_err)?;

    for p in purchases {
        csv.write_record([
            p.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            p.date.to_string(),
            p.chain.to_string(),
            p.wallet.to_string(),
            p.asset.to_string(),
            p.face_value.to_string(),
            money(p.actual_paid),
            money(p.vip_price),
            money(p.normal_price),
            money(p.discount_entitlement),
            money(p.savings),
            p.snapshot_week.to_string(),
            p.in_snapshot.to_string(),
            p.status.to_string(),
            p.is_after_activity.to_string(),
            p.tx_hash.clone(),
        ])
        .map_err(csv_err)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_exceptions<W: Write>(writer: W, exceptions: &[ClassifiedPurchase]) -> Result<(), AppError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "DateTime", "Date", "Chain", "Wallet", "Asset", "Card_Value", "Actual_Paid", "Should_Paid",
        "Should_Discount", "Overpaid", "TxHash",
    ])
    .map_err(csv_err)?;

    for p in exceptions {
        csv.write_record([
            p.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            p.date.to_string(),
            p.chain.to_string(),
            p.wallet.to_string(),
            p.asset.to_string(),
            p.face_value.to_string(),
            money(p.actual_paid),
            money(p.vip_price),
            money(p.discount_entitlement),
            money(p.savings),
            p.tx_hash.clone(),
        ])
        .map_err(csv_err)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_daily<W: Write>(writer: W, rows: &[DailyChainSummary]) -> Result<(), AppError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Date", "Chain", "Cards", "Face_Value", "Actual_Paid", "Expected_Paid", "Discount"])
        .map_err(csv_err)?;
    for r in rows {
        csv.write_record([
            r.date.to_string(),
            r.chain.to_string(),
            r.card_count.to_string(),
            money(r.face_value_sum),
            money(r.actual_paid_sum),
            money(r.expected_paid_sum),
            money(r.discount_sum),
        ])
        .map_err(csv_err)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_denominations<W: Write>(writer: W, rows: &[DenominationSummary]) -> Result<(), AppError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["Card_Value", "Cards", "Mean_Expected", "Mean_Actual", "Mean_Discount"])
        .map_err(csv_err)?;
    for r in rows {
        csv.write_record([
            r.face_value.to_string(),
            r.card_count.to_string(),
            money(r.mean_expected),
            money(r.mean_actual),
            money(r.mean_discount),
        ])
        .map_err(csv_err)?;
    }
    csv.flush()?;
    Ok(())
}

/// One-row summary of the run: the partial flag and why feed rows were left out.
pub fn write_run_summary<W: Write>(writer: W, analysis: &Analysis) -> Result<(), AppError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record([
        "Partial", "Purchases", "Exceptions", "Excluded_Outflow", "Excluded_Unsupported_Asset",
        "Excluded_Unknown_Payer", "Excluded_No_Denomination",
    ])
    .map_err(csv_err)?;

    let x = &analysis.exclusions;
    csv.write_record([
        analysis.partial.to_string(),
        analysis.purchases.len().to_string(),
        analysis.report.exceptions.len().to_string(),
        x.outflow.to_string(),
        x.unsupported_asset.to_string(),
        x.unknown_payer.to_string(),
        x.no_denomination.to_string(),
    ])
    .map_err(csv_err)?;
    csv.flush()?;
    Ok(())
}

fn remove_stale(dir: &Path, name: &str) -> Result<(), AppError> {
    match std::fs::remove_file(dir.join(name)) {
        Ok(()) => {
            tracing::info!(file = name, "Removed result table from a previous run");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn create(dir: &Path, name: &str) -> Result<(PathBuf, std::fs::File), AppError> {
    let path = dir.join(name);
    let file = std::fs::File::create(&path)?;
    Ok((path, file))
}

/// Write all result tables into `dir`. The exceptions table is only written
/// when there are exceptions; otherwise one left by an earlier run is removed.
/// Returns the paths written.
pub fn export_all(dir: &Path, analysis: &Analysis) -> Result<Vec<PathBuf>, AppError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(5);

    let (path, file) = create(dir, PURCHASES_FILE)?;
    write_purchases(file, &analysis.purchases)?;
    written.push(path);

    let report = &analysis.report;
    if !report.exceptions.is_empty() {
        let (path, file) = create(dir, EXCEPTIONS_FILE)?;
        write_exceptions(file, &report.exceptions)?;
        written.push(path);
    } else {
        remove_stale(dir, EXCEPTIONS_FILE)?;
    }

    let (path, file) = create(dir, DAILY_FILE)?;
    write_daily(file, &report.by_date_chain)?;
    written.push(path);

    let (path, file) = create(dir, DENOMINATIONS_FILE)?;
    write_denominations(file, &report.by_denomination)?;
    written.push(path);

    let (path, file) = create(dir, RUN_FILE)?;
    write_run_summary(file, analysis)?;
    written.push(path);

    tracing::info!(files = written.len(), dir = %dir.display(), "Exported result tables");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use vippulse_recon::{
        Asset, Chain, Classifier, Direction, Feed, Pipeline, SnapshotTimeline, SnapshotWindow,
        Transaction, WeeklySnapshot,
    };

    const HOLDER: &str = "0x1111111111111111111111111111111111111111";

    fn analysis(paid: &[&str]) -> Analysis {
        let window = SnapshotWindow::weekly(Utc.with_ymd_and_hms(2025, 7, 21, 8, 0, 0).unwrap());
        let holder = vippulse_recon::Address::parse(Chain::Polygon.family(), HOLDER).unwrap();
        let timeline = SnapshotTimeline::new(window, [WeeklySnapshot::new(1, [holder])]);
        let transactions = paid
            .iter()
            .enumerate()
            .map(|(i, amount)| {
                Transaction::new(
                    Utc.with_ymd_and_hms(2025, 7, 22, 12, i as u32, 0).unwrap(),
                    Chain::Polygon,
                    HOLDER,
                    Asset::Usdc,
                    amount.parse().unwrap(),
                    Direction::Inflow,
                    format!("0x{i:02}"),
                )
                .unwrap()
            })
            .collect();
        Pipeline::new(Classifier::new(NaiveDate::from_ymd_opt(2025, 7, 21).unwrap()))
            .run(&Feed::complete(transactions), &timeline)
            .unwrap()
    }

    #[test]
    fn test_purchase_rows() {
        let mut out = Vec::new();
        write_purchases(&mut out, &analysis(&["104"]).purchases).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("DateTime,Date,Chain,Wallet"));
        assert_eq!(
            lines.next().unwrap(),
            "2025-07-22 12:00:00,2025-07-22,Polygon,0x1111111111111111111111111111111111111111,USDC,100,\
             104.00,102.80,104.00,1.20,-1.20,1,true,DISCOUNT_MISSED,true,0x00"
        );
    }

    #[test]
    fn test_export_all_skips_empty_exceptions() {
        let dir = tempfile::tempdir().unwrap();
        let written = export_all(dir.path(), &analysis(&["102.8"])).unwrap();
        assert_eq!(written.len(), 4);
        assert!(!dir.path().join(EXCEPTIONS_FILE).exists());
    }

    #[test]
    fn test_export_all_with_exceptions() {
        let dir = tempfile::tempdir().unwrap();
        let written = export_all(dir.path(), &analysis(&["102.8", "104", "207"])).unwrap();
        assert_eq!(written.len(), 5);

        let exceptions = std::fs::read_to_string(dir.path().join(EXCEPTIONS_FILE)).unwrap();
        assert_eq!(exceptions.lines().count(), 3);
        assert!(exceptions.lines().nth(1).unwrap().ends_with(",104.00,102.80,1.20,-1.20,0x01"));

        let denominations = std::fs::read_to_string(dir.path().join(DENOMINATIONS_FILE)).unwrap();
        assert_eq!(denominations.lines().nth(1).unwrap(), "100,2,102.80,103.40,1.20");
    }

    #[test]
    fn test_clean_rerun_clears_previous_exceptions() {
        let dir = tempfile::tempdir().unwrap();
        export_all(dir.path(), &analysis(&["104"])).unwrap();
        assert!(dir.path().join(EXCEPTIONS_FILE).exists());

        let written = export_all(dir.path(), &analysis(&["102.8"])).unwrap();
        assert!(!dir.path().join(EXCEPTIONS_FILE).exists());
        assert!(!written.contains(&dir.path().join(EXCEPTIONS_FILE)));
    }

    #[test]
    fn test_run_summary_carries_partial_flag_and_exclusions() {
        let mut partial = analysis(&["104", "75"]);
        partial.partial = true;

        let dir = tempfile::tempdir().unwrap();
        export_all(dir.path(), &partial).unwrap();

        let summary = std::fs::read_to_string(dir.path().join(RUN_FILE)).unwrap();
        let lines: Vec<_> = summary.lines().collect();
        assert_eq!(
            lines,
            [
                "Partial,Purchases,Exceptions,Excluded_Outflow,Excluded_Unsupported_Asset,Excluded_Unknown_Payer,Excluded_No_Denomination",
                "true,1,1,0,0,0,1",
            ]
        );
    }
}
