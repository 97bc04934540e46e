//! End-to-end checks of the reconciliation rules on the program's real calendar:
//! activity from 2025-07-21, week 1 snapshot at 2025-07-21 08:00 UTC.

use chrono::{DateTime, NaiveDate, TimeDelta, TimeZone, Utc};
use rust_decimal::Decimal;
use vippulse_recon::{
    Address, Asset, Chain, ChainFamily, Classifier, DiscountStatus, Feed, Pipeline, SnapshotRow,
    SnapshotTimeline, SnapshotWindow, Transaction, WeeklySnapshot,
};

const HOLDER: &str = "0x523ffC4D9782dC8af35664625fBB3e1d8e8ec6cb";
const STRANGER: &str = "0x9999999999999999999999999999999999999999";
const SOL_HOLDER: &str = "G7bMBQegH3RyRjt1QZu3o6BA2ZQQ7shdJ7zGrw7PwNEL";

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn activity_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 21).unwrap()
}

fn first_snapshot() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 21, 8, 0, 0).unwrap()
}

fn timeline() -> SnapshotTimeline {
    let rows = (1..=4).flat_map(|week| {
        let suffix = match week {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        };
        let label = format!("nft-owners-{week}{suffix} week.tsv");
        [
            SnapshotRow::new(label.clone(), Some("pol"), Some(HOLDER)),
            SnapshotRow::new(label, Some("sol"), Some(SOL_HOLDER)),
        ]
    });
    SnapshotTimeline::build(SnapshotWindow::weekly(first_snapshot()), rows).0
}

fn payment(at: DateTime<Utc>, chain: Chain, from: &str, amount: &str, hash: &str) -> Transaction {
    Transaction::new(at, chain, from, Asset::Usdc, d(amount), vippulse_recon::Direction::Inflow, hash).unwrap()
}

fn classify(tx: &Transaction) -> vippulse_recon::ClassifiedPurchase {
    Classifier::new(activity_start()).evaluate(tx, &timeline()).unwrap()
}

fn jul22_noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 22, 12, 0, 0).unwrap()
}

#[test]
fn test_vip_price_paid_is_honored() {
    let r = classify(&payment(jul22_noon(), Chain::Polygon, HOLDER, "102.80", "0x01"));
    assert_eq!(r.face_value, 100);
    assert_eq!(r.snapshot_week, 1);
    assert!(r.in_snapshot);
    assert_eq!(r.normal_price, d("104.00"));
    assert_eq!(r.vip_price, d("102.80"));
    assert_eq!(r.savings, d("0.00"));
    assert_eq!(r.discount_entitlement, d("1.20"));
    assert_eq!(r.status, DiscountStatus::DiscountHonored);
}

#[test]
fn test_non_holder_is_not_in_snapshot() {
    let r = classify(&payment(jul22_noon(), Chain::Polygon, STRANGER, "102.80", "0x02"));
    assert!(!r.in_snapshot);
    assert_eq!(r.status, DiscountStatus::NotInSnapshot);
}

#[test]
fn test_full_price_paid_is_missed() {
    let r = classify(&payment(jul22_noon(), Chain::Polygon, HOLDER, "104.00", "0x03"));
    assert_eq!(r.status, DiscountStatus::DiscountMissed);
    assert_eq!(r.savings, d("-1.20"));
}

#[test]
fn test_pre_activity_purchase() {
    let at = Utc.with_ymd_and_hms(2025, 7, 1, 12, 0, 0).unwrap();
    let r = classify(&payment(at, Chain::Polygon, HOLDER, "104.00", "0x04"));
    assert_eq!(r.snapshot_week, 0);
    assert!(!r.is_after_activity);
    assert_eq!(r.status, DiscountStatus::BeforeActivity);
}

// The activity date and the first snapshot instant differ by eight hours: a
// purchase on the start date but before 08:00 is after activity yet precedes
// every snapshot.
#[test]
fn test_activity_day_before_first_snapshot() {
    let at = Utc.with_ymd_and_hms(2025, 7, 21, 7, 59, 59).unwrap();
    let r = classify(&payment(at, Chain::Polygon, HOLDER, "102.80", "0x05"));
    assert!(r.is_after_activity);
    assert_eq!(r.snapshot_week, 0);
    assert_eq!(r.status, DiscountStatus::NotInSnapshot);
}

#[test]
fn test_pre_activity_even_when_holder_in_every_week() {
    let tl = timeline();
    let holder = Address::parse(ChainFamily::Evm, HOLDER).unwrap();
    assert!(tl.week_numbers().all(|w| tl.is_eligible(w, &holder)));

    let at = Utc.with_ymd_and_hms(2025, 7, 20, 23, 59, 59).unwrap();
    let r = classify(&payment(at, Chain::Ethereum, HOLDER, "102.80", "0x06"));
    assert_eq!(r.status, DiscountStatus::BeforeActivity);
}

#[test]
fn test_week_resolution_boundaries() {
    let week = |offset: TimeDelta| {
        classify(&payment(first_snapshot() + offset, Chain::Polygon, HOLDER, "102.80", "0x07")).snapshot_week
    };
    assert_eq!(week(TimeDelta::zero()), 1);
    assert_eq!(week(TimeDelta::days(7) - TimeDelta::seconds(1)), 1);
    assert_eq!(week(TimeDelta::days(7)), 2);
}

#[test]
fn test_week_past_last_snapshot_is_not_eligible() {
    let at = first_snapshot() + TimeDelta::days(7 * 4);
    let r = classify(&payment(at, Chain::Polygon, HOLDER, "102.80", "0x08"));
    assert_eq!(r.snapshot_week, 5);
    assert_eq!(r.status, DiscountStatus::NotInSnapshot);
}

#[test]
fn test_missing_week_is_not_eligible() {
    let holder = Address::parse(ChainFamily::Evm, HOLDER).unwrap();
    let sparse = SnapshotTimeline::new(
        SnapshotWindow::weekly(first_snapshot()),
        [WeeklySnapshot::new(1, [holder.clone()]), WeeklySnapshot::new(3, [holder])],
    );
    let tx = payment(first_snapshot() + TimeDelta::days(10), Chain::Polygon, HOLDER, "102.80", "0x09");
    let r = Classifier::new(activity_start()).evaluate(&tx, &sparse).unwrap();
    assert_eq!(r.snapshot_week, 2);
    assert_eq!(r.status, DiscountStatus::NotInSnapshot);
}

#[test]
fn test_twenty_five_dollar_carve_out_thresholds() {
    let at = jul22_noon();
    let honored = classify(&payment(at, Chain::Solana, SOL_HOLDER, "26.50", "s1"));
    assert_eq!(honored.vip_price, d("26"));
    assert_eq!(honored.status, DiscountStatus::DiscountHonored);

    let missed = classify(&payment(at, Chain::Solana, SOL_HOLDER, "26.75", "s2"));
    assert_eq!(missed.vip_price, d("26"));
    assert_eq!(missed.status, DiscountStatus::DiscountMissed);
}

#[test]
fn test_solana_membership_is_case_sensitive() {
    let lowered = SOL_HOLDER.to_lowercase();
    let r = classify(&payment(jul22_noon(), Chain::Solana, &lowered, "26", "s3"));
    assert_eq!(r.status, DiscountStatus::NotInSnapshot);
}

#[test]
fn test_unmatched_amount_is_excluded() {
    let tx = payment(jul22_noon(), Chain::Polygon, HOLDER, "75.00", "0x0a");
    assert!(Classifier::new(activity_start()).evaluate(&tx, &timeline()).is_none());
}

#[test]
fn test_rerun_is_identical() {
    let feed = Feed::complete(vec![
        payment(jul22_noon(), Chain::Polygon, HOLDER, "104.00", "0x0b"),
        payment(jul22_noon(), Chain::Polygon, STRANGER, "51.75", "0x0c"),
        payment(jul22_noon() + TimeDelta::days(8), Chain::Solana, SOL_HOLDER, "206.9", "s4"),
        payment(Utc.with_ymd_and_hms(2025, 7, 2, 0, 0, 0).unwrap(), Chain::BnbChain, HOLDER, "26", "0x0d"),
    ]);
    let pipeline = Pipeline::new(Classifier::new(activity_start()));
    let tl = timeline();

    let first = pipeline.run(&feed, &tl).unwrap();
    let mut reversed = feed.clone();
    reversed.transactions.reverse();
    let second = pipeline.run(&reversed, &tl).unwrap();

    assert_eq!(first.purchases, second.purchases);
    assert_eq!(first.report, second.report);

    let counted: usize = first.report.by_denomination.iter().map(|s| s.card_count).sum();
    assert_eq!(counted, first.purchases.len());
    assert_eq!(first.report.exceptions.len(), 2);
}
