//! Deterministic folds over classified purchases.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::address::ChainFamily;
use crate::chain::Chain;
use crate::classifier::{ClassifiedPurchase, DiscountStatus};
use crate::denomination::FaceValue;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyChainSummary {
    pub date: NaiveDate,
    pub chain: Chain,
    pub card_count: usize,
    pub face_value_sum: Decimal,
    pub actual_paid_sum: Decimal,
    pub expected_paid_sum: Decimal,
    pub discount_sum: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenominationSummary {
    pub face_value: FaceValue,
    pub card_count: usize,
    pub mean_expected: Decimal,
    pub mean_actual: Decimal,
    pub mean_discount: Decimal,
}

/// Run-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub known_holders_evm: usize,
    pub known_holders_solana: usize,
    pub paying_wallets_evm: usize,
    pub paying_wallets_solana: usize,
    pub card_count: usize,
    pub face_value_sum: Decimal,
    pub normal_price_sum: Decimal,
    pub vip_price_sum: Decimal,
    pub actual_paid_sum: Decimal,
    pub discount_entitlement_sum: Decimal,
    pub status_counts: BTreeMap<DiscountStatus, usize>,
    pub mean_savings_honored: Option<Decimal>,
    pub mean_savings_missed: Option<Decimal>,
}

impl Overview {
    pub fn count(&self, status: DiscountStatus) -> usize {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub by_date_chain: Vec<DailyChainSummary>,
    pub by_denomination: Vec<DenominationSummary>,
    /// Eligible-but-undiscounted purchases on or after the activity start, by time.
    pub exceptions: Vec<ClassifiedPurchase>,
    pub overview: Overview,
}

fn mean(sum: Decimal, count: usize) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        sum / Decimal::from(count)
    }
}

fn mean_savings<'a, I>(records: I) -> Option<Decimal>
where
    I: Iterator<Item = &'a ClassifiedPurchase>,
{
    let (sum, count) = records.fold((Decimal::ZERO, 0usize), |(sum, n), r| (sum + r.savings, n + 1));
    (count > 0).then(|| mean(sum, count))
}

/// Group `records` into the summary tables. `known_holders` is the
/// `(evm, solana)` distinct holder count of the timeline.
pub fn aggregate(
    records: &[ClassifiedPurchase],
    activity_start: NaiveDate,
    known_holders: (usize, usize),
) -> Report {
    let mut daily: BTreeMap<(NaiveDate, Chain), DailyChainSummary> = BTreeMap::new();
    let mut denominations: BTreeMap<FaceValue, (usize, Decimal, Decimal, Decimal)> = BTreeMap::new();
    let mut overview = Overview {
        known_holders_evm: known_holders.0,
        known_holders_solana: known_holders.1,
        ..Overview::default()
    };
    let mut evm_wallets = HashSet::new();
    let mut solana_wallets = HashSet::new();

    for r in records {
        let face = Decimal::from(r.face_value);

        let day = daily.entry((r.date, r.chain)).or_insert_with(|| DailyChainSummary {
            date: r.date,
            chain: r.chain,
            card_count: 0,
            face_value_sum: Decimal::ZERO,
            actual_paid_sum: Decimal::ZERO,
            expected_paid_sum: Decimal::ZERO,
            discount_sum: Decimal::ZERO,
        });
        day.card_count += 1;
        day.face_value_sum += face;
        day.actual_paid_sum += r.actual_paid;
        day.expected_paid_sum += r.vip_price;
        day.discount_sum += r.discount_entitlement;

        let denom = denominations.entry(r.face_value).or_default();
        denom.0 += 1;
        denom.1 += r.vip_price;
        denom.2 += r.actual_paid;
        denom.3 += r.discount_entitlement;

        match r.wallet.family() {
            ChainFamily::Evm => evm_wallets.insert(&r.wallet),
            ChainFamily::Solana => solana_wallets.insert(&r.wallet),
        };

        overview.card_count += 1;
        overview.face_value_sum += face;
        overview.normal_price_sum += r.normal_price;
        overview.vip_price_sum += r.vip_price;
        overview.actual_paid_sum += r.actual_paid;
        overview.discount_entitlement_sum += r.discount_entitlement;
        *overview.status_counts.entry(r.status).or_default() += 1;
    }

    overview.paying_wallets_evm = evm_wallets.len();
    overview.paying_wallets_solana = solana_wallets.len();
    overview.mean_savings_honored =
        mean_savings(records.iter().filter(|r| r.status == DiscountStatus::DiscountHonored));
    overview.mean_savings_missed =
        mean_savings(records.iter().filter(|r| r.status == DiscountStatus::DiscountMissed));

    let by_denomination = denominations
        .into_iter()
        .map(|(face_value, (count, expected, actual, discount))| DenominationSummary {
            face_value,
            card_count: count,
            mean_expected: mean(expected, count),
            mean_actual: mean(actual, count),
            mean_discount: mean(discount, count),
        })
        .collect();

    let mut exceptions: Vec<ClassifiedPurchase> = records
        .iter()
        .filter(|r| r.status == DiscountStatus::DiscountMissed && r.date >= activity_start)
        .cloned()
        .collect();
    exceptions.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    Report {
        by_date_chain: daily.into_values().collect(),
        by_denomination,
        exceptions,
        overview,
    }
}
