//! Card face values inferred from noisy paid amounts.
//!
//! A charged amount is face value plus a variable fee, so each face value owns a
//! tolerance band wide enough to absorb the fee while staying disjoint from its
//! neighbours.

use rust_decimal::Decimal;
use serde::Serialize;

/// Nominal card value in whole USD.
pub type FaceValue = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenominationBand {
    pub label: String,
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    pub face_value: FaceValue,
}

impl DenominationBand {
    pub fn new(face_value: FaceValue, min_amount: Decimal, max_amount: Decimal) -> Self {
        Self {
            label: format!("{face_value} USD"),
            min_amount,
            max_amount,
            face_value,
        }
    }

    /// Both ends inclusive.
    pub fn contains(&self, amount: Decimal) -> bool {
        self.min_amount <= amount && amount <= self.max_amount
    }
}

/// Ordered band table; lookup walks the declared order and stops at the first hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DenominationTable {
    bands: Vec<DenominationBand>,
}

impl DenominationTable {
    pub fn new(bands: Vec<DenominationBand>) -> Self {
        Self { bands }
    }

    pub fn bands(&self) -> &[DenominationBand] {
        &self.bands
    }

    /// Face value of the first band containing `amount`, or `None` when the
    /// amount is not a card purchase we can interpret.
    pub fn classify(&self, amount: Decimal) -> Option<FaceValue> {
        self.bands
            .iter()
            .find(|band| band.contains(amount))
            .map(|band| band.face_value)
    }
}

impl Default for DenominationTable {
    fn default() -> Self {
        let band = |face, min: i64, min_scale, max: i64| {
            DenominationBand::new(face, Decimal::new(min, min_scale), Decimal::from(max))
        };
        Self::new(vec![
            band(25, 245, 1, 27),
            band(50, 48, 0, 54),
            band(100, 98, 0, 107),
            band(200, 195, 0, 212),
            band(300, 295, 0, 318),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_inclusive_boundaries() {
        let table = DenominationTable::default();
        assert_eq!(table.classify(d("24.50")), Some(25));
        assert_eq!(table.classify(d("27.00")), Some(25));
        assert_eq!(table.classify(d("24.49")), None);
        assert_eq!(table.classify(d("27.01")), None);
        assert_eq!(table.classify(d("318")), Some(300));
    }

    #[test]
    fn test_gap_between_bands() {
        let table = DenominationTable::default();
        for amount in ["54.01", "60", "75.5", "97.99"] {
            assert_eq!(table.classify(d(amount)), None, "{amount}");
        }
    }

    #[test]
    fn test_typical_payments() {
        let table = DenominationTable::default();
        assert_eq!(table.classify(d("26")), Some(25));
        assert_eq!(table.classify(d("51.75")), Some(50));
        assert_eq!(table.classify(d("102.8")), Some(100));
        assert_eq!(table.classify(d("204.9")), Some(200));
        assert_eq!(table.classify(d("307.3")), Some(300));
    }

    #[test]
    fn test_declared_order_wins_on_overlap() {
        let table = DenominationTable::new(vec![
            DenominationBand::new(10, d("9"), d("12")),
            DenominationBand::new(11, d("10"), d("13")),
        ]);
        assert_eq!(table.classify(d("11")), Some(10));
        assert_eq!(table.classify(d("12.5")), Some(11));
    }

    #[test]
    fn test_labels() {
        let labels: Vec<_> = DenominationTable::default()
            .bands()
            .iter()
            .map(|b| b.label.clone())
            .collect();
        assert_eq!(labels, ["25 USD", "50 USD", "100 USD", "200 USD", "300 USD"]);
    }
}
