//! Fee and VIP discount schedule.
//!
//! `fee = face * fee_rate + flat_fee`, `normal = face + fee`,
//! `vip = face + fee * vip_fee_share`, except for carved-out denominations that
//! pay a fixed fee and get no discount.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::denomination::FaceValue;

/// Normal and VIP price for one face value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub face_value: FaceValue,
    pub normal_price: Decimal,
    pub vip_price: Decimal,
}

impl Quote {
    /// Theoretical discount an eligible holder is owed, independent of what was paid.
    pub fn discount_entitlement(&self) -> Decimal {
        self.normal_price - self.vip_price
    }
}

/// A face value excluded from the discount program, paying a fixed VIP fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CarveOut {
    pub face_value: FaceValue,
    pub vip_fee: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeePolicy {
    pub fee_rate: Decimal,
    pub flat_fee: Decimal,
    /// Portion of the normal fee a VIP holder still pays.
    pub vip_fee_share: Decimal,
    pub carve_outs: Vec<CarveOut>,
}

impl Default for FeePolicy {
    /// 3% + $1 fee, VIP pays 70% of the fee, $25 cards pay a flat $1.
    fn default() -> Self {
        Self {
            fee_rate: Decimal::new(3, 2),
            flat_fee: Decimal::ONE,
            vip_fee_share: Decimal::new(70, 2),
            carve_outs: vec![CarveOut { face_value: 25, vip_fee: Decimal::ONE }],
        }
    }
}

impl FeePolicy {
    pub fn base_fee(&self, face_value: FaceValue) -> Decimal {
        Decimal::from(face_value) * self.fee_rate + self.flat_fee
    }

    /// Pure price lookup; whether the VIP price applies is the classifier's call.
    pub fn price(&self, face_value: FaceValue) -> Quote {
        let face = Decimal::from(face_value);
        let fee = self.base_fee(face_value);
        let vip_price = match self.carve_outs.iter().find(|c| c.face_value == face_value) {
            Some(carve_out) => face + carve_out.vip_fee,
            None => face + fee * self.vip_fee_share,
        };
        Quote {
            face_value,
            normal_price: (face + fee).normalize(),
            vip_price: vip_price.normalize(),
        }
    }
}
