//! Bond instrument definitions.
//!
//! `Bond` is a closed set of variants; pricing and risk code matches on it
//! exhaustively rather than inspecting optional fields.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::day_count::DayCountConvention;
use crate::error::FixedIncomeError;
use crate::types::{bps_to_percentage, Bps, Money, Percent};
use crate::FixedIncomeResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Plain fixed-coupon bullet bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedRateBond {
    /// Par / face value (typically 100 or 1000)
    pub face_value: Money,
    /// Annual coupon rate as a percentage (5 = 5%)
    pub coupon_rate: Percent,
    pub maturity_date: NaiveDate,
    /// Coupons per year: 1, 2, 4 or 12
    pub frequency: u8,
    #[serde(default)]
    pub day_count: DayCountConvention,
}

impl FixedRateBond {
    pub fn new(
        face_value: Money,
        coupon_rate: Percent,
        maturity_date: NaiveDate,
        frequency: u8,
        day_count: DayCountConvention,
    ) -> Self {
        Self {
            face_value,
            coupon_rate,
            maturity_date,
            frequency,
            day_count,
        }
    }
}

/// Discount bond paying face value at maturity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroCouponBond {
    pub face_value: Money,
    pub maturity_date: NaiveDate,
    /// Compounding frequency used when discounting
    pub frequency: u8,
    #[serde(default)]
    pub day_count: DayCountConvention,
}

/// Floating-rate note paying reference rate plus quoted margin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingRateNote {
    pub face_value: Money,
    /// Current fixing of the reference index (percent)
    pub reference_rate: Percent,
    /// Quoted margin over the reference rate, in basis points
    pub quoted_margin: Bps,
    pub maturity_date: NaiveDate,
    pub frequency: u8,
    #[serde(default)]
    pub day_count: DayCountConvention,
}

/// Call or put exercise point. Price is in face-value units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExerciseDate {
    pub date: NaiveDate,
    pub price: Money,
}

/// Fixed-rate bond the issuer may redeem early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallableBond {
    pub bond: FixedRateBond,
    pub call_schedule: Vec<ExerciseDate>,
}

/// Fixed-rate bond the holder may put back early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PutableBond {
    pub bond: FixedRateBond,
    pub put_schedule: Vec<ExerciseDate>,
}

/// Any supported bond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Bond {
    FixedRate(FixedRateBond),
    ZeroCoupon(ZeroCouponBond),
    FloatingRate(FloatingRateNote),
    Callable(CallableBond),
    Putable(PutableBond),
}

/// Which side holds the embedded option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionKind {
    Call,
    Put,
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl Bond {
    pub fn face_value(&self) -> Money {
        match self {
            Bond::FixedRate(b) => b.face_value,
            Bond::ZeroCoupon(b) => b.face_value,
            Bond::FloatingRate(b) => b.face_value,
            Bond::Callable(b) => b.bond.face_value,
            Bond::Putable(b) => b.bond.face_value,
        }
    }

    pub fn maturity_date(&self) -> NaiveDate {
        match self {
            Bond::FixedRate(b) => b.maturity_date,
            Bond::ZeroCoupon(b) => b.maturity_date,
            Bond::FloatingRate(b) => b.maturity_date,
            Bond::Callable(b) => b.bond.maturity_date,
            Bond::Putable(b) => b.bond.maturity_date,
        }
    }

    pub fn frequency(&self) -> u8 {
        match self {
            Bond::FixedRate(b) => b.frequency,
            Bond::ZeroCoupon(b) => b.frequency,
            Bond::FloatingRate(b) => b.frequency,
            Bond::Callable(b) => b.bond.frequency,
            Bond::Putable(b) => b.bond.frequency,
        }
    }

    pub fn day_count(&self) -> DayCountConvention {
        match self {
            Bond::FixedRate(b) => b.day_count,
            Bond::ZeroCoupon(b) => b.day_count,
            Bond::FloatingRate(b) => b.day_count,
            Bond::Callable(b) => b.bond.day_count,
            Bond::Putable(b) => b.bond.day_count,
        }
    }

    /// Annual coupon rate in percent. A floater pays reference + margin.
    pub fn coupon_rate(&self) -> Percent {
        match self {
            Bond::FixedRate(b) => b.coupon_rate,
            Bond::ZeroCoupon(_) => Decimal::ZERO,
            Bond::FloatingRate(b) => b.reference_rate + bps_to_percentage(b.quoted_margin),
            Bond::Callable(b) => b.bond.coupon_rate,
            Bond::Putable(b) => b.bond.coupon_rate,
        }
    }

    /// Coupon cash amount paid each period.
    pub fn coupon_per_period(&self) -> Money {
        self.face_value() * self.coupon_rate() / dec!(100) / Decimal::from(self.frequency())
    }

    /// Annual coupon cash amount.
    pub fn annual_coupon(&self) -> Money {
        self.face_value() * self.coupon_rate() / dec!(100)
    }

    /// Call or put schedule; empty for bonds without an embedded option.
    pub fn exercise_schedule(&self) -> &[ExerciseDate] {
        match self {
            Bond::Callable(b) => &b.call_schedule,
            Bond::Putable(b) => &b.put_schedule,
            Bond::FixedRate(_) | Bond::ZeroCoupon(_) | Bond::FloatingRate(_) => &[],
        }
    }

    pub fn option_kind(&self) -> Option<OptionKind> {
        match self {
            Bond::Callable(_) => Some(OptionKind::Call),
            Bond::Putable(_) => Some(OptionKind::Put),
            Bond::FixedRate(_) | Bond::ZeroCoupon(_) | Bond::FloatingRate(_) => None,
        }
    }

    /// The bond with any embedded option stripped off.
    pub fn straight(&self) -> Bond {
        match self {
            Bond::Callable(b) => Bond::FixedRate(b.bond.clone()),
            Bond::Putable(b) => Bond::FixedRate(b.bond.clone()),
            other => other.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Check structural invariants relative to a settlement date.
    pub fn validate(&self, settlement: NaiveDate) -> FixedIncomeResult<()> {
        if self.face_value() <= Decimal::ZERO {
            return Err(FixedIncomeError::invalid_instrument(
                "face_value",
                "Face value must be positive",
            ));
        }
        if self.maturity_date() <= settlement {
            return Err(FixedIncomeError::invalid_instrument(
                "maturity_date",
                format!(
                    "Maturity {} must be after settlement {settlement}",
                    self.maturity_date()
                ),
            ));
        }
        let coupon = self.coupon_rate();
        if coupon < Decimal::ZERO || coupon > dec!(100) {
            return Err(FixedIncomeError::invalid_instrument(
                "coupon_rate",
                format!("Coupon rate {coupon}% must be within [0, 100]"),
            ));
        }
        if !matches!(self.frequency(), 1 | 2 | 4 | 12) {
            return Err(FixedIncomeError::invalid_instrument(
                "frequency",
                "Frequency must be 1, 2, 4, or 12",
            ));
        }

        let field = match self.option_kind() {
            Some(OptionKind::Call) => "call_schedule",
            Some(OptionKind::Put) => "put_schedule",
            None => return Ok(()),
        };
        for exercise in self.exercise_schedule() {
            if exercise.price <= Decimal::ZERO {
                return Err(FixedIncomeError::invalid_instrument(
                    field,
                    format!("Exercise price on {} must be positive", exercise.date),
                ));
            }
            if exercise.date > self.maturity_date() {
                return Err(FixedIncomeError::invalid_instrument(
                    field,
                    format!("Exercise date {} is after maturity", exercise.date),
                ));
            }
        }
        Ok(())
    }
}
