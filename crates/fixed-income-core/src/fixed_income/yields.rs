//! Yield measures: YTM, yield to call/put/worst, current and simple yield,
//! and the discount margin of floating-rate notes.
//!
//! All yields are in percent and compounded at the bond's coupon frequency.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::day_count::year_fraction;
use crate::error::FixedIncomeError;
use crate::fixed_income::bonds::{
    approximate_yield, present_value, validate_price, yield_from_price, yield_solver_settings,
};
use crate::fixed_income::cashflows::redemption_schedule;
use crate::fixed_income::instruments::{Bond, FloatingRateNote, OptionKind};
use crate::math::{newton_solve, pow_decimal, powi_decimal};
use crate::types::{percentage_to_bps, with_metadata, Bps, ComputationOutput, Money, Percent};
use crate::FixedIncomeResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Redemption scenario that produced a yield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkoutKind {
    Maturity,
    Call,
    Put,
}

/// Lowest yield across maturity and every future exercise date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldToWorst {
    pub yield_pct: Percent,
    pub workout_date: NaiveDate,
    pub workout: WorkoutKind,
}

/// Yield to a single exercise date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseYield {
    pub date: NaiveDate,
    pub price: Money,
    pub yield_pct: Percent,
}

/// Input for yield analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldAnalysisInput {
    pub bond: Bond,
    /// Market (clean) price in face-value units
    pub price: Money,
    pub settlement_date: NaiveDate,
    /// Starting point for the YTM solver; defaults to the approximate yield
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_guess: Option<Percent>,
}

/// Output of yield analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldAnalysisOutput {
    pub yield_to_maturity: Percent,
    pub current_yield: Percent,
    pub simple_yield: Percent,
    /// Semi-annual bond-equivalent yield
    pub bond_equivalent_yield: Percent,
    /// (1 + y/f)^f - 1
    pub effective_annual_yield: Percent,
    /// "premium", "discount" or "par"
    pub discount_or_premium: String,
    pub exercise_yields: Vec<ExerciseYield>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yield_to_worst: Option<YieldToWorst>,
    /// Floating-rate notes only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_margin: Option<Bps>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Yield analysis for a bond at a market price: YTM, current and simple
/// yields, annualisation variants, and exercise/worst yields or discount
/// margin depending on the bond type.
pub fn analyze_yields(
    input: &YieldAnalysisInput,
) -> FixedIncomeResult<ComputationOutput<YieldAnalysisOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let bond = &input.bond;
    let settlement = input.settlement_date;
    bond.validate(settlement)?;
    validate_price(input.price)?;

    let ytm = yield_from_price(bond, input.price, settlement, input.initial_guess)?;
    let current = current_yield(bond, input.price)?;
    let simple = simple_yield(bond, input.price, settlement)?;

    let freq = Decimal::from(bond.frequency());
    let periodic = ytm / dec!(100) / freq;
    let effective_annual_yield =
        (powi_decimal(Decimal::ONE + periodic, u64::from(bond.frequency()))? - Decimal::ONE)
            * dec!(100);
    let bond_equivalent_yield = if bond.frequency() == 2 {
        ytm
    } else {
        // Re-express the periodic rate as a semi-annual rate, doubled
        let semi = pow_decimal(Decimal::ONE + periodic, freq / dec!(2))?
            - Decimal::ONE;
        semi * dec!(2) * dec!(100)
    };

    let face = bond.face_value();
    let discount_or_premium = if input.price > face {
        "premium"
    } else if input.price < face {
        "discount"
    } else {
        "par"
    }
    .to_string();

    let mut exercise_yields = Vec::new();
    for exercise in bond.exercise_schedule() {
        if exercise.date <= settlement {
            warnings.push(format!("Exercise date {} already passed; skipped", exercise.date));
            continue;
        }
        match yield_to_exercise(bond, input.price, settlement, exercise.date, exercise.price) {
            Ok(y) => exercise_yields.push(ExerciseYield {
                date: exercise.date,
                price: exercise.price,
                yield_pct: y,
            }),
            Err(e) => warnings.push(format!("No yield to {}: {e}", exercise.date)),
        }
    }

    let ytw = match bond.option_kind() {
        Some(_) => match yield_to_worst(bond, input.price, settlement) {
            Ok(y) => Some(y),
            Err(e) => {
                warnings.push(format!("Yield to worst unavailable: {e}"));
                None
            }
        },
        None => None,
    };

    let dm = match bond {
        Bond::FloatingRate(frn) => Some(discount_margin(frn, input.price, settlement)?),
        _ => None,
    };

    let output = YieldAnalysisOutput {
        yield_to_maturity: ytm,
        current_yield: current,
        simple_yield: simple,
        bond_equivalent_yield,
        effective_annual_yield,
        discount_or_premium,
        exercise_yields,
        yield_to_worst: ytw,
        discount_margin: dm,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "ytm_method": "Newton-Raphson, finite-difference slope",
        "max_iterations": 100,
        "convergence_eps": "1e-8",
        "price_type": "clean",
        "compounding": "coupon frequency",
    });

    Ok(with_metadata(
        "Yield Analysis (YTM, YTC/YTP/YTW, current and simple yield)",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

/// Yield to maturity for a clean price.
pub fn yield_to_maturity(
    bond: &Bond,
    price: Money,
    settlement: NaiveDate,
) -> FixedIncomeResult<Percent> {
    yield_from_price(bond, price, settlement, None)
}

/// Yield assuming redemption at `call_price` on `call_date`.
pub fn yield_to_call(
    bond: &Bond,
    price: Money,
    settlement: NaiveDate,
    call_date: NaiveDate,
    call_price: Money,
) -> FixedIncomeResult<Percent> {
    yield_to_exercise(bond, price, settlement, call_date, call_price)
}

/// Yield assuming the holder puts at `put_price` on `put_date`.
pub fn yield_to_put(
    bond: &Bond,
    price: Money,
    settlement: NaiveDate,
    put_date: NaiveDate,
    put_price: Money,
) -> FixedIncomeResult<Percent> {
    yield_to_exercise(bond, price, settlement, put_date, put_price)
}

/// Minimum of YTM and the yield to every future call or put.
pub fn yield_to_worst(
    bond: &Bond,
    price: Money,
    settlement: NaiveDate,
) -> FixedIncomeResult<YieldToWorst> {
    let mut worst = YieldToWorst {
        yield_pct: yield_to_maturity(bond, price, settlement)?,
        workout_date: bond.maturity_date(),
        workout: WorkoutKind::Maturity,
    };

    let kind = match bond.option_kind() {
        Some(OptionKind::Call) => WorkoutKind::Call,
        Some(OptionKind::Put) => WorkoutKind::Put,
        None => return Ok(worst),
    };

    for exercise in bond.exercise_schedule() {
        if exercise.date <= settlement {
            continue;
        }
        let y = yield_to_exercise(bond, price, settlement, exercise.date, exercise.price)?;
        if y < worst.yield_pct {
            worst = YieldToWorst {
                yield_pct: y,
                workout_date: exercise.date,
                workout: kind,
            };
        }
    }
    Ok(worst)
}

/// Annual coupon over price, in percent.
pub fn current_yield(bond: &Bond, price: Money) -> FixedIncomeResult<Percent> {
    if price <= Decimal::ZERO {
        return Err(FixedIncomeError::DivisionByZero {
            context: "current yield price".into(),
        });
    }
    Ok(bond.annual_coupon() / price * dec!(100))
}

/// Annual coupon plus straight-line amortisation of the discount or premium
/// over the remaining life, over price, in percent.
pub fn simple_yield(bond: &Bond, price: Money, settlement: NaiveDate) -> FixedIncomeResult<Percent> {
    bond.validate(settlement)?;
    validate_price(price)?;
    let years = year_fraction(settlement, bond.maturity_date(), bond.day_count())?;
    let amortisation = (bond.face_value() - price) / years;
    Ok((bond.annual_coupon() + amortisation) / price * dec!(100))
}

/// Spread of the implied FRN yield over its reference rate, in bps.
pub fn discount_margin(
    frn: &FloatingRateNote,
    price: Money,
    settlement: NaiveDate,
) -> FixedIncomeResult<Bps> {
    let bond = Bond::FloatingRate(frn.clone());
    let implied = yield_from_price(&bond, price, settlement, Some(bond.coupon_rate()))?;
    Ok(percentage_to_bps(implied - frn.reference_rate))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Treat the exercise date as a synthetic maturity redeemed at the exercise
/// price and solve for the yield.
fn yield_to_exercise(
    bond: &Bond,
    price: Money,
    settlement: NaiveDate,
    exercise_date: NaiveDate,
    exercise_price: Money,
) -> FixedIncomeResult<Percent> {
    bond.validate(settlement)?;
    validate_price(price)?;
    if exercise_date <= settlement {
        return Err(FixedIncomeError::invalid_instrument(
            "exercise_date",
            format!("Exercise date {exercise_date} must be after settlement {settlement}"),
        ));
    }
    if exercise_date > bond.maturity_date() {
        return Err(FixedIncomeError::invalid_instrument(
            "exercise_date",
            format!("Exercise date {exercise_date} is after maturity"),
        ));
    }
    if exercise_price <= Decimal::ZERO {
        return Err(FixedIncomeError::invalid_instrument(
            "exercise_price",
            "Exercise price must be positive",
        ));
    }

    let flows = redemption_schedule(
        bond.coupon_per_period(),
        settlement,
        exercise_date,
        exercise_price,
        bond.frequency(),
    );
    let settings = yield_solver_settings("yield_to_exercise");
    let years = year_fraction(settlement, exercise_date, bond.day_count())?;
    let initial = approximate_yield(bond, price, exercise_price, years);
    newton_solve(&settings, initial, |y| {
        Ok(present_value(&flows, y, bond.frequency(), bond.day_count(), settlement)? - price)
    })
}
