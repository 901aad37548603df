//! Bond pricing engine.
//!
//! Discounts projected cash flows at a flat yield compounded at the bond's
//! coupon frequency, solves the inverse problem by Newton-Raphson, and
//! computes accrued interest under the four supported day counts.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::day_count::{thirty_360_days, year_fraction, DayCountConvention};
use crate::error::FixedIncomeError;
use crate::fixed_income::cashflows::{
    generate_cash_flows, next_coupon_date, previous_coupon_date, redemption_schedule, CashFlow,
    CashFlowType,
};
use crate::fixed_income::instruments::{Bond, FloatingRateNote, OptionKind, ZeroCouponBond};
use crate::fixed_income::yields::{current_yield, yield_to_worst, YieldToWorst};
use crate::math::{newton_solve, pow_decimal, NewtonSettings};
use crate::types::{with_metadata, ComputationOutput, Money, Percent, Years};
use crate::FixedIncomeResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const YIELD_MAX_ITERATIONS: u32 = 100;
const YIELD_TOLERANCE: Decimal = dec!(0.00000001);
/// One basis point on the percentage scale.
const YIELD_BUMP: Percent = dec!(0.01);
const YIELD_LOWER_BOUND: Percent = dec!(-10);
const YIELD_UPPER_BOUND: Percent = dec!(100);
const DEFAULT_INITIAL_YIELD: Percent = dec!(5);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input parameters for bond pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondPricingInput {
    pub bond: Bond,
    /// Yield to maturity in percent (4.5 = 4.5%)
    pub ytm: Percent,
    pub settlement_date: NaiveDate,
}

/// Output of bond pricing computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondPricingOutput {
    /// Present value of remaining cash flows
    pub clean_price: Money,
    /// Clean price plus accrued interest
    pub dirty_price: Money,
    pub accrued_interest: Money,
    /// Annual coupon / clean price, in percent
    pub current_yield: Percent,
    pub years_to_maturity: Years,
    pub num_remaining_coupons: u32,
    pub coupon_amount: Money,
    pub cashflows: Vec<CashFlow>,
    /// Workout price for callable/putable bonds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_adjusted_price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yield_to_worst: Option<YieldToWorst>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Price a bond: clean/dirty prices, accrued interest, current yield and the
/// cash-flow schedule, plus a workout price and yield-to-worst for bonds
/// carrying a call or put schedule.
pub fn price_bond(
    input: &BondPricingInput,
) -> FixedIncomeResult<ComputationOutput<BondPricingOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let bond = &input.bond;
    let settlement = input.settlement_date;
    bond.validate(settlement)?;

    let cashflows = generate_cash_flows(bond, settlement)?;
    let clean_price = price_from_yield(bond, input.ytm, settlement)?;
    let accrued = accrued_interest(bond, settlement)?;
    let years_to_maturity = year_fraction(settlement, bond.maturity_date(), bond.day_count())?;

    if input.ytm < Decimal::ZERO {
        warnings.push(format!("Negative yield {}% applied", input.ytm));
    }

    let current = match current_yield(bond, clean_price) {
        Ok(cy) => cy,
        Err(_) => {
            warnings.push("Clean price is zero or negative; current yield undefined".into());
            Decimal::ZERO
        }
    };

    let (option_adjusted_price, ytw) = match bond.option_kind() {
        Some(_) => {
            warnings.push(
                "Embedded option valued as a deterministic workout to each exercise date, \
                 not a lattice model"
                    .into(),
            );
            let workout = price_with_embedded_options(bond, input.ytm, settlement)?;
            let ytw = match yield_to_worst(bond, workout, settlement) {
                Ok(y) => Some(y),
                Err(e) => {
                    warnings.push(format!("Yield to worst unavailable: {e}"));
                    None
                }
            };
            (Some(workout), ytw)
        }
        None => (None, None),
    };

    let output = BondPricingOutput {
        clean_price,
        dirty_price: clean_price + accrued,
        accrued_interest: accrued,
        current_yield: current,
        years_to_maturity,
        num_remaining_coupons: cashflows.len() as u32,
        coupon_amount: bond.coupon_per_period(),
        cashflows,
        option_adjusted_price,
        yield_to_worst: ytw,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Bond Pricing (PV of cash flows at a flat yield, coupon-frequency compounding)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

/// Price from a yield in percent: the present value of all remaining cash
/// flows, each discounted by `(1 + y/100/f)^(t*f)` with `t` the year
/// fraction from settlement. The sum is reported as the clean price.
pub fn price_from_yield(
    bond: &Bond,
    yield_pct: Percent,
    settlement: NaiveDate,
) -> FixedIncomeResult<Money> {
    bond.validate(settlement)?;
    match bond {
        Bond::ZeroCoupon(zero) => price_zero_coupon(zero, yield_pct, settlement),
        Bond::FloatingRate(frn) => price_floating_rate_note(frn, yield_pct, settlement),
        Bond::FixedRate(_) | Bond::Callable(_) | Bond::Putable(_) => {
            let flows = generate_cash_flows(bond, settlement)?;
            present_value(
                &flows,
                yield_pct,
                bond.frequency(),
                bond.day_count(),
                settlement,
            )
        }
    }
}

/// Clean price plus accrued interest.
pub fn dirty_price(
    bond: &Bond,
    yield_pct: Percent,
    settlement: NaiveDate,
) -> FixedIncomeResult<Money> {
    Ok(price_from_yield(bond, yield_pct, settlement)? + accrued_interest(bond, settlement)?)
}

/// Zero-coupon price: face discounted over the full term.
pub fn price_zero_coupon(
    bond: &ZeroCouponBond,
    yield_pct: Percent,
    settlement: NaiveDate,
) -> FixedIncomeResult<Money> {
    let t = year_fraction(settlement, bond.maturity_date, bond.day_count)?;
    let df = discount_factor_at_yield(yield_pct, bond.frequency, t)?;
    Ok(bond.face_value * df)
}

/// Floating-rate note priced on the reset-at-par assumption: immediately
/// after the next fixing the note is worth par, so only the known next
/// coupon plus face value is discounted, to the next coupon date.
pub fn price_floating_rate_note(
    frn: &FloatingRateNote,
    yield_pct: Percent,
    settlement: NaiveDate,
) -> FixedIncomeResult<Money> {
    let next = next_coupon_date(settlement, frn.maturity_date, frn.frequency);
    let t = year_fraction(settlement, next, frn.day_count)?;
    let coupon = Bond::FloatingRate(frn.clone()).coupon_per_period();
    let df = discount_factor_at_yield(yield_pct, frn.frequency, t)?;
    Ok((coupon + frn.face_value) * df)
}

/// Solve for the yield (percent) that reprices `bond` to `price`.
///
/// Newton-Raphson with a forward finite-difference slope (1 bp bump),
/// converged when the price gap is below 1e-8. Fails with `Convergence`
/// after 100 iterations, when an estimate leaves [-10%, 100%], or when the
/// slope degenerates. Without `initial_guess` the search starts from the
/// approximate yield to maturity.
pub fn yield_from_price(
    bond: &Bond,
    price: Money,
    settlement: NaiveDate,
    initial_guess: Option<Percent>,
) -> FixedIncomeResult<Percent> {
    bond.validate(settlement)?;
    validate_price(price)?;

    let settings = yield_solver_settings("yield_from_price");
    let initial = match initial_guess {
        Some(guess) => guess,
        None => {
            let years = year_fraction(settlement, bond.maturity_date(), bond.day_count())?;
            approximate_yield(bond, price, bond.face_value(), years)
        }
    };
    newton_solve(&settings, initial, |y| {
        Ok(price_from_yield(bond, y, settlement)? - price)
    })
}

/// Coupon accrued from the previous coupon date to settlement.
///
/// The elapsed fraction of the current period is measured under the bond's
/// day count: 30/360 days over 360/f, actual days over 360/f or 365/f, or
/// actual days over the actual period length for ACT/ACT.
pub fn accrued_interest(bond: &Bond, settlement: NaiveDate) -> FixedIncomeResult<Money> {
    bond.validate(settlement)?;
    if let Bond::ZeroCoupon(_) = bond {
        return Ok(Decimal::ZERO);
    }

    let freq = bond.frequency();
    let last = previous_coupon_date(settlement, bond.maturity_date(), freq);
    if last == settlement {
        return Ok(Decimal::ZERO);
    }
    let next = next_coupon_date(settlement, bond.maturity_date(), freq);
    let f = Decimal::from(freq);
    let actual_days = Decimal::from((settlement - last).num_days());

    let fraction = match bond.day_count() {
        DayCountConvention::Thirty360 => {
            Decimal::from(thirty_360_days(last, settlement)) / (dec!(360) / f)
        }
        DayCountConvention::Actual360 => actual_days / (dec!(360) / f),
        DayCountConvention::Actual365 => actual_days / (dec!(365) / f),
        DayCountConvention::ActualActual => {
            let period_days = (next - last).num_days();
            if period_days == 0 {
                return Err(FixedIncomeError::DivisionByZero {
                    context: "accrued interest period length".into(),
                });
            }
            actual_days / Decimal::from(period_days)
        }
    };

    Ok(bond.coupon_per_period() * fraction)
}

/// Deterministic workout price for bonds with embedded options: a callable
/// bond is worth the minimum of its straight price and the price to each
/// future call; a putable bond the maximum over each future put.
pub fn price_with_embedded_options(
    bond: &Bond,
    yield_pct: Percent,
    settlement: NaiveDate,
) -> FixedIncomeResult<Money> {
    let straight = price_from_yield(bond, yield_pct, settlement)?;
    let kind = match bond.option_kind() {
        Some(kind) => kind,
        None => return Ok(straight),
    };

    let mut workout = straight;
    for exercise in bond.exercise_schedule() {
        if exercise.date <= settlement {
            continue;
        }
        let flows = redemption_schedule(
            bond.coupon_per_period(),
            settlement,
            exercise.date,
            exercise.price,
            bond.frequency(),
        );
        let to_exercise = present_value(
            &flows,
            yield_pct,
            bond.frequency(),
            bond.day_count(),
            settlement,
        )?;
        workout = match kind {
            OptionKind::Call => workout.min(to_exercise),
            OptionKind::Put => workout.max(to_exercise),
        };
    }
    Ok(workout)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Sum of flows discounted at a flat yield compounded `frequency` times a year.
pub(crate) fn present_value(
    flows: &[CashFlow],
    yield_pct: Percent,
    frequency: u8,
    day_count: DayCountConvention,
    settlement: NaiveDate,
) -> FixedIncomeResult<Money> {
    let mut pv = Decimal::ZERO;
    for flow in flows {
        let t = year_fraction(settlement, flow.date, day_count)?;
        pv += flow.amount * discount_factor_at_yield(yield_pct, frequency, t)?;
    }
    Ok(pv)
}

/// Flows the pricing engine discounts: the full schedule, except for a
/// floater where reset-at-par leaves only the next coupon plus face value.
pub(crate) fn pricing_flows(bond: &Bond, settlement: NaiveDate) -> FixedIncomeResult<Vec<CashFlow>> {
    match bond {
        Bond::FloatingRate(frn) => {
            bond.validate(settlement)?;
            Ok(vec![CashFlow {
                date: next_coupon_date(settlement, frn.maturity_date, frn.frequency),
                amount: bond.coupon_per_period() + frn.face_value,
                cashflow_type: CashFlowType::Principal,
            }])
        }
        Bond::FixedRate(_) | Bond::ZeroCoupon(_) | Bond::Callable(_) | Bond::Putable(_) => {
            generate_cash_flows(bond, settlement)
        }
    }
}

/// `(1 + y/100/f)^(-t*f)`.
pub(crate) fn discount_factor_at_yield(
    yield_pct: Percent,
    frequency: u8,
    t: Years,
) -> FixedIncomeResult<Decimal> {
    let f = Decimal::from(frequency);
    let base = Decimal::ONE + yield_pct / dec!(100) / f;
    if base <= Decimal::ZERO {
        return Err(FixedIncomeError::FinancialImpossibility(format!(
            "Yield {yield_pct}% gives a non-positive periodic growth factor"
        )));
    }
    let growth = pow_decimal(base, t * f)?;
    if growth.is_zero() {
        return Err(FixedIncomeError::DivisionByZero {
            context: format!("discount factor at {yield_pct}% over {t} years underflowed"),
        });
    }
    Ok(Decimal::ONE / growth)
}

pub(crate) fn yield_solver_settings(function: &'static str) -> NewtonSettings {
    NewtonSettings {
        function,
        tolerance: YIELD_TOLERANCE,
        max_iterations: YIELD_MAX_ITERATIONS,
        bump: YIELD_BUMP,
        lower: YIELD_LOWER_BOUND,
        upper: YIELD_UPPER_BOUND,
    }
}

/// Starting point for the yield solvers: the textbook approximation
/// `(C + (R - P) / n) / ((R + P) / 2)`, kept inside the solver bounds.
pub(crate) fn approximate_yield(
    bond: &Bond,
    price: Money,
    redemption: Money,
    years: Years,
) -> Percent {
    if years <= Decimal::ZERO {
        return DEFAULT_INITIAL_YIELD;
    }
    let average = (redemption + price) / dec!(2);
    if average <= Decimal::ZERO {
        return DEFAULT_INITIAL_YIELD;
    }
    let estimate = (bond.annual_coupon() + (redemption - price) / years) / average * dec!(100);
    estimate
        .max(YIELD_LOWER_BOUND + Decimal::ONE)
        .min(YIELD_UPPER_BOUND - Decimal::ONE)
}

pub(crate) fn validate_price(price: Money) -> FixedIncomeResult<()> {
    if price <= Decimal::ZERO {
        return Err(FixedIncomeError::invalid_input(
            "price",
            "Price must be positive",
        ));
    }
    Ok(())
}
