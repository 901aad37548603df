use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::day_count::year_fraction;
use crate::error::FixedIncomeError;
use crate::fixed_income::bonds::{
    discount_factor_at_yield, price_with_embedded_options, pricing_flows,
};
use crate::fixed_income::curves::YieldCurve;
use crate::fixed_income::instruments::Bond;
use crate::fixed_income::spreads::price_with_spread;
use crate::types::{
    bps_to_percentage, with_metadata, Bps, ComputationOutput, Money, Percent, Years, BPS_PER_UNIT,
};
use crate::FixedIncomeResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_SHOCK_BPS: Bps = dec!(10);
/// Parallel move used for the duration + convexity price-change estimate.
const ESTIMATE_SHIFT: Decimal = dec!(0.01);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input parameters for bond duration, convexity, and risk analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationInput {
    pub bond: Bond,
    /// Yield to maturity in percent
    pub ytm: Percent,
    pub settlement_date: NaiveDate,
    /// Yield shock for effective measures (default 10 bps)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shock_bps: Option<Bps>,
    /// Zero curve for key rate durations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub curve: Option<YieldCurve>,
}

/// Output of the duration and convexity calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationOutput {
    /// PV-weighted average time of cash flows (years)
    pub macaulay_duration: Years,
    /// Macaulay / (1 + y/f)
    pub modified_duration: Decimal,
    /// (P_down - P_up) / (2 * P * dy) with option-aware pricing
    pub effective_duration: Decimal,
    pub convexity: Decimal,
    pub effective_convexity: Decimal,
    /// Price change for a 1 bp move
    pub dv01: Money,
    pub price: Money,
    pub price_up: Money,
    pub price_down: Money,
    /// Estimated % price change for +100 bp from duration and convexity
    pub price_change_estimate_up: Decimal,
    /// Estimated % price change for -100 bp
    pub price_change_estimate_down: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_rate_durations: Option<Vec<KeyRateDuration>>,
}

/// Sensitivity to a single curve point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyRateDuration {
    pub tenor: Years,
    pub duration: Decimal,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Duration, convexity, DV01 and shocked prices for a bond at a yield, plus
/// key rate durations when a curve is supplied.
pub fn calculate_duration(
    input: &DurationInput,
) -> FixedIncomeResult<ComputationOutput<DurationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let bond = &input.bond;
    let settlement = input.settlement_date;
    let ytm = input.ytm;
    let shock = input.shock_bps.unwrap_or(DEFAULT_SHOCK_BPS);
    validate_shock(shock)?;
    bond.validate(settlement)?;

    let price = price_with_embedded_options(bond, ytm, settlement)?;
    let dy = bps_to_percentage(shock);
    let price_up = price_with_embedded_options(bond, ytm + dy, settlement)?;
    let price_down = price_with_embedded_options(bond, ytm - dy, settlement)?;

    let macaulay = macaulay_duration(bond, ytm, settlement)?;
    let modified = modified_duration(bond, ytm, settlement)?;
    let effective = effective_duration(bond, ytm, settlement, Some(shock))?;
    let convex = convexity(bond, ytm, settlement)?;
    let eff_convex = effective_convexity(bond, ytm, settlement, Some(shock))?;
    let dv01 = dollar_duration(bond, ytm, settlement)?;

    if bond.option_kind().is_some() {
        warnings.push(
            "Macaulay, modified and analytic convexity ignore the embedded option; \
             use the effective measures"
                .into(),
        );
    }

    let estimate =
        |shift: Decimal| (-modified * shift + dec!(0.5) * convex * shift * shift) * dec!(100);

    let key_rate_durations = match &input.curve {
        Some(curve) => Some(key_rate_durations(bond, curve, settlement, Some(shock))?),
        None => None,
    };

    let output = DurationOutput {
        macaulay_duration: macaulay,
        modified_duration: modified,
        effective_duration: effective,
        convexity: convex,
        effective_convexity: eff_convex,
        dv01,
        price,
        price_up,
        price_down,
        price_change_estimate_up: estimate(ESTIMATE_SHIFT),
        price_change_estimate_down: estimate(-ESTIMATE_SHIFT),
        key_rate_durations,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "frequency": bond.frequency(),
        "shock_bps": shock.to_string(),
        "compounding": "coupon frequency",
        "key_rate_compounding": "annual, on the supplied zero curve",
        "effective_pricing": "deterministic workout for embedded options",
        "price_change_estimate_shift": "100 bps",
    });

    Ok(with_metadata(
        "Bond Duration & Convexity",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

/// PV-weighted average time to each cash flow, in years.
pub fn macaulay_duration(
    bond: &Bond,
    yield_pct: Percent,
    settlement: NaiveDate,
) -> FixedIncomeResult<Years> {
    let flows = discounted_flows(bond, yield_pct, settlement)?;
    let price: Money = flows.iter().map(|f| f.pv).sum();
    if price.is_zero() {
        return Err(FixedIncomeError::DivisionByZero {
            context: "Macaulay duration: price is zero".into(),
        });
    }
    let weighted: Decimal = flows.iter().map(|f| f.t * f.pv).sum();
    Ok(weighted / price)
}

/// Macaulay duration over `1 + y/f`.
pub fn modified_duration(
    bond: &Bond,
    yield_pct: Percent,
    settlement: NaiveDate,
) -> FixedIncomeResult<Decimal> {
    let mac = macaulay_duration(bond, yield_pct, settlement)?;
    Ok(mac / periodic_growth(bond, yield_pct))
}

/// Symmetric finite-difference duration from option-aware repricing.
pub fn effective_duration(
    bond: &Bond,
    yield_pct: Percent,
    settlement: NaiveDate,
    shock_bps: Option<Bps>,
) -> FixedIncomeResult<Decimal> {
    let shock = shock_bps.unwrap_or(DEFAULT_SHOCK_BPS);
    validate_shock(shock)?;
    let dy = bps_to_percentage(shock);

    let base = price_with_embedded_options(bond, yield_pct, settlement)?;
    let up = price_with_embedded_options(bond, yield_pct + dy, settlement)?;
    let down = price_with_embedded_options(bond, yield_pct - dy, settlement)?;
    if base.is_zero() {
        return Err(FixedIncomeError::DivisionByZero {
            context: "effective duration: base price is zero".into(),
        });
    }
    Ok((down - up) / (dec!(2) * base * shock / BPS_PER_UNIT))
}

/// `(P_up + P_down - 2P) / (P * dy^2)` with option-aware repricing.
pub fn effective_convexity(
    bond: &Bond,
    yield_pct: Percent,
    settlement: NaiveDate,
    shock_bps: Option<Bps>,
) -> FixedIncomeResult<Decimal> {
    let shock = shock_bps.unwrap_or(DEFAULT_SHOCK_BPS);
    validate_shock(shock)?;
    let dy = bps_to_percentage(shock);

    let base = price_with_embedded_options(bond, yield_pct, settlement)?;
    let up = price_with_embedded_options(bond, yield_pct + dy, settlement)?;
    let down = price_with_embedded_options(bond, yield_pct - dy, settlement)?;
    if base.is_zero() {
        return Err(FixedIncomeError::DivisionByZero {
            context: "effective convexity: base price is zero".into(),
        });
    }
    let dy_unit = shock / BPS_PER_UNIT;
    Ok((up + down - dec!(2) * base) / (base * dy_unit * dy_unit))
}

/// Analytic convexity: `sum PV_i n_i (n_i + 1) / (P (1 + y/f)^2 f^2)` with
/// `n_i` the number of periods to flow `i`.
pub fn convexity(
    bond: &Bond,
    yield_pct: Percent,
    settlement: NaiveDate,
) -> FixedIncomeResult<Decimal> {
    let flows = discounted_flows(bond, yield_pct, settlement)?;
    let price: Money = flows.iter().map(|f| f.pv).sum();
    if price.is_zero() {
        return Err(FixedIncomeError::DivisionByZero {
            context: "convexity: price is zero".into(),
        });
    }

    let f = Decimal::from(bond.frequency());
    let numerator: Decimal = flows
        .iter()
        .map(|cf| {
            let n = cf.t * f;
            cf.pv * n * (n + Decimal::ONE)
        })
        .sum();
    let growth = periodic_growth(bond, yield_pct);
    Ok(numerator / (price * growth * growth * f * f))
}

/// DV01: modified duration x price x 0.0001.
pub fn dollar_duration(
    bond: &Bond,
    yield_pct: Percent,
    settlement: NaiveDate,
) -> FixedIncomeResult<Money> {
    let flows = discounted_flows(bond, yield_pct, settlement)?;
    let price: Money = flows.iter().map(|f| f.pv).sum();
    let modified = modified_duration(bond, yield_pct, settlement)?;
    Ok(modified * price / BPS_PER_UNIT)
}

/// Duration with respect to the single curve point at `tenor`, pricing off
/// the curve at the bond's compounding frequency.
pub fn key_rate_duration(
    bond: &Bond,
    curve: &YieldCurve,
    settlement: NaiveDate,
    tenor: Years,
    shock_bps: Option<Bps>,
) -> FixedIncomeResult<Decimal> {
    bond.validate(settlement)?;
    let index = curve
        .points()
        .iter()
        .position(|p| p.maturity == tenor)
        .ok_or_else(|| {
            FixedIncomeError::invalid_input("tenor", format!("No curve point at tenor {tenor}"))
        })?;
    key_rate_duration_at(bond, curve, settlement, index, shock_bps.unwrap_or(DEFAULT_SHOCK_BPS))
}

/// Key rate duration for every curve point.
pub fn key_rate_durations(
    bond: &Bond,
    curve: &YieldCurve,
    settlement: NaiveDate,
    shock_bps: Option<Bps>,
) -> FixedIncomeResult<Vec<KeyRateDuration>> {
    bond.validate(settlement)?;
    let shock = shock_bps.unwrap_or(DEFAULT_SHOCK_BPS);
    curve
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| -> FixedIncomeResult<KeyRateDuration> {
            Ok(KeyRateDuration {
                tenor: p.maturity,
                duration: key_rate_duration_at(bond, curve, settlement, i, shock)?,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct DiscountedFlow {
    t: Years,
    pv: Money,
}

fn discounted_flows(
    bond: &Bond,
    yield_pct: Percent,
    settlement: NaiveDate,
) -> FixedIncomeResult<Vec<DiscountedFlow>> {
    let flows = pricing_flows(bond, settlement)?;
    flows
        .iter()
        .map(|flow| {
            let t = year_fraction(settlement, flow.date, bond.day_count())?;
            let df = discount_factor_at_yield(yield_pct, bond.frequency(), t)?;
            Ok(DiscountedFlow {
                t,
                pv: flow.amount * df,
            })
        })
        .collect()
}

fn periodic_growth(bond: &Bond, yield_pct: Percent) -> Decimal {
    Decimal::ONE + yield_pct / dec!(100) / Decimal::from(bond.frequency())
}

fn key_rate_duration_at(
    bond: &Bond,
    curve: &YieldCurve,
    settlement: NaiveDate,
    index: usize,
    shock: Bps,
) -> FixedIncomeResult<Decimal> {
    validate_shock(shock)?;
    let base = price_with_spread(bond, curve, Decimal::ZERO, settlement)?;
    let up = price_with_spread(bond, &curve.bumped_at(index, shock)?, Decimal::ZERO, settlement)?;
    let down = price_with_spread(bond, &curve.bumped_at(index, -shock)?, Decimal::ZERO, settlement)?;
    if base.is_zero() {
        return Err(FixedIncomeError::DivisionByZero {
            context: "key rate duration: base price is zero".into(),
        });
    }
    Ok((down - up) / (dec!(2) * base * shock / BPS_PER_UNIT))
}

fn validate_shock(shock: Bps) -> FixedIncomeResult<()> {
    if shock <= Decimal::ZERO {
        return Err(FixedIncomeError::invalid_input(
            "shock_bps",
            "Shock must be positive",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
