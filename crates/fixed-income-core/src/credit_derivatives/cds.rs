use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::FixedIncomeError;
use crate::fixed_income::spreads::{hazard_rate_from_spread, DefaultProbabilityCurve};
use crate::math::{exp_decimal, pow_decimal};
use crate::types::{
    bps_to_rate, percentage_to_rate, with_metadata, Bps, ComputationOutput, Money, Percent, Rate,
    Years, BPS_PER_UNIT,
};
use crate::FixedIncomeResult;

const MAX_MATURITY_YEARS: u32 = 30;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdsInput {
    pub reference_entity: String,
    pub notional: Money,
    /// Contractual running spread
    pub spread_bps: Bps,
    /// Expected recovery rate (e.g. 0.40)
    pub recovery_rate: Rate,
    /// Annually compounded risk-free rate, in percent
    pub risk_free_rate: Percent,
    /// Tenor in whole years (1-30)
    pub maturity_years: u32,
    /// Premium payments per year (1, 2, 4 or 12)
    pub payment_frequency: u8,
    /// Constant hazard rate per year. Implied from the spread when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hazard_rate: Option<Rate>,
    /// Current market spread; the contract is marked against it when given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_spread_bps: Option<Bps>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalPoint {
    pub year: u32,
    pub survival_probability: Rate,
    pub cumulative_default_probability: Rate,
    pub discount_factor: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTriangle {
    pub spread_bps: Bps,
    pub hazard_rate: Rate,
    pub recovery_rate: Rate,
    pub loss_given_default: Rate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CdsOutput {
    pub reference_entity: String,
    pub notional: Money,
    pub spread_bps: Bps,
    /// notional * spread
    pub annual_premium: Money,
    pub hazard_rate: Rate,
    /// Year-end survival, cumulative default and discount factors
    pub survival_probabilities: Vec<SurvivalPoint>,
    pub default_curve: DefaultProbabilityCurve,
    /// Risky annuity per unit notional, including accrual on default
    pub risky_pv01: Decimal,
    pub protection_leg_pv: Money,
    /// Premium leg at the contractual spread
    pub premium_leg_pv: Money,
    /// Protection leg over risky annuity
    pub breakeven_spread_bps: Bps,
    /// Value to the protection buyer: protection minus premium, on the
    /// market curve when a market spread is given
    pub mark_to_market: Money,
    /// Mark-to-market as a percentage of notional
    pub upfront_pct: Percent,
    /// Risky PV01 x notional / 10000
    pub dv01: Money,
    /// Protection payout on immediate default less half a period of accrued
    pub jump_to_default: Money,
    pub credit_triangle: CreditTriangle,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Price a single-name credit default swap under a constant hazard rate.
///
/// Survival is `exp(-lambda t)`, discounting is annually compounded at the
/// risk-free rate, and both legs are summed over the premium schedule. A
/// default inside a period pays half that period's premium as accrual.
pub fn price_cds(input: &CdsInput) -> FixedIncomeResult<ComputationOutput<CdsOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    validate_cds_input(input)?;

    let lgd = Decimal::ONE - input.recovery_rate;
    let hazard = match input.hazard_rate {
        Some(h) => h,
        None => hazard_rate_from_spread(input.spread_bps, input.recovery_rate)?,
    };

    let model = leg_values(input, hazard)?;
    let contract_spread = bps_to_rate(input.spread_bps);

    let market = match input.market_spread_bps {
        Some(mkt) => {
            let market_hazard = hazard_rate_from_spread(mkt, input.recovery_rate)?;
            Some(leg_values(input, market_hazard)?)
        }
        None => None,
    };
    let marking = market.as_ref().unwrap_or(&model);
    let mark_to_market =
        (marking.protection - contract_spread * marking.risky_pv01) * input.notional;

    let breakeven_spread_bps = if model.risky_pv01.is_zero() {
        Decimal::ZERO
    } else {
        model.protection / model.risky_pv01 * BPS_PER_UNIT
    };
    if input.hazard_rate.is_some() {
        let implied = bps_to_rate(input.spread_bps) / lgd;
        if (implied - hazard).abs() > dec!(0.0001) {
            warnings.push(format!(
                "Supplied hazard rate {hazard} differs from the spread-implied {implied}"
            ));
        }
    }

    let dt = Decimal::ONE / Decimal::from(input.payment_frequency);
    let accrued = contract_spread * input.notional * dt / dec!(2);

    let tenors: Vec<Years> = model
        .schedule
        .iter()
        .map(|p| Decimal::from(p.year))
        .collect();
    let cumulative: Vec<Rate> = model
        .schedule
        .iter()
        .map(|p| p.cumulative_default_probability)
        .collect();
    let default_curve = DefaultProbabilityCurve::from_cumulative(tenors, cumulative)?;

    let output = CdsOutput {
        reference_entity: input.reference_entity.clone(),
        notional: input.notional,
        spread_bps: input.spread_bps,
        annual_premium: input.notional * contract_spread,
        hazard_rate: hazard,
        survival_probabilities: model.schedule.clone(),
        default_curve,
        risky_pv01: model.risky_pv01,
        protection_leg_pv: model.protection * input.notional,
        premium_leg_pv: contract_spread * model.risky_pv01 * input.notional,
        breakeven_spread_bps,
        mark_to_market,
        upfront_pct: mark_to_market / input.notional * dec!(100),
        dv01: model.risky_pv01 * input.notional / BPS_PER_UNIT,
        jump_to_default: input.notional * lgd - accrued,
        credit_triangle: CreditTriangle {
            spread_bps: input.spread_bps,
            hazard_rate: hazard,
            recovery_rate: input.recovery_rate,
            loss_given_default: lgd,
        },
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "hazard_model": "constant hazard, S(t) = exp(-lambda t)",
        "hazard_source": if input.hazard_rate.is_some() { "supplied" } else { "spread / (1 - R)" },
        "discounting": "annual compounding at the risk-free rate",
        "accrual_on_default": "half period",
        "payment_frequency": input.payment_frequency,
    });

    Ok(with_metadata(
        "CDS Pricing (constant hazard rate)",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Leg computation
// ---------------------------------------------------------------------------

struct LegValues {
    risky_pv01: Decimal,
    protection: Decimal,
    schedule: Vec<SurvivalPoint>,
}

/// Premium and protection legs per unit notional.
fn leg_values(input: &CdsInput, hazard: Rate) -> FixedIncomeResult<LegValues> {
    let lgd = Decimal::ONE - input.recovery_rate;
    let f = u32::from(input.payment_frequency);
    let dt = Decimal::ONE / Decimal::from(f);
    let growth = Decimal::ONE + percentage_to_rate(input.risk_free_rate);

    let mut risky_pv01 = Decimal::ZERO;
    let mut protection = Decimal::ZERO;
    let mut schedule = Vec::with_capacity(input.maturity_years as usize);
    let mut prev_survival = Decimal::ONE;

    for period in 1..=input.maturity_years * f {
        let t = Decimal::from(period) * dt;
        let survival = exp_decimal(-hazard * t)?;
        let df = pow_decimal(growth, -t)?;
        let default_in_period = prev_survival - survival;

        risky_pv01 += dt * survival * df + dt / dec!(2) * default_in_period * df;
        protection += lgd * default_in_period * df;

        if period % f == 0 {
            schedule.push(SurvivalPoint {
                year: period / f,
                survival_probability: survival,
                cumulative_default_probability: Decimal::ONE - survival,
                discount_factor: df,
            });
        }
        prev_survival = survival;
    }

    Ok(LegValues {
        risky_pv01,
        protection,
        schedule,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_cds_input(input: &CdsInput) -> FixedIncomeResult<()> {
    if input.notional <= Decimal::ZERO {
        return Err(FixedIncomeError::invalid_input(
            "notional",
            "Notional must be positive",
        ));
    }
    if input.recovery_rate < Decimal::ZERO || input.recovery_rate >= Decimal::ONE {
        return Err(FixedIncomeError::invalid_input(
            "recovery_rate",
            "Recovery rate must be in [0, 1)",
        ));
    }
    if input.risk_free_rate <= dec!(-100) {
        return Err(FixedIncomeError::invalid_input(
            "risk_free_rate",
            "Risk-free rate must exceed -100%",
        ));
    }
    if input.maturity_years < 1 || input.maturity_years > MAX_MATURITY_YEARS {
        return Err(FixedIncomeError::invalid_input(
            "maturity_years",
            format!("Maturity must be between 1 and {MAX_MATURITY_YEARS} years"),
        ));
    }
    if !matches!(input.payment_frequency, 1 | 2 | 4 | 12) {
        return Err(FixedIncomeError::invalid_input(
            "payment_frequency",
            "Payment frequency must be 1, 2, 4 or 12",
        ));
    }
    if input.spread_bps < Decimal::ZERO {
        return Err(FixedIncomeError::invalid_input(
            "spread_bps",
            "Spread cannot be negative",
        ));
    }
    if let Some(mkt) = input.market_spread_bps {
        if mkt < Decimal::ZERO {
            return Err(FixedIncomeError::invalid_input(
                "market_spread_bps",
                "Market spread cannot be negative",
            ));
        }
    }
    if let Some(h) = input.hazard_rate {
        if h < Decimal::ZERO {
            return Err(FixedIncomeError::invalid_input(
                "hazard_rate",
                "Hazard rate cannot be negative",
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
