//! Credit spread and default-probability analytics.
//!
//! Spreads are quoted in basis points over a benchmark zero curve; default
//! probabilities come from a constant-hazard reduced-form model,
//! `lambda = s / (1 - R)`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::day_count::year_fraction;
use crate::error::FixedIncomeError;
use crate::fixed_income::bonds::{
    discount_factor_at_yield, price_with_embedded_options, pricing_flows, validate_price,
    yield_from_price,
};
use crate::fixed_income::curves::YieldCurve;
use crate::fixed_income::instruments::{Bond, OptionKind};
use crate::math::{exp_decimal, newton_solve, NewtonSettings};
use crate::types::{
    bps_to_percentage, bps_to_rate, percentage_to_bps, with_metadata, Bps, ComputationOutput,
    Money, Percent, Rate, Years, BPS_PER_UNIT,
};
use crate::FixedIncomeResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const Z_SPREAD_MAX_ITERATIONS: u32 = 100;
const Z_SPREAD_TOLERANCE: Decimal = dec!(0.000001);
const ONE_BP: Bps = dec!(1);
const Z_SPREAD_LOWER: Bps = dec!(-1000);
const Z_SPREAD_UPPER: Bps = dec!(10000);
/// Benchmark zero rates are annually compounded.
const CURVE_COMPOUNDING: u8 = 1;

const LIQUIDITY_SHARE: Decimal = dec!(0.30);
const DEFAULT_RECOVERY: Rate = dec!(0.40);

/// Z-spread ceiling for investment grade, bps.
const IG_CEILING: Bps = dec!(200);
/// Z-spread ceiling for high yield, bps.
const HY_CEILING: Bps = dec!(1000);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Yield spread split into expected loss, liquidity and a tax/other residual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditSpreadDecomposition {
    pub total_spread_bps: Bps,
    /// Annual PD times loss given default
    pub default_component_bps: Bps,
    pub liquidity_component_bps: Bps,
    pub tax_component_bps: Bps,
}

/// Spread quote at a tenor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpreadPoint {
    pub tenor: Years,
    pub spread_bps: Bps,
}

/// Cumulative and marginal default probabilities by tenor.
///
/// `cumulative` is non-decreasing and within [0, 1];
/// `marginal[i] = cumulative[i] - cumulative[i - 1]`. Deserialized curves
/// must already satisfy this; `marginal` is always rederived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDefaultProbabilityCurve")]
pub struct DefaultProbabilityCurve {
    tenors: Vec<Years>,
    cumulative: Vec<Rate>,
    marginal: Vec<Rate>,
}

#[derive(Deserialize)]
struct RawDefaultProbabilityCurve {
    tenors: Vec<Years>,
    cumulative: Vec<Rate>,
}

impl TryFrom<RawDefaultProbabilityCurve> for DefaultProbabilityCurve {
    type Error = FixedIncomeError;

    fn try_from(raw: RawDefaultProbabilityCurve) -> Result<Self, Self::Error> {
        if raw.tenors.is_empty() {
            return Err(FixedIncomeError::InsufficientData(
                "Default probability curve needs at least one tenor".into(),
            ));
        }
        if raw.tenors[0] <= Decimal::ZERO {
            return Err(FixedIncomeError::invalid_input(
                "tenors",
                "Tenors must be positive",
            ));
        }
        if raw
            .cumulative
            .iter()
            .any(|pd| *pd < Decimal::ZERO || *pd > Decimal::ONE)
        {
            return Err(FixedIncomeError::invalid_input(
                "cumulative",
                "Cumulative default probabilities must be within [0, 1]",
            ));
        }
        if raw.cumulative.windows(2).any(|w| w[1] < w[0]) {
            return Err(FixedIncomeError::invalid_input(
                "cumulative",
                "Cumulative default probabilities must be non-decreasing",
            ));
        }
        DefaultProbabilityCurve::from_cumulative(raw.tenors, raw.cumulative)
    }
}

/// Input for the credit-spread suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditSpreadInput {
    pub bond: Bond,
    /// Market (clean) price in face-value units
    pub price: Money,
    pub settlement_date: NaiveDate,
    /// Risk-free zero curve, rates in percent
    pub benchmark_curve: YieldCurve,
    /// Recovery rate (default 0.40)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_rate: Option<Rate>,
}

/// Output of the credit-spread suite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditSpreadOutput {
    pub ytm: Percent,
    /// Benchmark zero rate interpolated at the bond's maturity
    pub benchmark_yield: Percent,
    /// YTM minus interpolated benchmark, bps
    pub i_spread: Bps,
    /// Same as the I-spread when the benchmark is a government curve
    pub g_spread: Bps,
    pub z_spread: Bps,
    /// Present for bonds with a call or put schedule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oas: Option<Bps>,
    /// Percentage price change per 100 bp of spread
    pub spread_duration: Decimal,
    /// Constant hazard implied by the Z-spread
    pub hazard_rate: Rate,
    /// Cumulative default probability to maturity
    pub default_probability: Rate,
    pub decomposition: CreditSpreadDecomposition,
    /// "investment_grade", "high_yield" or "distressed"
    pub credit_quality_indicator: String,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// I/G/Z-spreads, OAS, spread duration, implied default risk and a
/// credit-quality bucket for a bond against a benchmark curve.
pub fn calculate_credit_spreads(
    input: &CreditSpreadInput,
) -> FixedIncomeResult<ComputationOutput<CreditSpreadOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let bond = &input.bond;
    let settlement = input.settlement_date;
    let curve = &input.benchmark_curve;
    bond.validate(settlement)?;
    validate_price(input.price)?;
    let recovery = input.recovery_rate.unwrap_or(DEFAULT_RECOVERY);
    validate_recovery(recovery)?;

    let maturity = year_fraction(settlement, bond.maturity_date(), bond.day_count())?;
    let ytm = yield_from_price(bond, input.price, settlement, None)?;
    let benchmark_yield = curve.rate_at(maturity)?;
    let i_spread = percentage_to_bps(ytm - benchmark_yield);

    let z = z_spread(bond, input.price, curve, settlement)?;
    let spread_dur = spread_duration(bond, curve, z, input.price, settlement)?;

    let oas = match bond.option_kind() {
        Some(_) => {
            warnings.push(
                "OAS approximated from the deterministic workout value of the option".into(),
            );
            Some(option_adjusted_spread(bond, input.price, curve, settlement)?)
        }
        None => None,
    };

    if z < Decimal::ZERO {
        warnings.push(format!(
            "Negative Z-spread ({z} bps): default probability floored at zero"
        ));
    }
    let credit_spread = z.max(Decimal::ZERO);
    let hazard_rate = if recovery == Decimal::ONE {
        warnings.push("Recovery of 100% implies no loss; hazard rate set to zero".into());
        Decimal::ZERO
    } else {
        hazard_rate_from_spread(credit_spread, recovery)?
    };
    let default_probability = default_probability_from_spread(credit_spread, recovery, maturity)?;
    let annual_pd = default_probability_from_spread(credit_spread, recovery, Decimal::ONE)?;
    let decomposition =
        credit_spread_decomposition(ytm, benchmark_yield, annual_pd, recovery)?;
    if decomposition.tax_component_bps < Decimal::ZERO {
        warnings.push("Expected loss and liquidity exceed the total spread".into());
    }

    let output = CreditSpreadOutput {
        ytm,
        benchmark_yield,
        i_spread,
        g_spread: i_spread,
        z_spread: z,
        oas,
        spread_duration: spread_dur,
        hazard_rate,
        default_probability,
        decomposition,
        credit_quality_indicator: classify_credit_quality(z),
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Credit Spreads (I-spread, G-spread, Z-spread, OAS, implied default risk)",
        &serde_json::json!({
            "z_spread_method": "Newton-Raphson (100 iter, eps 1e-6)",
            "z_spread_compounding": "annual, on the benchmark zero curve",
            "spread_duration_bump": "1 bp",
            "hazard_model": "constant hazard, lambda = s / (1 - R)",
            "recovery_rate": recovery.to_string(),
            "benchmark_interpolation": "linear",
            "liquidity_share": LIQUIDITY_SHARE.to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Price with every flow discounted at the curve rate plus a constant
/// spread, compounded annually like the curve's zero rates:
/// `(1 + (r(t) + s) / 100)^(-t)`.
pub fn price_with_spread(
    bond: &Bond,
    curve: &YieldCurve,
    spread: Bps,
    settlement: NaiveDate,
) -> FixedIncomeResult<Money> {
    let flows = pricing_flows(bond, settlement)?;
    let spread_pct = bps_to_percentage(spread);
    let mut pv = Decimal::ZERO;
    for flow in &flows {
        let t = year_fraction(settlement, flow.date, bond.day_count())?;
        let rate = curve.rate_at(t)? + spread_pct;
        pv += flow.amount * discount_factor_at_yield(rate, CURVE_COMPOUNDING, t)?;
    }
    Ok(pv)
}

/// Constant spread over `curve` (bps) that reprices `bond` to `price`.
pub fn z_spread(
    bond: &Bond,
    price: Money,
    curve: &YieldCurve,
    settlement: NaiveDate,
) -> FixedIncomeResult<Bps> {
    bond.validate(settlement)?;
    validate_price(price)?;

    let settings = NewtonSettings {
        function: "z_spread",
        tolerance: Z_SPREAD_TOLERANCE,
        max_iterations: Z_SPREAD_MAX_ITERATIONS,
        bump: ONE_BP,
        lower: Z_SPREAD_LOWER,
        upper: Z_SPREAD_UPPER,
    };
    newton_solve(&settings, Decimal::ZERO, |s| {
        Ok(price_with_spread(bond, curve, s, settlement)? - price)
    })
}

/// Z-spread less the embedded call (plus the embedded put), the option
/// expressed in spread terms: its workout value at the bond's yield divided
/// by the price change per bp of spread. An approximation, not a lattice OAS.
pub fn option_adjusted_spread(
    bond: &Bond,
    price: Money,
    curve: &YieldCurve,
    settlement: NaiveDate,
) -> FixedIncomeResult<Bps> {
    let z = z_spread(bond, price, curve, settlement)?;
    let kind = match bond.option_kind() {
        Some(kind) => kind,
        None => return Ok(z),
    };

    let ytm = yield_from_price(bond, price, settlement, None)?;
    let workout = price_with_embedded_options(bond, ytm, settlement)?;
    let option_value = (price - workout).abs();

    let p_down = price_with_spread(bond, curve, z - ONE_BP, settlement)?;
    let p_up = price_with_spread(bond, curve, z + ONE_BP, settlement)?;
    let price_per_bp = (p_down - p_up) / dec!(2);
    if price_per_bp.is_zero() {
        return Err(FixedIncomeError::DivisionByZero {
            context: "OAS price change per bp".into(),
        });
    }

    let option_spread = option_value / price_per_bp;
    Ok(match kind {
        OptionKind::Call => z - option_spread,
        OptionKind::Put => z + option_spread,
    })
}

/// Split `corporate - treasury` into expected loss (PD x LGD), a fixed 30%
/// liquidity share and a tax/other residual. Yields in percent.
pub fn credit_spread_decomposition(
    corporate_yield: Percent,
    treasury_yield: Percent,
    default_probability: Rate,
    recovery_rate: Rate,
) -> FixedIncomeResult<CreditSpreadDecomposition> {
    validate_recovery(recovery_rate)?;
    if default_probability < Decimal::ZERO || default_probability > Decimal::ONE {
        return Err(FixedIncomeError::invalid_input(
            "default_probability",
            "Default probability must be between 0 and 1",
        ));
    }

    let total = percentage_to_bps(corporate_yield - treasury_yield);
    let default_component = default_probability * (Decimal::ONE - recovery_rate) * BPS_PER_UNIT;
    let liquidity = total * LIQUIDITY_SHARE;
    Ok(CreditSpreadDecomposition {
        total_spread_bps: total,
        default_component_bps: default_component,
        liquidity_component_bps: liquidity,
        tax_component_bps: total - default_component - liquidity,
    })
}

/// Constant hazard rate `s / (1 - R)` as a decimal per year.
pub fn hazard_rate_from_spread(spread: Bps, recovery_rate: Rate) -> FixedIncomeResult<Rate> {
    validate_recovery(recovery_rate)?;
    validate_spread(spread)?;
    let lgd = Decimal::ONE - recovery_rate;
    if lgd.is_zero() {
        return Err(FixedIncomeError::DivisionByZero {
            context: "hazard rate with 100% recovery".into(),
        });
    }
    Ok(bps_to_rate(spread) / lgd)
}

/// Cumulative default probability to `maturity`: `1 - exp(-lambda T)`.
///
/// With full recovery any positive spread is unexplained by credit loss and
/// maps to certain default; a zero spread maps to zero.
pub fn default_probability_from_spread(
    spread: Bps,
    recovery_rate: Rate,
    maturity: Years,
) -> FixedIncomeResult<Rate> {
    validate_recovery(recovery_rate)?;
    validate_spread(spread)?;
    if maturity < Decimal::ZERO {
        return Err(FixedIncomeError::invalid_input(
            "maturity",
            "Maturity cannot be negative",
        ));
    }

    if recovery_rate == Decimal::ONE {
        return Ok(if spread.is_zero() {
            Decimal::ZERO
        } else {
            Decimal::ONE
        });
    }

    let lambda = hazard_rate_from_spread(spread, recovery_rate)?;
    let pd = Decimal::ONE - exp_decimal(-lambda * maturity)?;
    Ok(pd.max(Decimal::ZERO).min(Decimal::ONE))
}

/// Default probability term structure from spreads quoted by tenor.
pub fn default_probability_curve(
    spreads: &[SpreadPoint],
    recovery_rate: Rate,
) -> FixedIncomeResult<DefaultProbabilityCurve> {
    if spreads.is_empty() {
        return Err(FixedIncomeError::InsufficientData(
            "Default probability curve needs at least one spread".into(),
        ));
    }
    let mut sorted = spreads.to_vec();
    sorted.sort_by(|a, b| a.tenor.cmp(&b.tenor));

    let tenors: Vec<Years> = sorted.iter().map(|p| p.tenor).collect();
    let cumulative = sorted
        .iter()
        .map(|p| default_probability_from_spread(p.spread_bps, recovery_rate, p.tenor))
        .collect::<FixedIncomeResult<Vec<_>>>()?;
    DefaultProbabilityCurve::from_cumulative(tenors, cumulative)
}

impl DefaultProbabilityCurve {
    /// Build from raw cumulative PDs, clamping into [0, 1] and enforcing
    /// monotonicity with a running maximum.
    pub fn from_cumulative(tenors: Vec<Years>, cumulative: Vec<Rate>) -> FixedIncomeResult<Self> {
        if tenors.len() != cumulative.len() {
            return Err(FixedIncomeError::invalid_input(
                "cumulative",
                "Tenors and cumulative probabilities must have equal length",
            ));
        }
        if tenors.windows(2).any(|w| w[1] <= w[0]) {
            return Err(FixedIncomeError::invalid_input(
                "tenors",
                "Tenors must be strictly increasing",
            ));
        }

        let mut running = Decimal::ZERO;
        let mut clean = Vec::with_capacity(cumulative.len());
        let mut marginal = Vec::with_capacity(cumulative.len());
        for pd in cumulative {
            let next = pd.max(running).min(Decimal::ONE);
            marginal.push(next - running);
            clean.push(next);
            running = next;
        }
        Ok(Self {
            tenors,
            cumulative: clean,
            marginal,
        })
    }

    /// Cumulative PD at `t`, linear between tenors, from zero at t = 0 and
    /// flat beyond the last tenor.
    pub fn cumulative_at(&self, t: Years) -> Rate {
        if t <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let mut prev_t = Decimal::ZERO;
        let mut prev_pd = Decimal::ZERO;
        for (&tenor, &pd) in self.tenors.iter().zip(&self.cumulative) {
            if t <= tenor {
                let span = tenor - prev_t;
                if span.is_zero() {
                    return pd;
                }
                return prev_pd + (pd - prev_pd) * (t - prev_t) / span;
            }
            prev_t = tenor;
            prev_pd = pd;
        }
        prev_pd
    }

    pub fn survival_at(&self, t: Years) -> Rate {
        Decimal::ONE - self.cumulative_at(t)
    }

    pub fn tenors(&self) -> &[Years] {
        &self.tenors
    }

    pub fn cumulative(&self) -> &[Rate] {
        &self.cumulative
    }

    pub fn marginal(&self) -> &[Rate] {
        &self.marginal
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Percentage price sensitivity per 100 bp of spread, from a 1 bp bump.
fn spread_duration(
    bond: &Bond,
    curve: &YieldCurve,
    z: Bps,
    price: Money,
    settlement: NaiveDate,
) -> FixedIncomeResult<Decimal> {
    let p_down = price_with_spread(bond, curve, z - ONE_BP, settlement)?;
    let p_up = price_with_spread(bond, curve, z + ONE_BP, settlement)?;
    Ok((p_down - p_up) / (dec!(2) * price * ONE_BP / BPS_PER_UNIT))
}

fn classify_credit_quality(z_spread: Bps) -> String {
    if z_spread < IG_CEILING {
        "investment_grade".to_string()
    } else if z_spread < HY_CEILING {
        "high_yield".to_string()
    } else {
        "distressed".to_string()
    }
}

fn validate_recovery(recovery_rate: Rate) -> FixedIncomeResult<()> {
    if recovery_rate < Decimal::ZERO || recovery_rate > Decimal::ONE {
        return Err(FixedIncomeError::invalid_input(
            "recovery_rate",
            "Recovery rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_spread(spread: Bps) -> FixedIncomeResult<()> {
    if spread < Decimal::ZERO {
        return Err(FixedIncomeError::invalid_input(
            "spread",
            "Credit spread cannot be negative",
        ));
    }
    Ok(())
}
