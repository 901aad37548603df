use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fixed_income_core::day_count::{year_fraction, DayCountConvention};
use fixed_income_core::fixed_income::bonds::{self, BondPricingInput};
use fixed_income_core::fixed_income::curves::{
    self, BootstrapInstrument, YieldCurve, YieldCurvePoint,
};
use fixed_income_core::fixed_income::duration::{self, DurationInput};
use fixed_income_core::fixed_income::spreads::{self, CreditSpreadInput, SpreadPoint};
use fixed_income_core::fixed_income::yields::{self, YieldAnalysisInput};

use super::InputArgs;
use crate::input;

const DEFAULT_RECOVERY_RATE: Decimal = dec!(0.40);

// ---------------------------------------------------------------------------
// Request shapes for library calls that take plain arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BootstrapRequest {
    instruments: Vec<BootstrapInstrument>,
    settlement_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct NelsonSiegelRequest {
    points: Vec<YieldCurvePoint>,
    #[serde(default)]
    lambda: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct SvenssonRequest {
    points: Vec<YieldCurvePoint>,
    #[serde(default)]
    lambda1: Option<Decimal>,
    #[serde(default)]
    lambda2: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct InterpolateRequest {
    curve: YieldCurve,
    maturities: Vec<Decimal>,
}

#[derive(Debug, Serialize)]
struct InterpolatedPoint {
    maturity: Decimal,
    rate: Decimal,
    discount_factor: Decimal,
}

#[derive(Debug, Deserialize)]
struct ForwardRateRequest {
    curve: YieldCurve,
    /// Single forward between two tenors; the whole forward curve otherwise
    #[serde(default)]
    start: Option<Decimal>,
    #[serde(default)]
    end: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct DefaultProbabilityRequest {
    spreads: Vec<SpreadPoint>,
    #[serde(default)]
    recovery_rate: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Bond analytics
// ---------------------------------------------------------------------------

pub fn run_bond_pricing(args: InputArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let pricing_input: BondPricingInput = input::read_input(args.input.as_deref(), "price-bond")?;
    let result = bonds::price_bond(&pricing_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_bond_yield(args: InputArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let yield_input: YieldAnalysisInput = input::read_input(args.input.as_deref(), "bond-yield")?;
    let result = yields::analyze_yields(&yield_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_duration(args: InputArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dur_input: DurationInput = input::read_input(args.input.as_deref(), "duration")?;
    let result = duration::calculate_duration(&dur_input)?;
    Ok(serde_json::to_value(result)?)
}

// ---------------------------------------------------------------------------
// Curves
// ---------------------------------------------------------------------------

pub fn run_bootstrap(args: InputArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: BootstrapRequest = input::read_input(args.input.as_deref(), "bootstrap")?;
    tracing::debug!(instruments = request.instruments.len(), "bootstrapping zero curve");
    let curve = curves::bootstrap_curve(&request.instruments, request.settlement_date)?;
    Ok(serde_json::to_value(curve)?)
}

pub fn run_nelson_siegel(args: InputArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: NelsonSiegelRequest = input::read_input(args.input.as_deref(), "nelson-siegel")?;
    let fit = curves::fit_nelson_siegel(&request.points, request.lambda)?;
    tracing::debug!(rmse = %fit.rmse, "Nelson-Siegel fit");
    Ok(serde_json::to_value(fit)?)
}

pub fn run_svensson(args: InputArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: SvenssonRequest = input::read_input(args.input.as_deref(), "svensson")?;
    let fit = curves::fit_svensson(&request.points, request.lambda1, request.lambda2)?;
    tracing::debug!(rmse = %fit.rmse, "Svensson fit");
    Ok(serde_json::to_value(fit)?)
}

pub fn run_interpolate(args: InputArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: InterpolateRequest = input::read_input(args.input.as_deref(), "interpolate")?;
    let points = request
        .maturities
        .iter()
        .map(|&t| -> Result<InterpolatedPoint, Box<dyn std::error::Error>> {
            Ok(InterpolatedPoint {
                maturity: t,
                rate: request.curve.rate_at(t)?,
                discount_factor: curves::discount_factor(&request.curve, t)?,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::to_value(points)?)
}

pub fn run_forward_rate(args: InputArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: ForwardRateRequest = input::read_input(args.input.as_deref(), "forward-rate")?;
    match (request.start, request.end) {
        (Some(start), Some(end)) => {
            let forward = curves::forward_rate_from_spot(
                request.curve.rate_at(start)?,
                start,
                request.curve.rate_at(end)?,
                end,
            )?;
            Ok(serde_json::json!({ "start": start, "end": end, "rate": forward }))
        }
        (None, None) => Ok(serde_json::to_value(curves::forward_curve(&request.curve)?)?),
        _ => Err("forward-rate needs both 'start' and 'end', or neither".into()),
    }
}

// ---------------------------------------------------------------------------
// Credit
// ---------------------------------------------------------------------------

pub fn run_credit_spreads(args: InputArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let spread_input: CreditSpreadInput =
        input::read_input(args.input.as_deref(), "credit-spreads")?;
    let result = spreads::calculate_credit_spreads(&spread_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_default_probability(
    args: InputArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request: DefaultProbabilityRequest =
        input::read_input(args.input.as_deref(), "default-probability")?;
    let recovery = request.recovery_rate.unwrap_or(DEFAULT_RECOVERY_RATE);
    let curve = spreads::default_probability_curve(&request.spreads, recovery)?;
    Ok(serde_json::to_value(curve)?)
}

// ---------------------------------------------------------------------------
// Day count
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConventionArg {
    #[value(name = "30/360", alias = "thirty360")]
    Thirty360,
    #[value(name = "act/360", alias = "actual360")]
    Actual360,
    #[value(name = "act/365", alias = "actual365")]
    Actual365,
    #[value(name = "act/act", alias = "actualactual")]
    ActualActual,
}

impl From<ConventionArg> for DayCountConvention {
    fn from(arg: ConventionArg) -> Self {
        match arg {
            ConventionArg::Thirty360 => DayCountConvention::Thirty360,
            ConventionArg::Actual360 => DayCountConvention::Actual360,
            ConventionArg::Actual365 => DayCountConvention::Actual365,
            ConventionArg::ActualActual => DayCountConvention::ActualActual,
        }
    }
}

/// Arguments for a year fraction between two dates
#[derive(Args)]
pub struct YearFractionArgs {
    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,
    /// End date (YYYY-MM-DD), strictly after start
    #[arg(long)]
    pub end: NaiveDate,
    /// Day count convention
    #[arg(long, default_value = "30/360")]
    pub convention: ConventionArg,
}

pub fn run_year_fraction(args: YearFractionArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let convention = DayCountConvention::from(args.convention);
    let fraction = year_fraction(args.start, args.end, convention)?;
    Ok(serde_json::json!({
        "start": args.start,
        "end": args.end,
        "convention": convention,
        "year_fraction": fraction,
    }))
}
