//! Yield curve construction: bootstrapping zero rates from coupon bonds,
//! Nelson-Siegel and Svensson fits, interpolation and forward rates.
//!
//! Curve rates are annually compounded zero rates in percent.

use chrono::NaiveDate;
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::day_count::year_fraction;
use crate::error::FixedIncomeError;
use crate::fixed_income::bonds::{discount_factor_at_yield, validate_price, yield_from_price};
use crate::fixed_income::cashflows::generate_cash_flows;
use crate::fixed_income::instruments::{Bond, FixedRateBond};
use crate::math::{exp_decimal, pow_decimal, solve_linear_system};
use crate::types::{bps_to_percentage, Bps, Money, Percent, Years};
use crate::FixedIncomeResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const DEFAULT_NS_LAMBDA: Decimal = dec!(1.0);
const DEFAULT_SVENSSON_LAMBDA2: Decimal = dec!(5.0);
const HUNDRED: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CurveMethod {
    Bootstrap,
    NelsonSiegel,
    Svensson,
    /// Cubic Hermite interpolation between points
    Spline,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldCurvePoint {
    pub maturity: Years,
    pub rate: Percent,
}

/// Zero curve sorted by maturity with unique tenors and at least two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawYieldCurve")]
pub struct YieldCurve {
    points: Vec<YieldCurvePoint>,
    method: CurveMethod,
}

#[derive(Deserialize)]
struct RawYieldCurve {
    points: Vec<YieldCurvePoint>,
    #[serde(default)]
    method: CurveMethod,
}

impl TryFrom<RawYieldCurve> for YieldCurve {
    type Error = FixedIncomeError;

    fn try_from(raw: RawYieldCurve) -> Result<Self, Self::Error> {
        YieldCurve::new(raw.points, raw.method)
    }
}

/// A bond and its observed (clean) price, as bootstrap input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapInstrument {
    pub bond: FixedRateBond,
    pub price: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardRate {
    pub start: Years,
    pub end: Years,
    pub rate: Percent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPoint {
    pub maturity: Years,
    pub observed: Percent,
    pub fitted: Percent,
    pub error: Decimal,
}

/// Nelson-Siegel parameters at a fixed decay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NelsonSiegelFit {
    /// Long-term level
    pub beta0: Decimal,
    /// Short-term slope
    pub beta1: Decimal,
    /// Medium-term hump
    pub beta2: Decimal,
    pub lambda: Decimal,
    pub fitted: Vec<FittedPoint>,
    pub rmse: Decimal,
}

/// Svensson parameters: Nelson-Siegel plus a second hump at `lambda2`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvenssonFit {
    pub beta0: Decimal,
    pub beta1: Decimal,
    pub beta2: Decimal,
    pub beta3: Decimal,
    pub lambda1: Decimal,
    pub lambda2: Decimal,
    pub fitted: Vec<FittedPoint>,
    pub rmse: Decimal,
}

// ---------------------------------------------------------------------------
// YieldCurve
// ---------------------------------------------------------------------------

impl YieldCurve {
    /// Sorts by maturity and keeps the first point for each maturity.
    pub fn new(points: Vec<YieldCurvePoint>, method: CurveMethod) -> FixedIncomeResult<Self> {
        if let Some(p) = points.iter().find(|p| p.maturity < Decimal::ZERO) {
            return Err(FixedIncomeError::invalid_instrument(
                "maturity",
                format!("Curve maturity {} cannot be negative", p.maturity),
            ));
        }

        let mut points = points;
        // Stable sort preserves input order among equal maturities
        points.sort_by(|a, b| a.maturity.cmp(&b.maturity));
        points.dedup_by(|later, earlier| later.maturity == earlier.maturity);

        if points.len() < 2 {
            return Err(FixedIncomeError::InsufficientData(format!(
                "A yield curve needs at least 2 distinct maturities, got {}",
                points.len()
            )));
        }
        Ok(Self { points, method })
    }

    pub fn points(&self) -> &[YieldCurvePoint] {
        &self.points
    }

    pub fn method(&self) -> CurveMethod {
        self.method
    }

    /// Zero rate at `t`, flat beyond either end. Spline curves use cubic
    /// Hermite interpolation; every other method interpolates linearly.
    pub fn rate_at(&self, t: Years) -> FixedIncomeResult<Percent> {
        match self.method {
            CurveMethod::Spline => interpolate_cubic(&self.points, t),
            CurveMethod::Bootstrap
            | CurveMethod::NelsonSiegel
            | CurveMethod::Svensson
            | CurveMethod::Linear => interpolate_linear(&self.points, t),
        }
    }

    /// Parallel shift of every point.
    pub fn shifted(&self, shift: Bps) -> YieldCurve {
        let delta = bps_to_percentage(shift);
        YieldCurve {
            points: self
                .points
                .iter()
                .map(|p| YieldCurvePoint {
                    maturity: p.maturity,
                    rate: p.rate + delta,
                })
                .collect(),
            method: self.method,
        }
    }

    /// Copy with only the point at `index` moved by `shift`.
    pub fn bumped_at(&self, index: usize, shift: Bps) -> FixedIncomeResult<YieldCurve> {
        if index >= self.points.len() {
            return Err(FixedIncomeError::invalid_input(
                "index",
                format!(
                    "Curve point {index} out of range (curve has {} points)",
                    self.points.len()
                ),
            ));
        }
        let mut bumped = self.clone();
        bumped.points[index].rate += bps_to_percentage(shift);
        Ok(bumped)
    }
}

// ---------------------------------------------------------------------------
// Interpolation
// ---------------------------------------------------------------------------

/// Linear interpolation over points sorted by maturity; flat extrapolation.
pub fn interpolate_linear(points: &[YieldCurvePoint], t: Years) -> FixedIncomeResult<Percent> {
    let (first, last) = curve_ends(points)?;
    if t <= first.maturity {
        return Ok(first.rate);
    }
    if t >= last.maturity {
        return Ok(last.rate);
    }

    for w in points.windows(2) {
        let (lo, hi) = (w[0], w[1]);
        if t >= lo.maturity && t <= hi.maturity {
            let span = hi.maturity - lo.maturity;
            if span.is_zero() {
                return Ok(lo.rate);
            }
            let weight = (t - lo.maturity) / span;
            return Ok(lo.rate + weight * (hi.rate - lo.rate));
        }
    }
    Ok(last.rate)
}

/// Cubic Hermite interpolation; node slopes average the neighbouring
/// secant slopes (one-sided at the ends). Flat extrapolation.
pub fn interpolate_cubic(points: &[YieldCurvePoint], t: Years) -> FixedIncomeResult<Percent> {
    let (first, last) = curve_ends(points)?;
    if t <= first.maturity {
        return Ok(first.rate);
    }
    if t >= last.maturity {
        return Ok(last.rate);
    }

    let secants: Vec<Decimal> = points
        .windows(2)
        .map(|w| {
            let span = w[1].maturity - w[0].maturity;
            if span.is_zero() {
                Decimal::ZERO
            } else {
                (w[1].rate - w[0].rate) / span
            }
        })
        .collect();
    let n = points.len();
    let slope_at = |i: usize| -> Decimal {
        if i == 0 {
            secants[0]
        } else if i == n - 1 {
            secants[n - 2]
        } else {
            (secants[i - 1] + secants[i]) / dec!(2)
        }
    };

    for i in 0..n - 1 {
        let (lo, hi) = (points[i], points[i + 1]);
        if t < lo.maturity || t > hi.maturity {
            continue;
        }
        let h = hi.maturity - lo.maturity;
        if h.is_zero() {
            return Ok(lo.rate);
        }
        let s = (t - lo.maturity) / h;
        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = dec!(2) * s3 - dec!(3) * s2 + Decimal::ONE;
        let h10 = s3 - dec!(2) * s2 + s;
        let h01 = dec!(-2) * s3 + dec!(3) * s2;
        let h11 = s3 - s2;
        return Ok(h00 * lo.rate
            + h10 * h * slope_at(i)
            + h01 * hi.rate
            + h11 * h * slope_at(i + 1));
    }
    Ok(last.rate)
}

fn curve_ends(points: &[YieldCurvePoint]) -> FixedIncomeResult<(YieldCurvePoint, YieldCurvePoint)> {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() >= 2 => Ok((*first, *last)),
        _ => Err(FixedIncomeError::InsufficientData(format!(
            "Interpolation needs at least 2 points, got {}",
            points.len()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Forwards and discount factors
// ---------------------------------------------------------------------------

/// Forward rate between `t1` and `t2` implied by annually compounded spot
/// rates: `(1+s2)^t2 = (1+s1)^t1 * (1+f)^(t2-t1)`.
pub fn forward_rate_from_spot(
    s1: Percent,
    t1: Years,
    s2: Percent,
    t2: Years,
) -> FixedIncomeResult<Percent> {
    if t2 <= t1 {
        return Err(FixedIncomeError::invalid_instrument(
            "tenor",
            format!("Forward end {t2} must be after start {t1}"),
        ));
    }
    if t1 < Decimal::ZERO {
        return Err(FixedIncomeError::invalid_instrument(
            "tenor",
            "Forward start cannot be negative",
        ));
    }

    let growth_far = pow_decimal(Decimal::ONE + s2 / HUNDRED, t2)?;
    let growth_near = pow_decimal(Decimal::ONE + s1 / HUNDRED, t1)?;
    if growth_near.is_zero() {
        return Err(FixedIncomeError::DivisionByZero {
            context: "forward rate near-leg growth".into(),
        });
    }
    let forward = pow_decimal(growth_far / growth_near, Decimal::ONE / (t2 - t1))? - Decimal::ONE;
    Ok(forward * HUNDRED)
}

/// One-period forwards between consecutive curve points, starting with the
/// spot rate from 0 to the first tenor.
pub fn forward_curve(curve: &YieldCurve) -> FixedIncomeResult<Vec<ForwardRate>> {
    let points = curve.points();
    let mut forwards = Vec::with_capacity(points.len());

    if points[0].maturity > Decimal::ZERO {
        forwards.push(ForwardRate {
            start: Decimal::ZERO,
            end: points[0].maturity,
            rate: points[0].rate,
        });
    }
    for w in points.windows(2) {
        forwards.push(ForwardRate {
            start: w[0].maturity,
            end: w[1].maturity,
            rate: forward_rate_from_spot(w[0].rate, w[0].maturity, w[1].rate, w[1].maturity)?,
        });
    }
    Ok(forwards)
}

/// `(1 + r(t)/100)^(-t)`.
pub fn discount_factor(curve: &YieldCurve, t: Years) -> FixedIncomeResult<Decimal> {
    if t < Decimal::ZERO {
        return Err(FixedIncomeError::invalid_input(
            "t",
            "Discount horizon cannot be negative",
        ));
    }
    if t.is_zero() {
        return Ok(Decimal::ONE);
    }
    let rate = curve.rate_at(t)?;
    pow_decimal(Decimal::ONE + rate / HUNDRED, -t)
}

// ---------------------------------------------------------------------------
// Bootstrapping
// ---------------------------------------------------------------------------

/// Bootstrap annually compounded zero rates from coupon bonds.
///
/// Instruments are taken in maturity order. Each bond's intermediate flows
/// are discounted at rates interpolated from the zero rates solved so far
/// (the first bond, having none, uses its own yield), and the zero rate at
/// its final flow is solved from the remaining price.
pub fn bootstrap_curve(
    instruments: &[BootstrapInstrument],
    settlement: NaiveDate,
) -> FixedIncomeResult<YieldCurve> {
    if instruments.is_empty() {
        return Err(FixedIncomeError::InsufficientData(
            "Bootstrap needs at least one instrument".into(),
        ));
    }

    let mut sorted: Vec<&BootstrapInstrument> = instruments.iter().collect();
    sorted.sort_by(|a, b| a.bond.maturity_date.cmp(&b.bond.maturity_date));

    let mut solved: Vec<YieldCurvePoint> = Vec::with_capacity(sorted.len());

    for inst in sorted {
        let bond = Bond::FixedRate(inst.bond.clone());
        bond.validate(settlement)?;
        validate_price(inst.price)?;

        let flows = generate_cash_flows(&bond, settlement)?;
        let (final_flow, intermediate) = match flows.split_last() {
            Some(split) => split,
            None => {
                return Err(FixedIncomeError::InsufficientData(format!(
                    "Bond maturing {} has no remaining cash flows",
                    inst.bond.maturity_date
                )))
            }
        };

        let own_yield = if solved.is_empty() && !intermediate.is_empty() {
            Some(yield_from_price(&bond, inst.price, settlement, None)?)
        } else {
            None
        };

        let mut pv_intermediate = Decimal::ZERO;
        for flow in intermediate {
            let t = year_fraction(settlement, flow.date, inst.bond.day_count)?;
            let df = match own_yield {
                Some(y) => discount_factor_at_yield(y, inst.bond.frequency, t)?,
                None => {
                    let r = solved_rate_at(&solved, t)?;
                    pow_decimal(Decimal::ONE + r / HUNDRED, -t)?
                }
            };
            pv_intermediate += flow.amount * df;
        }

        let residual = inst.price - pv_intermediate;
        if residual <= Decimal::ZERO {
            return Err(FixedIncomeError::FinancialImpossibility(format!(
                "Non-positive discount factor at {}: price {} below PV of coupons {}",
                final_flow.date, inst.price, pv_intermediate
            )));
        }

        let t_n = year_fraction(settlement, final_flow.date, inst.bond.day_count)?;
        let df_n = residual / final_flow.amount;
        let zero = pow_decimal(Decimal::ONE / df_n, Decimal::ONE / t_n)? - Decimal::ONE;
        solved.push(YieldCurvePoint {
            maturity: t_n,
            rate: zero * HUNDRED,
        });
    }

    YieldCurve::new(solved, CurveMethod::Bootstrap)
}

/// Rate at `t` from the points solved so far: flat off a single point,
/// linear once there are two.
fn solved_rate_at(solved: &[YieldCurvePoint], t: Years) -> FixedIncomeResult<Percent> {
    match solved {
        [] => Err(FixedIncomeError::InsufficientData(
            "No solved zero rates to discount against".into(),
        )),
        [only] => Ok(only.rate),
        _ => interpolate_linear(solved, t),
    }
}

// ---------------------------------------------------------------------------
// Parametric fits
// ---------------------------------------------------------------------------

/// Nelson-Siegel loading factors `(f1, f2)` at maturity `t`:
/// f1 = (1 - e^{-t/l}) / (t/l), f2 = f1 - e^{-t/l}. Limits at t = 0 are (1, 0).
fn ns_loadings(t: Years, lambda: Decimal) -> FixedIncomeResult<(Decimal, Decimal)> {
    if t.is_zero() {
        return Ok((Decimal::ONE, Decimal::ZERO));
    }
    let x = t / lambda;
    let decay = exp_decimal(-x)?;
    let f1 = (Decimal::ONE - decay) / x;
    Ok((f1, f1 - decay))
}

/// y(t) = b0 + b1 f1(t) + b2 f2(t)
pub fn nelson_siegel_rate(
    t: Years,
    beta0: Decimal,
    beta1: Decimal,
    beta2: Decimal,
    lambda: Decimal,
) -> FixedIncomeResult<Percent> {
    validate_lambda("lambda", lambda)?;
    let (f1, f2) = ns_loadings(t, lambda)?;
    Ok(beta0 + beta1 * f1 + beta2 * f2)
}

/// Nelson-Siegel plus `b3` times a second hump loading at `lambda2`.
#[allow(clippy::too_many_arguments)]
pub fn svensson_rate(
    t: Years,
    beta0: Decimal,
    beta1: Decimal,
    beta2: Decimal,
    beta3: Decimal,
    lambda1: Decimal,
    lambda2: Decimal,
) -> FixedIncomeResult<Percent> {
    validate_lambda("lambda2", lambda2)?;
    let (_, g) = ns_loadings(t, lambda2)?;
    Ok(nelson_siegel_rate(t, beta0, beta1, beta2, lambda1)? + beta3 * g)
}

/// Least-squares Nelson-Siegel fit at a fixed decay (default 1.0).
///
/// With the decay held fixed the model is linear in the betas, so the fit
/// solves the 3x3 normal equations directly.
pub fn fit_nelson_siegel(
    points: &[YieldCurvePoint],
    lambda: Option<Decimal>,
) -> FixedIncomeResult<NelsonSiegelFit> {
    let lambda = lambda.unwrap_or(DEFAULT_NS_LAMBDA);
    validate_lambda("lambda", lambda)?;
    if points.len() < 3 {
        return Err(FixedIncomeError::InsufficientData(format!(
            "Nelson-Siegel needs at least 3 points, got {}",
            points.len()
        )));
    }

    let mut xtx = vec![vec![Decimal::ZERO; 3]; 3];
    let mut xty = vec![Decimal::ZERO; 3];
    for p in points {
        let (f1, f2) = ns_loadings(p.maturity, lambda)?;
        let row = [Decimal::ONE, f1, f2];
        for i in 0..3 {
            for j in 0..3 {
                xtx[i][j] += row[i] * row[j];
            }
            xty[i] += row[i] * p.rate;
        }
    }
    let betas = solve_linear_system(xtx, xty)?;
    let (beta0, beta1, beta2) = (betas[0], betas[1], betas[2]);

    let (fitted, rmse) = fitted_points(points, |t| {
        nelson_siegel_rate(t, beta0, beta1, beta2, lambda)
    })?;

    Ok(NelsonSiegelFit {
        beta0,
        beta1,
        beta2,
        lambda,
        fitted,
        rmse,
    })
}

/// Two-stage Svensson fit: Nelson-Siegel at `lambda1`, then a single
/// least-squares factor `beta3` on the residuals at fixed `lambda2`
/// (default 5.0). A simplification of the joint six-parameter fit.
pub fn fit_svensson(
    points: &[YieldCurvePoint],
    lambda1: Option<Decimal>,
    lambda2: Option<Decimal>,
) -> FixedIncomeResult<SvenssonFit> {
    let lambda2 = lambda2.unwrap_or(DEFAULT_SVENSSON_LAMBDA2);
    validate_lambda("lambda2", lambda2)?;
    let ns = fit_nelson_siegel(points, lambda1)?;

    let mut num = Decimal::ZERO;
    let mut den = Decimal::ZERO;
    for (p, fit) in points.iter().zip(&ns.fitted) {
        let (_, g) = ns_loadings(p.maturity, lambda2)?;
        num += g * (p.rate - fit.fitted);
        den += g * g;
    }
    let beta3 = if den.is_zero() { Decimal::ZERO } else { num / den };

    let (fitted, rmse) = fitted_points(points, |t| {
        svensson_rate(t, ns.beta0, ns.beta1, ns.beta2, beta3, ns.lambda, lambda2)
    })?;

    Ok(SvenssonFit {
        beta0: ns.beta0,
        beta1: ns.beta1,
        beta2: ns.beta2,
        beta3,
        lambda1: ns.lambda,
        lambda2,
        fitted,
        rmse,
    })
}

impl NelsonSiegelFit {
    pub fn rate_at(&self, t: Years) -> FixedIncomeResult<Percent> {
        nelson_siegel_rate(t, self.beta0, self.beta1, self.beta2, self.lambda)
    }

    /// Sample the fitted curve at `tenors`.
    pub fn to_curve(&self, tenors: &[Years]) -> FixedIncomeResult<YieldCurve> {
        let points = tenors
            .iter()
            .map(|&t| {
                Ok(YieldCurvePoint {
                    maturity: t,
                    rate: self.rate_at(t)?,
                })
            })
            .collect::<FixedIncomeResult<Vec<_>>>()?;
        YieldCurve::new(points, CurveMethod::NelsonSiegel)
    }
}

impl SvenssonFit {
    pub fn rate_at(&self, t: Years) -> FixedIncomeResult<Percent> {
        svensson_rate(
            t,
            self.beta0,
            self.beta1,
            self.beta2,
            self.beta3,
            self.lambda1,
            self.lambda2,
        )
    }

    pub fn to_curve(&self, tenors: &[Years]) -> FixedIncomeResult<YieldCurve> {
        let points = tenors
            .iter()
            .map(|&t| {
                Ok(YieldCurvePoint {
                    maturity: t,
                    rate: self.rate_at(t)?,
                })
            })
            .collect::<FixedIncomeResult<Vec<_>>>()?;
        YieldCurve::new(points, CurveMethod::Svensson)
    }
}

fn fitted_points<F>(
    points: &[YieldCurvePoint],
    model: F,
) -> FixedIncomeResult<(Vec<FittedPoint>, Decimal)>
where
    F: Fn(Years) -> FixedIncomeResult<Percent>,
{
    let mut fitted = Vec::with_capacity(points.len());
    let mut sum_sq = Decimal::ZERO;
    for p in points {
        let value = model(p.maturity)?;
        let error = value - p.rate;
        sum_sq += error * error;
        fitted.push(FittedPoint {
            maturity: p.maturity,
            observed: p.rate,
            fitted: value,
            error,
        });
    }
    let mse = sum_sq / Decimal::from(points.len() as u64);
    let rmse = mse.sqrt().ok_or_else(|| {
        FixedIncomeError::FinancialImpossibility("RMSE of a negative mean square".into())
    })?;
    Ok((fitted, rmse))
}

fn validate_lambda(field: &str, lambda: Decimal) -> FixedIncomeResult<()> {
    if lambda <= Decimal::ZERO {
        return Err(FixedIncomeError::invalid_input(
            field,
            "Decay parameter must be positive",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day_count::DayCountConvention;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal, label: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tolerance,
            "{label}: expected ~{expected}, got {actual} (diff {diff})"
        );
    }

    fn pt(maturity: Decimal, rate: Decimal) -> YieldCurvePoint {
        YieldCurvePoint { maturity, rate }
    }

    fn sample_curve(method: CurveMethod) -> YieldCurve {
        YieldCurve::new(
            vec![
                pt(dec!(1), dec!(3)),
                pt(dec!(2), dec!(3.5)),
                pt(dec!(5), dec!(4)),
                pt(dec!(10), dec!(4.5)),
            ],
            method,
        )
        .unwrap()
    }

    #[test]
    fn test_curve_sorts_and_dedups_first_wins() {
        let curve = YieldCurve::new(
            vec![
                pt(dec!(5), dec!(4)),
                pt(dec!(1), dec!(3)),
                pt(dec!(5), dec!(9)),
            ],
            CurveMethod::Linear,
        )
        .unwrap();
        assert_eq!(curve.points(), &[pt(dec!(1), dec!(3)), pt(dec!(5), dec!(4))]);
    }

    #[test]
    fn test_curve_needs_two_points() {
        let err = YieldCurve::new(
            vec![pt(dec!(1), dec!(3)), pt(dec!(1), dec!(4))],
            CurveMethod::Linear,
        )
        .unwrap_err();
        assert!(matches!(err, FixedIncomeError::InsufficientData(_)));
    }

    #[test]
    fn test_curve_deserialization_is_validated() {
        let bad = serde_json::json!({ "points": [{ "maturity": "1", "rate": "3" }] });
        assert!(serde_json::from_value::<YieldCurve>(bad).is_err());

        let good = serde_json::json!({
            "points": [{ "maturity": "2", "rate": "4" }, { "maturity": "1", "rate": "3" }]
        });
        let curve: YieldCurve = serde_json::from_value(good).unwrap();
        assert_eq!(curve.method(), CurveMethod::Linear);
        assert_eq!(curve.points()[0].maturity, dec!(1));
    }

    #[test]
    fn test_linear_interpolation_and_flat_extrapolation() {
        let curve = sample_curve(CurveMethod::Linear);
        assert_eq!(curve.rate_at(dec!(1.5)).unwrap(), dec!(3.25));
        assert_eq!(curve.rate_at(dec!(0.25)).unwrap(), dec!(3));
        assert_eq!(curve.rate_at(dec!(30)).unwrap(), dec!(4.5));
        assert_eq!(curve.rate_at(dec!(5)).unwrap(), dec!(4));
    }

    #[test]
    fn test_cubic_hits_nodes_and_extrapolates_flat() {
        let curve = sample_curve(CurveMethod::Spline);
        for p in curve.points() {
            assert_close(curve.rate_at(p.maturity).unwrap(), p.rate, dec!(0.0000001), "node");
        }
        assert_eq!(curve.rate_at(dec!(0)).unwrap(), dec!(3));
        assert_eq!(curve.rate_at(dec!(40)).unwrap(), dec!(4.5));
    }

    #[test]
    fn test_cubic_reproduces_straight_line() {
        let points = vec![pt(dec!(1), dec!(2)), pt(dec!(2), dec!(3)), pt(dec!(4), dec!(5))];
        assert_close(
            interpolate_cubic(&points, dec!(3)).unwrap(),
            dec!(4),
            dec!(0.0000001),
            "linear data",
        );
    }

    #[test]
    fn test_interpolation_needs_two_points() {
        let err = interpolate_linear(&[pt(dec!(1), dec!(3))], dec!(1)).unwrap_err();
        assert!(matches!(err, FixedIncomeError::InsufficientData(_)));
        assert!(interpolate_cubic(&[], dec!(1)).is_err());
    }

    #[test]
    fn test_shift_and_bump_return_new_curves() {
        let curve = sample_curve(CurveMethod::Linear);
        let up = curve.shifted(dec!(25));
        assert_eq!(up.points()[2].rate, dec!(4.25));
        assert_eq!(curve.points()[2].rate, dec!(4));

        let bumped = curve.bumped_at(1, dec!(-10)).unwrap();
        assert_eq!(bumped.points()[1].rate, dec!(3.4));
        assert_eq!(bumped.points()[0].rate, dec!(3));
        assert!(curve.bumped_at(9, dec!(1)).is_err());
    }

    #[test]
    fn test_forward_rate_from_spot() {
        // (1.04)^2 / 1.03 - 1
        let f = forward_rate_from_spot(dec!(3), dec!(1), dec!(4), dec!(2)).unwrap();
        assert_close(f, dec!(5.009708737864), dec!(0.0000001), "1y1y forward");

        match forward_rate_from_spot(dec!(3), dec!(2), dec!(4), dec!(2)).unwrap_err() {
            FixedIncomeError::InvalidInstrument { field, .. } => assert_eq!(field, "tenor"),
            other => panic!("Expected InvalidInstrument, got {other:?}"),
        }
    }

    #[test]
    fn test_forward_curve_and_discount_factor() {
        let curve = sample_curve(CurveMethod::Linear);
        let fwd = forward_curve(&curve).unwrap();
        assert_eq!(fwd.len(), 4);
        assert_eq!(fwd[0].rate, dec!(3));
        assert!(fwd[1].rate > dec!(3.5));

        assert_eq!(discount_factor(&curve, Decimal::ZERO).unwrap(), Decimal::ONE);
        assert_close(
            discount_factor(&curve, dec!(2)).unwrap(),
            Decimal::ONE / (dec!(1.035) * dec!(1.035)),
            dec!(0.0000000001),
            "df(2)",
        );
    }

    fn par_bond(years: i32, coupon: Decimal) -> BootstrapInstrument {
        BootstrapInstrument {
            bond: FixedRateBond::new(
                dec!(100),
                coupon,
                d(2025 + years, 1, 15),
                1,
                DayCountConvention::Thirty360,
            ),
            price: dec!(100),
        }
    }

    #[test]
    fn test_bootstrap_flat_par_curve() {
        let instruments = vec![par_bond(3, dec!(5)), par_bond(1, dec!(5)), par_bond(2, dec!(5))];
        let curve = bootstrap_curve(&instruments, d(2025, 1, 15)).unwrap();
        assert_eq!(curve.method(), CurveMethod::Bootstrap);
        assert_eq!(curve.points().len(), 3);
        for (p, t) in curve.points().iter().zip([dec!(1), dec!(2), dec!(3)]) {
            assert_eq!(p.maturity, t);
            assert_close(p.rate, dec!(5), dec!(0.000001), "zero rate");
        }
    }

    #[test]
    fn test_bootstrap_upward_sloping() {
        let instruments = vec![par_bond(1, dec!(3)), par_bond(2, dec!(4)), par_bond(3, dec!(5))];
        let curve = bootstrap_curve(&instruments, d(2025, 1, 15)).unwrap();
        let r = curve.points();
        assert_close(r[0].rate, dec!(3), dec!(0.000001), "1y");
        // Zero rates exceed par yields on an upward sloping curve
        assert!(r[1].rate > dec!(4));
        assert!(r[2].rate > dec!(5));
    }

    #[test]
    fn test_bootstrap_errors() {
        assert!(matches!(
            bootstrap_curve(&[], d(2025, 1, 15)).unwrap_err(),
            FixedIncomeError::InsufficientData(_)
        ));

        // Coupons alone worth more than the quoted price
        let mut cheap = par_bond(2, dec!(50));
        cheap.price = dec!(40);
        let err = bootstrap_curve(&[par_bond(1, dec!(5)), cheap], d(2025, 1, 15)).unwrap_err();
        assert!(matches!(err, FixedIncomeError::FinancialImpossibility(_)));
    }

    #[test]
    fn test_nelson_siegel_recovers_parameters() {
        let tenors = [
            dec!(0.5),
            dec!(1),
            dec!(2),
            dec!(3),
            dec!(5),
            dec!(7),
            dec!(10),
            dec!(20),
            dec!(30),
        ];
        let points: Vec<_> = tenors
            .iter()
            .map(|&t| pt(t, nelson_siegel_rate(t, dec!(5), dec!(-2), dec!(1.5), dec!(1.0)).unwrap()))
            .collect();
        let fit = fit_nelson_siegel(&points, None).unwrap();
        assert_close(fit.beta0, dec!(5), dec!(0.000001), "beta0");
        assert_close(fit.beta1, dec!(-2), dec!(0.000001), "beta1");
        assert_close(fit.beta2, dec!(1.5), dec!(0.000001), "beta2");
        assert!(fit.rmse < dec!(0.000001));

        let curve = fit.to_curve(&tenors).unwrap();
        assert_eq!(curve.method(), CurveMethod::NelsonSiegel);
    }

    #[test]
    fn test_nelson_siegel_input_checks() {
        let two = vec![pt(dec!(1), dec!(3)), pt(dec!(2), dec!(4))];
        assert!(matches!(
            fit_nelson_siegel(&two, None).unwrap_err(),
            FixedIncomeError::InsufficientData(_)
        ));
        let three = vec![pt(dec!(1), dec!(3)), pt(dec!(2), dec!(4)), pt(dec!(3), dec!(4.5))];
        assert!(fit_nelson_siegel(&three, Some(Decimal::ZERO)).is_err());
    }

    #[test]
    fn test_svensson_never_worse_than_nelson_siegel() {
        let points = vec![
            pt(dec!(0.25), dec!(4.8)),
            pt(dec!(1), dec!(4.2)),
            pt(dec!(2), dec!(3.9)),
            pt(dec!(5), dec!(4.1)),
            pt(dec!(10), dec!(4.6)),
            pt(dec!(20), dec!(4.9)),
            pt(dec!(30), dec!(4.7)),
        ];
        let ns = fit_nelson_siegel(&points, None).unwrap();
        let sv = fit_svensson(&points, None, None).unwrap();
        assert_eq!(sv.lambda2, dec!(5.0));
        assert!(sv.rmse <= ns.rmse);
        assert_eq!(sv.to_curve(&[dec!(1), dec!(10)]).unwrap().method(), CurveMethod::Svensson);
    }
}
