//! Decimal numerics shared by the pricing, curve and credit modules.
//!
//! Everything stays in `Decimal`: transcendental functions use range
//! reduction plus a series expansion, integer powers use repeated squaring.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::error::FixedIncomeError;
use crate::FixedIncomeResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const LN_2: Decimal = dec!(0.6931471805599453094172321215);

/// Below this exp() underflows the 28-digit decimal scale.
const EXP_LOWER_BOUND: Decimal = dec!(-60);

/// Above this exp() overflows Decimal::MAX (~7.9e28).
const EXP_UPPER_BOUND: Decimal = dec!(60);

const EXP_TAYLOR_TERMS: u32 = 30;
const LN_SERIES_TERMS: u32 = 40;
const SERIES_EPSILON: Decimal = dec!(0.0000000000000000000000000001);

/// Pivot magnitude below which a linear system is treated as singular.
const SINGULAR_PIVOT: Decimal = dec!(0.00000000000000000001);

/// Solver slope magnitude below which Newton steps are refused.
const MIN_SLOPE: Decimal = dec!(0.0000000001);

// ---------------------------------------------------------------------------
// Transcendental functions
// ---------------------------------------------------------------------------

/// exp(x) via halving until |x| <= 0.5, a Taylor series, then squaring back.
pub fn exp_decimal(x: Decimal) -> FixedIncomeResult<Decimal> {
    if x.is_zero() {
        return Ok(Decimal::ONE);
    }
    if x < EXP_LOWER_BOUND {
        return Ok(Decimal::ZERO);
    }
    if x > EXP_UPPER_BOUND {
        return Err(FixedIncomeError::FinancialImpossibility(format!(
            "exp({x}) exceeds the decimal range"
        )));
    }

    let mut reduced = x;
    let mut halvings = 0u32;
    while reduced.abs() > dec!(0.5) {
        reduced /= dec!(2);
        halvings += 1;
    }

    let mut sum = Decimal::ONE;
    let mut term = Decimal::ONE;
    for k in 1..=EXP_TAYLOR_TERMS {
        term = term * reduced / Decimal::from(k);
        sum += term;
        if term.abs() < SERIES_EPSILON {
            break;
        }
    }

    for _ in 0..halvings {
        sum = sum.checked_mul(sum).ok_or_else(|| {
            FixedIncomeError::FinancialImpossibility(format!("exp({x}) overflowed"))
        })?;
    }

    Ok(sum)
}

/// Natural logarithm. Range-reduces into [0.5, 2] by powers of two, then
/// sums the atanh series ln(v) = 2 * sum u^(2k+1)/(2k+1), u = (v-1)/(v+1).
pub fn ln_decimal(x: Decimal) -> FixedIncomeResult<Decimal> {
    if x <= Decimal::ZERO {
        return Err(FixedIncomeError::FinancialImpossibility(format!(
            "ln({x}) is undefined"
        )));
    }
    if x == Decimal::ONE {
        return Ok(Decimal::ZERO);
    }

    let mut val = x;
    let mut k: i64 = 0;
    while val > dec!(2) {
        val /= dec!(2);
        k += 1;
    }
    while val < dec!(0.5) {
        val *= dec!(2);
        k -= 1;
    }

    let u = (val - Decimal::ONE) / (val + Decimal::ONE);
    let u_sq = u * u;
    let mut term = u;
    let mut sum = u;
    for n in 1..LN_SERIES_TERMS {
        term *= u_sq;
        let contribution = term / Decimal::from(2 * n + 1);
        sum += contribution;
        if contribution.abs() < SERIES_EPSILON {
            break;
        }
    }

    Ok(dec!(2) * sum + Decimal::from(k) * LN_2)
}

/// base^exponent for a positive base and any real exponent.
///
/// The integral part of the exponent is applied by repeated squaring so that
/// whole-period discount factors are exact; only the fractional remainder
/// goes through exp/ln.
pub fn pow_decimal(base: Decimal, exponent: Decimal) -> FixedIncomeResult<Decimal> {
    if exponent.is_zero() {
        return Ok(Decimal::ONE);
    }
    if base <= Decimal::ZERO {
        return Err(FixedIncomeError::FinancialImpossibility(format!(
            "cannot raise non-positive base {base} to power {exponent}"
        )));
    }
    if base == Decimal::ONE {
        return Ok(Decimal::ONE);
    }
    if exponent < Decimal::ZERO {
        let positive = pow_decimal(base, -exponent)?;
        if positive.is_zero() {
            return Err(FixedIncomeError::DivisionByZero {
                context: format!("{base}^{exponent}"),
            });
        }
        return Ok(Decimal::ONE / positive);
    }

    let whole = exponent.trunc();
    let frac = exponent - whole;

    let mut result = powi_decimal(base, decimal_to_u64(whole)?)?;
    if !frac.is_zero() {
        result *= exp_decimal(frac * ln_decimal(base)?)?;
    }
    Ok(result)
}

/// base^n by repeated squaring, with overflow reported rather than panicking.
pub fn powi_decimal(base: Decimal, n: u64) -> FixedIncomeResult<Decimal> {
    let overflow =
        || FixedIncomeError::FinancialImpossibility(format!("{base}^{n} overflowed"));

    let mut result = Decimal::ONE;
    let mut square = base;
    let mut e = n;
    while e > 0 {
        if e & 1 == 1 {
            result = result.checked_mul(square).ok_or_else(overflow)?;
        }
        e >>= 1;
        if e > 0 {
            square = square.checked_mul(square).ok_or_else(overflow)?;
        }
    }
    Ok(result)
}

fn decimal_to_u64(d: Decimal) -> FixedIncomeResult<u64> {
    use rust_decimal::prelude::ToPrimitive;
    d.trunc().to_u64().ok_or_else(|| {
        FixedIncomeError::FinancialImpossibility(format!("exponent {d} out of range"))
    })
}

// ---------------------------------------------------------------------------
// Linear algebra
// ---------------------------------------------------------------------------

/// Solve `a * x = b` by Gaussian elimination with partial pivoting.
pub fn solve_linear_system(
    mut a: Vec<Vec<Decimal>>,
    mut b: Vec<Decimal>,
) -> FixedIncomeResult<Vec<Decimal>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(FixedIncomeError::invalid_input(
            "linear_system",
            "coefficient matrix must be square and match the right-hand side",
        ));
    }

    for col in 0..n {
        // Partial pivot: largest magnitude in this column at or below the diagonal
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() < SINGULAR_PIVOT {
            return Err(FixedIncomeError::FinancialImpossibility(
                "singular normal equations: regressors are linearly dependent".into(),
            ));
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor.is_zero() {
                continue;
            }
            for k in col..n {
                let delta = factor * a[col][k];
                a[row][k] -= delta;
            }
            let delta = factor * b[col];
            b[row] -= delta;
        }
    }

    let mut x = vec![Decimal::ZERO; n];
    for row in (0..n).rev() {
        let tail: Decimal = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

// ---------------------------------------------------------------------------
// Root finding
// ---------------------------------------------------------------------------

/// Bounds and tolerances for a Newton-Raphson search.
#[derive(Debug, Clone)]
pub(crate) struct NewtonSettings {
    pub function: &'static str,
    /// Converged when |residual| falls below this.
    pub tolerance: Decimal,
    pub max_iterations: u32,
    /// Step used for the forward finite-difference slope.
    pub bump: Decimal,
    pub lower: Decimal,
    pub upper: Decimal,
}

/// Newton-Raphson on `residual(x) = 0` with a numerically estimated slope.
///
/// Fails with `Convergence` when the iteration budget runs out, the slope
/// degenerates, or an estimate leaves `[lower, upper]`.
pub(crate) fn newton_solve<F>(
    settings: &NewtonSettings,
    initial: Decimal,
    mut residual: F,
) -> FixedIncomeResult<Decimal>
where
    F: FnMut(Decimal) -> FixedIncomeResult<Decimal>,
{
    let mut x = initial;
    let mut last_delta = Decimal::ZERO;

    for iteration in 0..settings.max_iterations {
        let f = residual(x)?;
        last_delta = f;
        if f.abs() < settings.tolerance {
            return Ok(x);
        }

        let slope = (residual(x + settings.bump)? - f) / settings.bump;
        if slope.abs() < MIN_SLOPE {
            return Err(FixedIncomeError::Convergence {
                function: settings.function.into(),
                iterations: iteration + 1,
                last_delta: f,
            });
        }

        x -= f / slope;

        if x < settings.lower || x > settings.upper {
            return Err(FixedIncomeError::Convergence {
                function: settings.function.into(),
                iterations: iteration + 1,
                last_delta: f,
            });
        }
    }

    Err(FixedIncomeError::Convergence {
        function: settings.function.into(),
        iterations: settings.max_iterations,
        last_delta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal, label: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tolerance,
            "{label}: expected ~{expected}, got {actual} (diff {diff})"
        );
    }

    #[test]
    fn test_exp_known_values() {
        assert_close(
            exp_decimal(Decimal::ONE).unwrap(),
            dec!(2.718281828459045235360287),
            dec!(0.000000000000000001),
            "e",
        );
        assert_close(
            exp_decimal(dec!(-2)).unwrap(),
            dec!(0.135335283236612691893999),
            dec!(0.000000000000000001),
            "exp(-2)",
        );
        assert_eq!(exp_decimal(dec!(-100)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_exp_overflow_is_an_error() {
        assert!(matches!(
            exp_decimal(dec!(70)),
            Err(FixedIncomeError::FinancialImpossibility(_))
        ));
    }

    #[test]
    fn test_ln_inverts_exp() {
        for x in [dec!(0.01), dec!(0.5), dec!(1.05), dec!(7.3), dec!(1234.5)] {
            let back = exp_decimal(ln_decimal(x).unwrap()).unwrap();
            assert_close(back, x, x * dec!(0.000000000001), "exp(ln(x))");
        }
        assert!(ln_decimal(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_pow_integer_exponent_is_exact() {
        let mut expected = Decimal::ONE;
        for _ in 0..10 {
            expected *= dec!(1.03);
        }
        assert_eq!(pow_decimal(dec!(1.03), dec!(10)).unwrap(), expected);
    }

    #[test]
    fn test_pow_fractional_and_negative() {
        assert_close(
            pow_decimal(dec!(4), dec!(0.5)).unwrap(),
            dec!(2),
            dec!(0.0000000001),
            "sqrt via pow",
        );
        assert_close(
            pow_decimal(dec!(1.05), dec!(-2.5)).unwrap(),
            dec!(0.885170),
            dec!(0.000001),
            "1.05^-2.5",
        );
        assert!(pow_decimal(dec!(-1), dec!(0.5)).is_err());
    }

    #[test]
    fn test_solve_linear_system_needs_pivoting() {
        // First pivot is zero; partial pivoting must swap rows.
        let a = vec![
            vec![dec!(0), dec!(2), dec!(1)],
            vec![dec!(1), dec!(1), dec!(1)],
            vec![dec!(2), dec!(1), dec!(3)],
        ];
        let b = vec![dec!(5), dec!(6), dec!(13)];
        let x = solve_linear_system(a, b).unwrap();
        assert_close(x[0], dec!(1), dec!(0.0000000001), "x0");
        assert_close(x[1], dec!(2), dec!(0.0000000001), "x1");
        assert_close(x[2], dec!(3), dec!(0.0000000001), "x2");
    }

    #[test]
    fn test_singular_system_rejected() {
        let a = vec![vec![dec!(1), dec!(2)], vec![dec!(2), dec!(4)]];
        let err = solve_linear_system(a, vec![dec!(1), dec!(2)]).unwrap_err();
        assert!(matches!(err, FixedIncomeError::FinancialImpossibility(_)));
    }

    #[test]
    fn test_newton_finds_square_root() {
        let settings = NewtonSettings {
            function: "sqrt",
            tolerance: dec!(0.000000001),
            max_iterations: 100,
            bump: dec!(0.0001),
            lower: dec!(0),
            upper: dec!(10),
        };
        let root = newton_solve(&settings, dec!(1), |x| Ok(x * x - dec!(2))).unwrap();
        assert_close(root, dec!(1.41421356), dec!(0.00001), "sqrt(2)");
    }

    #[test]
    fn test_newton_reports_degenerate_slope() {
        let settings = NewtonSettings {
            function: "flat",
            tolerance: dec!(0.000000001),
            max_iterations: 100,
            bump: dec!(0.0001),
            lower: dec!(-10),
            upper: dec!(10),
        };
        match newton_solve(&settings, dec!(1), |_| Ok(Decimal::ONE)).unwrap_err() {
            FixedIncomeError::Convergence { iterations, .. } => assert_eq!(iterations, 1),
            other => panic!("Expected Convergence, got {other:?}"),
        }
    }
}
