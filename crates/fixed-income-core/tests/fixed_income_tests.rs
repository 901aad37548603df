use chrono::NaiveDate;
use fixed_income_core::fixed_income::bonds::{self, BondPricingInput};
use fixed_income_core::fixed_income::curves::{
    self, BootstrapInstrument, CurveMethod, YieldCurve, YieldCurvePoint,
};
use fixed_income_core::fixed_income::duration::{self, DurationInput};
use fixed_income_core::fixed_income::spreads::price_with_spread;
use fixed_income_core::fixed_income::yields::{self, WorkoutKind, YieldAnalysisInput};
use fixed_income_core::fixed_income::{Bond, CallableBond, ExerciseDate, FixedRateBond};
use fixed_income_core::{DayCountConvention, FixedIncomeError};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

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

/// 5-year 5% semi-annual bullet, settling on a coupon date.
fn five_year_bond() -> Bond {
    Bond::FixedRate(FixedRateBond::new(
        dec!(1000),
        dec!(5),
        d(2030, 1, 15),
        2,
        DayCountConvention::Thirty360,
    ))
}

fn settle() -> NaiveDate {
    d(2025, 1, 15)
}

// ===========================================================================
// Reference scenario: 5y 5% semi-annual bond at 4.5%
// ===========================================================================

#[test]
fn test_reference_bond_prices_above_par() {
    let out = bonds::price_bond(&BondPricingInput {
        bond: five_year_bond(),
        ytm: dec!(4.5),
        settlement_date: settle(),
    })
    .unwrap();
    let r = &out.result;

    assert!(r.clean_price > dec!(1000));
    assert_close(r.clean_price, dec!(1022.16554), dec!(0.0001), "clean price");
    assert_eq!(r.accrued_interest, Decimal::ZERO);
    assert_eq!(r.dirty_price, r.clean_price);
    assert_eq!(r.num_remaining_coupons, 10);
    assert_eq!(r.cashflows.len(), 10);
    assert_eq!(out.metadata.precision, "rust_decimal_128bit");
}

#[test]
fn test_reference_bond_round_trips_yield() {
    let bond = five_year_bond();
    let price = bonds::price_from_yield(&bond, dec!(4.5), settle()).unwrap();
    let ytm = yields::yield_to_maturity(&bond, price, settle()).unwrap();
    assert_close(ytm, dec!(4.5), dec!(0.000001), "round trip");
}

#[test]
fn test_reference_bond_modified_below_macaulay() {
    let out = duration::calculate_duration(&DurationInput {
        bond: five_year_bond(),
        ytm: dec!(4.5),
        settlement_date: settle(),
        shock_bps: None,
        curve: None,
    })
    .unwrap();
    let r = &out.result;
    assert!(r.modified_duration < r.macaulay_duration);
    assert!(r.macaulay_duration < dec!(5));
    assert!(r.convexity > Decimal::ZERO);
    assert_close(r.price, dec!(1022.16554), dec!(0.0001), "duration base price");
}

// ===========================================================================
// Pricing and yields across instruments
// ===========================================================================

#[test]
fn test_accrued_interest_mid_period() {
    let bond = five_year_bond();
    // Three 30/360 months into a six-month period: half a coupon
    let ai = bonds::accrued_interest(&bond, d(2025, 4, 15)).unwrap();
    assert_eq!(ai, dec!(12.5));

    let dirty = bonds::dirty_price(&bond, dec!(4.5), d(2025, 4, 15)).unwrap();
    let clean = bonds::price_from_yield(&bond, dec!(4.5), d(2025, 4, 15)).unwrap();
    assert_close(dirty - clean, ai, dec!(0.0000001), "dirty - clean");
}

#[test]
fn test_yield_analysis_discount_bond() {
    let out = yields::analyze_yields(&YieldAnalysisInput {
        bond: five_year_bond(),
        price: dec!(950),
        settlement_date: settle(),
        initial_guess: None,
    })
    .unwrap();
    let r = &out.result;
    assert!(r.yield_to_maturity > dec!(5));
    assert!(r.current_yield > dec!(5));
    assert!(r.effective_annual_yield > r.yield_to_maturity);
}

#[test]
fn test_callable_premium_bond_worst_is_call() {
    let callable = Bond::Callable(CallableBond {
        bond: FixedRateBond::new(
            dec!(1000),
            dec!(8),
            d(2035, 1, 15),
            2,
            DayCountConvention::Thirty360,
        ),
        call_schedule: vec![ExerciseDate {
            date: d(2027, 1, 15),
            price: dec!(1010),
        }],
    });
    let ytw = yields::yield_to_worst(&callable, dec!(1100), settle()).unwrap();
    assert_eq!(ytw.workout, WorkoutKind::Call);
    assert_eq!(ytw.workout_date, d(2027, 1, 15));

    let ytm = yields::yield_to_maturity(&callable, dec!(1100), settle()).unwrap();
    assert!(ytw.yield_pct < ytm);
}

#[test]
fn test_matured_bond_rejected() {
    let err = bonds::price_from_yield(&five_year_bond(), dec!(4.5), d(2030, 1, 15)).unwrap_err();
    assert!(matches!(err, FixedIncomeError::InvalidInstrument { .. }));
}

// ===========================================================================
// Curves
// ===========================================================================

fn zero_curve() -> YieldCurve {
    YieldCurve::new(
        vec![
            YieldCurvePoint {
                maturity: dec!(1),
                rate: dec!(3.0),
            },
            YieldCurvePoint {
                maturity: dec!(2),
                rate: dec!(3.5),
            },
            YieldCurvePoint {
                maturity: dec!(3),
                rate: dec!(3.8),
            },
        ],
        CurveMethod::Linear,
    )
    .unwrap()
}

#[test]
fn test_bootstrap_recovers_zero_curve() {
    let curve = zero_curve();
    let instruments: Vec<BootstrapInstrument> = [1, 2, 3]
        .iter()
        .map(|&years| {
            let bond = FixedRateBond::new(
                dec!(100),
                dec!(4),
                d(2025 + years, 1, 15),
                1,
                DayCountConvention::Thirty360,
            );
            let price =
                price_with_spread(&Bond::FixedRate(bond.clone()), &curve, Decimal::ZERO, settle())
                    .unwrap();
            BootstrapInstrument { bond, price }
        })
        .collect();

    let bootstrapped = curves::bootstrap_curve(&instruments, settle()).unwrap();
    assert_eq!(bootstrapped.method(), CurveMethod::Bootstrap);
    for (got, want) in bootstrapped.points().iter().zip(curve.points()) {
        assert_close(got.maturity, want.maturity, dec!(0.0000001), "tenor");
        assert_close(got.rate, want.rate, dec!(0.00001), "zero rate");
    }
}

#[test]
fn test_forward_curve_consistent_with_spots() {
    let forwards = curves::forward_curve(&zero_curve()).unwrap();
    assert_eq!(forwards.len(), 3);
    assert_eq!(forwards[0].rate, dec!(3.0));
    // Upward sloping spots imply forwards above the longer spot
    assert!(forwards[1].rate > dec!(3.5));
    assert!(forwards[2].rate > dec!(3.8));
}

#[test]
fn test_nelson_siegel_fit_tracks_curve() {
    let points: Vec<YieldCurvePoint> = [
        (dec!(0.5), dec!(4.0)),
        (dec!(1), dec!(4.1)),
        (dec!(2), dec!(4.3)),
        (dec!(5), dec!(4.6)),
        (dec!(10), dec!(4.8)),
        (dec!(30), dec!(4.9)),
    ]
    .iter()
    .map(|&(maturity, rate)| YieldCurvePoint { maturity, rate })
    .collect();

    let fit = curves::fit_nelson_siegel(&points, None).unwrap();
    assert!(fit.rmse < dec!(0.1));
    assert_eq!(fit.fitted.len(), 6);

    let sv = curves::fit_svensson(&points, None, None).unwrap();
    assert!(sv.rmse <= fit.rmse + dec!(0.0000001));
}

#[test]
fn test_key_rate_durations_from_curve() {
    let out = duration::calculate_duration(&DurationInput {
        bond: Bond::FixedRate(FixedRateBond::new(
            dec!(100),
            dec!(4),
            d(2028, 1, 15),
            1,
            DayCountConvention::Thirty360,
        )),
        ytm: dec!(3.8),
        settlement_date: settle(),
        shock_bps: Some(dec!(1)),
        curve: Some(zero_curve()),
    })
    .unwrap();
    let krds = out.result.key_rate_durations.unwrap();
    assert_eq!(krds.len(), 3);
    // A 3-year bullet is dominated by its final flow
    assert!(krds[2].duration > krds[0].duration);
    assert!(krds[2].duration > krds[1].duration);
}
