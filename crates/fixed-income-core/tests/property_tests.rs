use chrono::{Duration, Months, NaiveDate};
use fixed_income_core::fixed_income::bonds::{accrued_interest, price_from_yield};
use fixed_income_core::fixed_income::curves::{CurveMethod, YieldCurve, YieldCurvePoint};
use fixed_income_core::fixed_income::duration::{convexity, macaulay_duration};
use fixed_income_core::fixed_income::spreads::default_probability_from_spread;
use fixed_income_core::fixed_income::yields::yield_to_maturity;
use fixed_income_core::fixed_income::{Bond, FixedRateBond};
use fixed_income_core::DayCountConvention;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bond(coupon: Decimal, years: i32, frequency: u8) -> Bond {
    Bond::FixedRate(FixedRateBond::new(
        dec!(100),
        coupon,
        d(2025 + years, 1, 15),
        frequency,
        DayCountConvention::Thirty360,
    ))
}

fn frequency() -> impl Strategy<Value = u8> {
    prop::sample::select(vec![1u8, 2, 4, 12])
}

/// Hundredths of a percent in `[lo, hi]`.
fn pct(lo: i64, hi: i64) -> impl Strategy<Value = Decimal> {
    (lo..=hi).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn yield_round_trips_through_price(
        years in 1i32..=30,
        freq in frequency(),
        coupon in pct(0, 1200),
        ytm in pct(-500, 2500),
        offset_days in 0i64..=150,
    ) {
        let settle = d(2025, 1, 15) + Duration::days(offset_days);
        let b = bond(coupon, years, freq);
        let price = price_from_yield(&b, ytm, settle).unwrap();
        let solved = yield_to_maturity(&b, price, settle).unwrap();
        prop_assert!((solved - ytm).abs() < dec!(0.000001), "{ytm} -> {price} -> {solved}");
    }

    #[test]
    fn price_falls_as_yield_rises(
        years in 1i32..=30,
        freq in frequency(),
        coupon in pct(0, 1200),
        low in pct(-500, 2000),
        step in pct(1, 500),
    ) {
        let b = bond(coupon, years, freq);
        let settle = d(2025, 1, 15);
        let p_low = price_from_yield(&b, low, settle).unwrap();
        let p_high = price_from_yield(&b, low + step, settle).unwrap();
        prop_assert!(p_low > p_high);
    }

    #[test]
    fn longer_maturity_has_longer_duration(
        years in 1i32..=10,
        extra in 1i32..=5,
        freq in frequency(),
        coupon in pct(100, 1200),
        ytm in pct(0, 1500),
    ) {
        let settle = d(2025, 1, 15);
        let short = macaulay_duration(&bond(coupon, years, freq), ytm, settle).unwrap();
        let long = macaulay_duration(&bond(coupon, years + extra, freq), ytm, settle).unwrap();
        prop_assert!(long > short, "{years}y: {short} vs {}y: {long}", years + extra);
    }

    #[test]
    fn convexity_is_positive_for_option_free_bonds(
        years in 1i32..=30,
        freq in frequency(),
        coupon in pct(0, 1200),
        ytm in pct(-500, 2500),
    ) {
        let c = convexity(&bond(coupon, years, freq), ytm, d(2025, 1, 15)).unwrap();
        prop_assert!(c > Decimal::ZERO);
    }

    #[test]
    fn accrued_interest_resets_on_coupon_dates(
        years in 2i32..=30,
        freq in frequency(),
        coupon in pct(1, 1200),
        periods_elapsed in 0u32..24,
    ) {
        let b = bond(coupon, years, freq);
        let months_per_period = 12 / u32::from(freq);
        // Stay at least one full period before maturity
        let elapsed = periods_elapsed % (years as u32 * u32::from(freq) - 1);
        let coupon_date = d(2025, 1, 15)
            .checked_add_months(Months::new(elapsed * months_per_period))
            .unwrap();
        prop_assert_eq!(accrued_interest(&b, coupon_date).unwrap(), Decimal::ZERO);

        // The day before the next coupon almost a full coupon has accrued
        let next = coupon_date
            .checked_add_months(Months::new(months_per_period))
            .unwrap();
        let eve = accrued_interest(&b, next - Duration::days(1)).unwrap();
        prop_assert!(eve > Decimal::ZERO);
        prop_assert!(eve < b.coupon_per_period());
    }

    #[test]
    fn curve_extrapolates_flat(
        short_rate in pct(-100, 1000),
        long_rate in pct(-100, 1000),
        inside in pct(0, 100),
        beyond in pct(0, 5000),
        spline in any::<bool>(),
    ) {
        let method = if spline { CurveMethod::Spline } else { CurveMethod::Linear };
        let curve = YieldCurve::new(
            vec![
                YieldCurvePoint { maturity: dec!(1), rate: short_rate },
                YieldCurvePoint { maturity: dec!(5), rate: (short_rate + long_rate) / dec!(2) },
                YieldCurvePoint { maturity: dec!(10), rate: long_rate },
            ],
            method,
        )
        .unwrap();
        prop_assert_eq!(curve.rate_at(inside / dec!(100)).unwrap(), short_rate);
        prop_assert_eq!(curve.rate_at(dec!(10) + beyond).unwrap(), long_rate);
    }

    #[test]
    fn default_probability_is_a_probability(
        spread in pct(0, 500_000),
        recovery in pct(0, 99),
        maturity in pct(0, 3000),
    ) {
        let pd = default_probability_from_spread(spread, recovery, maturity).unwrap();
        prop_assert!(pd >= Decimal::ZERO && pd <= Decimal::ONE);
    }
}
