//! Coupon schedules and projected cash flows.
//!
//! Schedules are anchored on the maturity (or redemption) date and rolled
//! backwards in whole coupon periods, so a short first period lands at the
//! front. Each date is computed as `anchor - k * period` rather than by
//! repeated subtraction to avoid month-end drift.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::day_count::subtract_months;
use crate::fixed_income::instruments::Bond;
use crate::types::Money;
use crate::FixedIncomeResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashFlowType {
    Coupon,
    /// Final flow: principal plus the last coupon
    Principal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    pub date: NaiveDate,
    pub amount: Money,
    pub cashflow_type: CashFlowType,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Future cash flows of `bond` strictly after `settlement`, ascending by date.
pub fn generate_cash_flows(bond: &Bond, settlement: NaiveDate) -> FixedIncomeResult<Vec<CashFlow>> {
    bond.validate(settlement)?;

    let flows = match bond {
        Bond::ZeroCoupon(b) => vec![CashFlow {
            date: b.maturity_date,
            amount: b.face_value,
            cashflow_type: CashFlowType::Principal,
        }],
        Bond::FixedRate(_) | Bond::FloatingRate(_) | Bond::Callable(_) | Bond::Putable(_) => {
            redemption_schedule(
                bond.coupon_per_period(),
                settlement,
                bond.maturity_date(),
                bond.face_value(),
                bond.frequency(),
            )
        }
    };
    Ok(flows)
}

/// Coupon dates after `settlement` up to and including `anchor`, ascending.
pub fn coupon_dates(settlement: NaiveDate, anchor: NaiveDate, frequency: u8) -> Vec<NaiveDate> {
    let months = months_per_period(frequency);
    let mut dates = Vec::new();
    let mut k = 0u32;
    loop {
        let date = subtract_months(anchor, k * months);
        if date <= settlement {
            break;
        }
        dates.push(date);
        k += 1;
    }
    dates.reverse();
    dates
}

/// Last scheduled coupon date on or before `settlement`.
pub fn previous_coupon_date(settlement: NaiveDate, maturity: NaiveDate, frequency: u8) -> NaiveDate {
    let months = months_per_period(frequency);
    let mut k = 0u32;
    loop {
        let date = subtract_months(maturity, k * months);
        if date <= settlement {
            return date;
        }
        k += 1;
    }
}

/// First scheduled coupon date strictly after `settlement`. Returns the
/// maturity itself when settlement is on or after it.
pub fn next_coupon_date(settlement: NaiveDate, maturity: NaiveDate, frequency: u8) -> NaiveDate {
    coupon_dates(settlement, maturity, frequency)
        .first()
        .copied()
        .unwrap_or(maturity)
}

/// Coupon flows to a (possibly synthetic) redemption date, with
/// `redemption_value` added to the final coupon. Used for maturity
/// schedules and for call/put workouts.
pub(crate) fn redemption_schedule(
    coupon: Money,
    settlement: NaiveDate,
    redemption_date: NaiveDate,
    redemption_value: Money,
    frequency: u8,
) -> Vec<CashFlow> {
    let dates = coupon_dates(settlement, redemption_date, frequency);
    let last = dates.len().saturating_sub(1);
    dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| {
            if i == last {
                CashFlow {
                    date,
                    amount: coupon + redemption_value,
                    cashflow_type: CashFlowType::Principal,
                }
            } else {
                CashFlow {
                    date,
                    amount: coupon,
                    cashflow_type: CashFlowType::Coupon,
                }
            }
        })
        .collect()
}

pub(crate) fn months_per_period(frequency: u8) -> u32 {
    12 / u32::from(frequency.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::day_count::DayCountConvention;
    use crate::fixed_income::instruments::{FixedRateBond, ZeroCouponBond};
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn five_year() -> Bond {
        Bond::FixedRate(FixedRateBond::new(
            dec!(1000),
            dec!(5),
            d(2030, 1, 15),
            2,
            DayCountConvention::Thirty360,
        ))
    }

    #[test]
    fn test_semiannual_schedule() {
        let flows = generate_cash_flows(&five_year(), d(2025, 1, 15)).unwrap();
        assert_eq!(flows.len(), 10);
        assert_eq!(flows[0].date, d(2025, 7, 15));
        assert_eq!(flows[0].amount, dec!(25));
        assert_eq!(flows[0].cashflow_type, CashFlowType::Coupon);

        let last = flows.last().unwrap();
        assert_eq!(last.date, d(2030, 1, 15));
        assert_eq!(last.amount, dec!(1025));
        assert_eq!(last.cashflow_type, CashFlowType::Principal);

        assert!(flows.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_mid_period_settlement_drops_past_coupons() {
        let flows = generate_cash_flows(&five_year(), d(2025, 3, 1)).unwrap();
        assert_eq!(flows.len(), 10);
        assert_eq!(flows[0].date, d(2025, 7, 15));

        let flows = generate_cash_flows(&five_year(), d(2025, 7, 15)).unwrap();
        assert_eq!(flows.len(), 9);
        assert_eq!(flows[0].date, d(2026, 1, 15));
    }

    #[test]
    fn test_zero_coupon_single_principal() {
        let zero = Bond::ZeroCoupon(ZeroCouponBond {
            face_value: dec!(100),
            maturity_date: d(2028, 6, 30),
            frequency: 2,
            day_count: DayCountConvention::Actual365,
        });
        let flows = generate_cash_flows(&zero, d(2025, 1, 1)).unwrap();
        assert_eq!(
            flows,
            vec![CashFlow {
                date: d(2028, 6, 30),
                amount: dec!(100),
                cashflow_type: CashFlowType::Principal,
            }]
        );
    }

    #[test]
    fn test_month_end_maturity_does_not_drift() {
        let dates = coupon_dates(d(2024, 1, 1), d(2025, 8, 31), 4);
        assert_eq!(
            dates,
            vec![
                d(2024, 2, 29),
                d(2024, 5, 31),
                d(2024, 8, 31),
                d(2024, 11, 30),
                d(2025, 2, 28),
                d(2025, 5, 31),
                d(2025, 8, 31),
            ]
        );
    }

    #[test]
    fn test_previous_and_next_coupon() {
        let mat = d(2030, 1, 15);
        assert_eq!(previous_coupon_date(d(2025, 3, 1), mat, 2), d(2025, 1, 15));
        assert_eq!(next_coupon_date(d(2025, 3, 1), mat, 2), d(2025, 7, 15));
        // On a coupon date the previous coupon is that date
        assert_eq!(previous_coupon_date(d(2025, 7, 15), mat, 2), d(2025, 7, 15));
        assert_eq!(next_coupon_date(d(2025, 7, 15), mat, 2), d(2026, 1, 15));
    }

    #[test]
    fn test_redemption_schedule_uses_redemption_value() {
        let flows = redemption_schedule(dec!(25), d(2025, 1, 15), d(2027, 1, 15), dec!(1020), 2);
        assert_eq!(flows.len(), 4);
        assert_eq!(flows[3].amount, dec!(1045));
        assert!(redemption_schedule(dec!(25), d(2025, 1, 15), d(2025, 1, 15), dec!(1000), 2)
            .is_empty());
    }

    #[test]
    fn test_invalid_bond_propagates() {
        assert!(generate_cash_flows(&five_year(), d(2031, 1, 1)).is_err());
    }
}
