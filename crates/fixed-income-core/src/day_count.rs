//! Day-count conventions and calendar arithmetic used by every schedule and
//! accrual computation.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FixedIncomeError;
use crate::types::Years;
use crate::FixedIncomeResult;

/// Day count convention for year fractions and accrued interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DayCountConvention {
    /// 30/360 US (bond basis)
    #[default]
    Thirty360,
    /// ACT/360 money market
    Actual360,
    /// ACT/365 fixed
    Actual365,
    /// ACT/ACT ISDA
    ActualActual,
}

// ---------------------------------------------------------------------------
// Year fractions
// ---------------------------------------------------------------------------

/// Year fraction between two dates under `convention`.
///
/// Fails with `InvalidDateRange` unless `end` is strictly after `start`.
pub fn year_fraction(
    start: NaiveDate,
    end: NaiveDate,
    convention: DayCountConvention,
) -> FixedIncomeResult<Years> {
    if end <= start {
        return Err(FixedIncomeError::InvalidDateRange { start, end });
    }

    let actual = Decimal::from((end - start).num_days());
    let fraction = match convention {
        DayCountConvention::Thirty360 => Decimal::from(thirty_360_days(start, end)) / dec!(360),
        DayCountConvention::Actual360 => actual / dec!(360),
        DayCountConvention::Actual365 => actual / dec!(365),
        DayCountConvention::ActualActual => actual_actual_isda(start, end),
    };
    Ok(fraction)
}

/// ACT/ACT ISDA: days falling in each calendar year are divided by that
/// year's length.
fn actual_actual_isda(start: NaiveDate, end: NaiveDate) -> Decimal {
    let (y1, y2) = (start.year(), end.year());
    if y1 == y2 {
        return Decimal::from((end - start).num_days()) / Decimal::from(days_in_year(y1));
    }

    let mut fraction = Decimal::ZERO;
    if let Some(next_jan1) = NaiveDate::from_ymd_opt(y1 + 1, 1, 1) {
        fraction +=
            Decimal::from((next_jan1 - start).num_days()) / Decimal::from(days_in_year(y1));
    }
    fraction += Decimal::from(y2 - y1 - 1);
    if let Some(end_jan1) = NaiveDate::from_ymd_opt(y2, 1, 1) {
        fraction += Decimal::from((end - end_jan1).num_days()) / Decimal::from(days_in_year(y2));
    }
    fraction
}

/// 30/360 US day count (raw days, not a fraction).
///
/// Day 31 rolls to 30 on the start date; on the end date only when the
/// start day is already 30 or 31.
pub fn thirty_360_days(start: NaiveDate, end: NaiveDate) -> i64 {
    let mut d1 = i64::from(start.day());
    let mut d2 = i64::from(end.day());
    if d1 == 31 {
        d1 = 30;
    }
    if d2 == 31 && d1 >= 30 {
        d2 = 30;
    }

    let years = i64::from(end.year() - start.year());
    let months = i64::from(end.month()) - i64::from(start.month());
    years * 360 + months * 30 + (d2 - d1)
}

// ---------------------------------------------------------------------------
// Calendar helpers
// ---------------------------------------------------------------------------

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_year(year: i32) -> u32 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 30,
    }
}

/// Shift a date by `months` (negative moves backwards), clamping the day to
/// the target month's length: Aug 31 + 6 months is Feb 28/29.
fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    let total = date.year() * 12 + date.month() as i32 - 1 + months;
    let year = total.div_euclid(12);
    let month = (total.rem_euclid(12) + 1) as u32;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    shift_months(date, months as i32)
}

pub fn subtract_months(date: NaiveDate, months: u32) -> NaiveDate {
    shift_months(date, -(months as i32))
}
