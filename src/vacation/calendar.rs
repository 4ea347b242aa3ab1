use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::error::VacationError;
use crate::model::directory::{Holiday, UserProfile};
use crate::model::usage::UsageUnit;

pub fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    if !(1..=12).contains(&month) {
        return None;
    }
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|d| d.day())
}

/// Builds a date, pulling `day` back to the last day of short months.
pub fn ymd_clamped(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let last = last_day_of_month(year, month)?;
    NaiveDate::from_ymd_opt(year, month, day.clamp(1, last))
}

pub fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Holiday dates that are never charged.
pub fn days_off(holidays: &[Holiday]) -> HashSet<NaiveDate> {
    holidays
        .iter()
        .filter(|h| h.kind.is_day_off())
        .map(|h| h.date)
        .collect()
}

/// Dates in `[start, end]` that count against a balance.
pub fn chargeable_days(
    start: NaiveDate,
    end: NaiveDate,
    days_off: &HashSet<NaiveDate>,
) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !is_weekend(*d) && !days_off.contains(d))
        .collect()
}

pub fn within_working_hours(
    profile: &UserProfile,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> bool {
    profile.work_start <= start.time() && end.time() <= profile.work_end
}

/// Converts a requested range into the decimal amount charged.
///
/// Full days count chargeable dates. Half days are worth 0.5. Hour and
/// minute units are the share of the user's working day, to 4 places.
pub fn required_amount(
    unit: UsageUnit,
    start: NaiveDateTime,
    end: NaiveDateTime,
    chargeable: usize,
    profile: &UserProfile,
) -> Result<Decimal, VacationError> {
    if unit.is_full_day() {
        return Ok(Decimal::from(chargeable));
    }
    if chargeable == 0 {
        return Ok(Decimal::ZERO);
    }
    if unit.is_half_day() {
        return Ok(dec!(0.5));
    }

    let minutes = (end - start).num_minutes();
    if minutes <= 0 {
        return Err(VacationError::validation("usage must cover at least one minute"));
    }
    if unit == UsageUnit::Hour && minutes % 60 != 0 {
        return Err(VacationError::validation("hour based usage must cover whole hours"));
    }
    let workday = profile.workday_minutes();
    if workday <= 0 {
        return Err(VacationError::validation("user has no working hours configured"));
    }

    Ok((Decimal::from(minutes) / Decimal::from(workday))
        .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero))
}
