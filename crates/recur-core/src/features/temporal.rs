//! Temporal feature block
//!
//! Layout (index: feature):
//! - 0, 1: sin/cos day-of-week (period 7, Monday = 0)
//! - 2, 3: sin/cos day-of-month (period 31)
//! - 4, 5: sin/cos month position, `(day-1)/(daysInMonth-1)` as one full turn
//! - 6, 7: sin/cos week-of-month (period 5)
//! - 8, 9: sin/cos month-of-year (period 12)
//! - 10: working day
//! - 11: first working day of the month
//! - 12: last working day of the month
//! - 13: first occurrence of this weekday in the month
//! - 14: last occurrence of this weekday in the month
//! - 15: weekend
//! - 16: last calendar day of the month

use chrono::{Datelike, NaiveDate};
use std::f64::consts::TAU;

use crate::calendar::{
    days_in_month, days_remaining_in_month, first_working_day, is_weekend, last_working_day,
    WorkingDayCalendar,
};
use crate::error::Result;

pub const TEMPORAL_WIDTH: usize = 17;

/// Map a value on a cycle of length `period` to a point on the unit circle
pub fn cyclical_encode(value: f64, period: f64) -> (f64, f64) {
    let angle = TAU * value / period;
    (angle.sin(), angle.cos())
}

/// Relative position of the day within its own month, in [0, 1]
///
/// The last day of every month maps to 1.0 regardless of month length.
pub fn month_position(date: NaiveDate) -> f64 {
    let len = days_in_month(date.year(), date.month());
    if len <= 1 {
        return 0.0;
    }
    (date.day() - 1) as f64 / (len - 1) as f64
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

pub fn extract_temporal_features(
    date: NaiveDate,
    calendar: &dyn WorkingDayCalendar,
) -> Result<[f64; TEMPORAL_WIDTH]> {
    let day = date.day();
    let remaining = days_remaining_in_month(date);

    let (dow_sin, dow_cos) = cyclical_encode(date.weekday().num_days_from_monday() as f64, 7.0);
    let (dom_sin, dom_cos) = cyclical_encode((day - 1) as f64, 31.0);
    let (pos_sin, pos_cos) = cyclical_encode(month_position(date), 1.0);
    let (wom_sin, wom_cos) = cyclical_encode(((day - 1) / 7) as f64, 5.0);
    let (moy_sin, moy_cos) = cyclical_encode((date.month() - 1) as f64, 12.0);

    let working = calendar.is_working_day(date)?;
    let first_working = first_working_day(calendar, date.year(), date.month())? == date;
    let last_working = last_working_day(calendar, date.year(), date.month())? == date;

    Ok([
        dow_sin,
        dow_cos,
        dom_sin,
        dom_cos,
        pos_sin,
        pos_cos,
        wom_sin,
        wom_cos,
        moy_sin,
        moy_cos,
        flag(working),
        flag(first_working),
        flag(last_working),
        flag(day <= 7),
        flag(remaining < 7),
        flag(is_weekend(date)),
        flag(remaining == 0),
    ])
}
