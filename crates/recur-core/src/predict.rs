//! Prediction of upcoming occurrences of a recurring charge

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::calendar::{
    days_in_month, first_working_day, last_weekday_of_month, last_working_day, nth_weekday, ymd,
    WorkingDayCalendar,
};
use crate::error::{Error, Result};
use crate::models::{Prediction, RecurringChargePattern, TemporalPattern};
use crate::stats::round2;

/// Confidence multiplier for a pattern last seen `days_since_last` days ago
///
/// 1 up to the expected interval, falling linearly to 0 at twice the
/// expected interval.
pub fn decay_factor(days_since_last: f64, expected_interval: f64) -> f64 {
    if expected_interval <= 0.0 {
        return 0.0;
    }
    if days_since_last <= expected_interval {
        return 1.0;
    }
    (2.0 - days_since_last / expected_interval).clamp(0.0, 1.0)
}

/// The next `count` occurrences strictly after `as_of` (and after the last
/// observed occurrence)
pub fn predict_next(
    pattern: &RecurringChargePattern,
    as_of: NaiveDate,
    count: usize,
    calendar: &dyn WorkingDayCalendar,
) -> Result<Vec<Prediction>> {
    if count < 1 {
        return Err(Error::InvalidInput(format!(
            "prediction count must be at least 1, got {}",
            count
        )));
    }

    let dates = upcoming_dates(pattern, as_of, count, calendar)?;

    let expected = pattern.expected_interval_days();
    let since_last = (as_of - pattern.last_occurrence).num_days() as f64;
    let confidence = round2(pattern.confidence_score * decay_factor(since_last, expected));
    let (low, high) = pattern.amount.expected_range();

    Ok(dates
        .into_iter()
        .map(|date| Prediction {
            pattern_id: pattern.id.clone(),
            expected_date: date,
            expected_amount: round2(pattern.amount.mean),
            amount_low: round2(low),
            amount_high: round2(high),
            confidence,
            days_until: (date - as_of).num_days(),
        })
        .collect())
}

/// Occurrence dates after `max(as_of, last_occurrence)`, in order
pub fn upcoming_dates(
    pattern: &RecurringChargePattern,
    as_of: NaiveDate,
    count: usize,
    calendar: &dyn WorkingDayCalendar,
) -> Result<Vec<NaiveDate>> {
    let last = pattern.last_occurrence;
    let after = as_of.max(last);
    let mut dates = Vec::with_capacity(count);

    if pattern.temporal_pattern.is_month_anchored() {
        let step = pattern.frequency.month_step() as i64;
        let anchor = month_index(last);
        // Jump close to `after`; the loop below skips the remainder
        let mut k = ((month_index(after) - anchor) / step).max(1);
        while dates.len() < count {
            let (year, month) = from_month_index(anchor + k * step);
            let date = date_in_month(&pattern.temporal_pattern, year, month, calendar)?;
            if date > after {
                dates.push(date);
            }
            k += 1;
        }
    } else {
        let step = day_step(pattern);
        let mut k = ((after - last).num_days() / step).max(1);
        while dates.len() < count {
            let base = last
                .checked_add_signed(Duration::days(k * step))
                .ok_or_else(|| Error::InvalidInput("prediction date out of range".into()))?;
            let date = match pattern.temporal_pattern.day_of_week() {
                Some(weekday) => snap_to_weekday(base, weekday),
                None => base,
            };
            if date > after {
                dates.push(date);
            }
            k += 1;
        }
    }

    Ok(dates)
}

/// Days between occurrences for patterns not anchored to a month position
///
/// Follows the observed cadence; weekday patterns round it to whole weeks.
fn day_step(pattern: &RecurringChargePattern) -> i64 {
    let interval = pattern.expected_interval_days();
    match pattern.temporal_pattern {
        TemporalPattern::DayOfWeek { .. } => {
            let weeks = (interval / 7.0).round().max(1.0) as i64;
            weeks * 7
        }
        _ => (interval.round() as i64).max(1),
    }
}

/// Nearest date (within three days either way) falling on `weekday`
fn snap_to_weekday(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let from = date.weekday().num_days_from_monday() as i64;
    let to = weekday.num_days_from_monday() as i64;
    let mut diff = (to - from).rem_euclid(7);
    if diff > 3 {
        diff -= 7;
    }
    date + Duration::days(diff)
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

fn from_month_index(index: i64) -> (i32, u32) {
    (index.div_euclid(12) as i32, index.rem_euclid(12) as u32 + 1)
}

/// Where a month-anchored pattern lands within `year`/`month`
pub fn date_in_month(
    pattern: &TemporalPattern,
    year: i32,
    month: u32,
    calendar: &dyn WorkingDayCalendar,
) -> Result<NaiveDate> {
    match *pattern {
        TemporalPattern::DayOfMonth { day } => ymd(year, month, day.min(days_in_month(year, month))),
        TemporalPattern::LastWorkingDay => last_working_day(calendar, year, month),
        TemporalPattern::FirstWorkingDay => first_working_day(calendar, year, month),
        TemporalPattern::LastWeekdayOfMonth { weekday } => {
            last_weekday_of_month(year, month, weekday)
        }
        TemporalPattern::FirstWeekdayOfMonth { weekday } => nth_weekday(year, month, weekday, 1),
        TemporalPattern::NthWeekdayOfMonth { ordinal, weekday } => {
            // Months without a 5th occurrence use the last one
            nth_weekday(year, month, weekday, ordinal)
                .or_else(|_| last_weekday_of_month(year, month, weekday))
        }
        TemporalPattern::DayOfWeek { .. } | TemporalPattern::Flexible => Err(Error::Internal(
            format!("{} is not anchored to a month position", pattern.kind()),
        )),
    }
}
