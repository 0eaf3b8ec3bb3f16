//! Test utilities: synthetic transaction series and a fixed-holiday calendar

use chrono::{Duration, NaiveDate, Weekday};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::calendar::{days_in_month, last_weekday_of_month, WorkingDayCalendar};
use crate::error::Result;
use crate::models::Transaction;

pub const TEST_USER: i64 = 1;

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Single transaction for [`TEST_USER`]
pub fn tx(id: i64, day: &str, amount: &str, description: &str) -> Transaction {
    Transaction::new(id, date(day), dec(amount), description, TEST_USER)
}

fn month_after(year: i32, month: u32, offset: u32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + offset as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// `count` monthly charges on `day` (clamped to month length), starting at year/month
pub fn monthly_series(
    start_id: i64,
    description: &str,
    amount: &str,
    year: i32,
    month: u32,
    day: u32,
    count: u32,
) -> Vec<Transaction> {
    (0..count)
        .map(|i| {
            let (y, m) = month_after(year, month, i);
            let d = day.min(days_in_month(y, m));
            Transaction::new(
                start_id + i as i64,
                NaiveDate::from_ymd_opt(y, m, d).unwrap(),
                dec(amount),
                description,
                TEST_USER,
            )
        })
        .collect()
}

/// `count` charges on the last `weekday` of consecutive months
pub fn last_weekday_series(
    start_id: i64,
    description: &str,
    amount: &str,
    year: i32,
    month: u32,
    weekday: Weekday,
    count: u32,
) -> Vec<Transaction> {
    (0..count)
        .map(|i| {
            let (y, m) = month_after(year, month, i);
            Transaction::new(
                start_id + i as i64,
                last_weekday_of_month(y, m, weekday).unwrap(),
                dec(amount),
                description,
                TEST_USER,
            )
        })
        .collect()
}

/// `count` charges every `step_days` days from `start`
pub fn interval_series(
    start_id: i64,
    description: &str,
    amount: &str,
    start: &str,
    step_days: i64,
    count: u32,
) -> Vec<Transaction> {
    let first = date(start);
    (0..count)
        .map(|i| {
            Transaction::new(
                start_id + i as i64,
                first + Duration::days(step_days * i as i64),
                dec(amount),
                description,
                TEST_USER,
            )
        })
        .collect()
}

/// Calendar with an explicit holiday list
#[derive(Debug, Default)]
pub struct FixedHolidays {
    dates: BTreeSet<NaiveDate>,
}

impl FixedHolidays {
    pub fn new(dates: &[&str]) -> Self {
        Self {
            dates: dates.iter().map(|d| date(d)).collect(),
        }
    }
}

impl WorkingDayCalendar for FixedHolidays {
    fn is_holiday(&self, day: NaiveDate) -> Result<bool> {
        Ok(self.dates.contains(&day))
    }
}
