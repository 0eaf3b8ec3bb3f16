//! Holiday and working-day calendar
//!
//! Public holidays are computed from rules rather than looked up in a table,
//! so any Gregorian year works. Each [`HolidayCalendar`] caches the holidays of
//! the years it has already seen.
//!
//! Supported locales:
//! - `us`: US federal holidays (Saturday observed on Friday, Sunday on Monday)
//! - `gb`: England & Wales bank holidays (weekend holidays substitute forward)
//! - `none`: weekends only

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use crate::error::{Error, Result};

/// First and last years the holiday rules are defined for
pub const MIN_SUPPORTED_YEAR: i32 = 1583;
pub const MAX_SUPPORTED_YEAR: i32 = 9999;

/// Holiday locale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Us,
    Gb,
    None,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Us => "us",
            Self::Gb => "gb",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "us" | "en-us" => Ok(Self::Us),
            "gb" | "uk" | "en-gb" => Ok(Self::Gb),
            "none" => Ok(Self::None),
            other => Err(Error::Configuration(format!(
                "Unsupported holiday locale: {}",
                other
            ))),
        }
    }
}

/// A named public holiday
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: &'static str,
}

/// Working-day capability injected into feature extraction, analysis and prediction
pub trait WorkingDayCalendar: Send + Sync {
    /// Whether `date` is a registered public holiday
    fn is_holiday(&self, date: NaiveDate) -> Result<bool>;

    /// Monday-Friday and not a public holiday
    fn is_working_day(&self, date: NaiveDate) -> Result<bool> {
        if is_weekend(date) {
            return Ok(false);
        }
        Ok(!self.is_holiday(date)?)
    }
}

/// Rule-based holiday calendar for one locale
#[derive(Debug)]
pub struct HolidayCalendar {
    locale: Locale,
    cache: RwLock<HashMap<i32, BTreeSet<NaiveDate>>>,
}

impl HolidayCalendar {
    pub fn new(locale: Locale) -> Self {
        Self {
            locale,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Named holidays of `year`, sorted by date
    pub fn holidays(&self, year: i32) -> Result<Vec<Holiday>> {
        holidays_in_year(self.locale, year)
    }
}

impl Default for HolidayCalendar {
    fn default() -> Self {
        Self::new(Locale::default())
    }
}

impl WorkingDayCalendar for HolidayCalendar {
    fn is_holiday(&self, date: NaiveDate) -> Result<bool> {
        let year = date.year();
        {
            let cache = self
                .cache
                .read()
                .map_err(|_| Error::Internal("holiday cache lock poisoned".into()))?;
            if let Some(dates) = cache.get(&year) {
                return Ok(dates.contains(&date));
            }
        }

        let dates: BTreeSet<NaiveDate> = holidays_in_year(self.locale, year)?
            .into_iter()
            .map(|h| h.date)
            .collect();
        let is_holiday = dates.contains(&date);

        let mut cache = self
            .cache
            .write()
            .map_err(|_| Error::Internal("holiday cache lock poisoned".into()))?;
        cache.insert(year, dates);
        Ok(is_holiday)
    }
}

/// Compute the holidays of `year` for `locale`
pub fn holidays_in_year(locale: Locale, year: i32) -> Result<Vec<Holiday>> {
    if !(MIN_SUPPORTED_YEAR..=MAX_SUPPORTED_YEAR).contains(&year) {
        return Err(Error::Configuration(format!(
            "Holiday rules are not defined for year {} (supported {}-{})",
            year, MIN_SUPPORTED_YEAR, MAX_SUPPORTED_YEAR
        )));
    }

    let mut holidays = match locale {
        Locale::Us => us_federal_holidays(year)?,
        Locale::Gb => england_bank_holidays(year)?,
        Locale::None => Vec::new(),
    };
    holidays.sort_by_key(|h| h.date);
    Ok(holidays)
}

fn us_federal_holidays(year: i32) -> Result<Vec<Holiday>> {
    let mut holidays = Vec::new();

    // New Year's Day observed on Dec 31 belongs to the previous year
    for y in [year, year + 1] {
        if y > MAX_SUPPORTED_YEAR {
            continue;
        }
        let observed = us_observed(ymd(y, 1, 1)?);
        if observed.year() == year {
            holidays.push(Holiday {
                date: observed,
                name: "New Year's Day",
            });
        }
    }

    holidays.push(Holiday {
        date: nth_weekday(year, 1, Weekday::Mon, 3)?,
        name: "Martin Luther King Jr. Day",
    });
    holidays.push(Holiday {
        date: nth_weekday(year, 2, Weekday::Mon, 3)?,
        name: "Presidents' Day",
    });
    holidays.push(Holiday {
        date: last_weekday_of_month(year, 5, Weekday::Mon)?,
        name: "Memorial Day",
    });
    if year >= 2021 {
        holidays.push(Holiday {
            date: us_observed(ymd(year, 6, 19)?),
            name: "Juneteenth",
        });
    }
    holidays.push(Holiday {
        date: us_observed(ymd(year, 7, 4)?),
        name: "Independence Day",
    });
    holidays.push(Holiday {
        date: nth_weekday(year, 9, Weekday::Mon, 1)?,
        name: "Labor Day",
    });
    holidays.push(Holiday {
        date: nth_weekday(year, 10, Weekday::Mon, 2)?,
        name: "Columbus Day",
    });
    holidays.push(Holiday {
        date: us_observed(ymd(year, 11, 11)?),
        name: "Veterans Day",
    });
    holidays.push(Holiday {
        date: nth_weekday(year, 11, Weekday::Thu, 4)?,
        name: "Thanksgiving",
    });
    holidays.push(Holiday {
        date: us_observed(ymd(year, 12, 25)?),
        name: "Christmas Day",
    });

    Ok(holidays)
}

/// Saturday holidays are observed on Friday, Sunday holidays on Monday
fn us_observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn england_bank_holidays(year: i32) -> Result<Vec<Holiday>> {
    let easter = easter_sunday(year)?;
    let mut taken: BTreeSet<NaiveDate> = BTreeSet::new();
    let mut holidays = Vec::new();

    let mut push_substituted = |date: NaiveDate, name: &'static str, holidays: &mut Vec<Holiday>| {
        let mut d = date;
        while is_weekend(d) || taken.contains(&d) {
            d += Duration::days(1);
        }
        taken.insert(d);
        holidays.push(Holiday { date: d, name });
    };

    push_substituted(ymd(year, 1, 1)?, "New Year's Day", &mut holidays);
    push_substituted(easter - Duration::days(2), "Good Friday", &mut holidays);
    push_substituted(easter + Duration::days(1), "Easter Monday", &mut holidays);
    push_substituted(
        nth_weekday(year, 5, Weekday::Mon, 1)?,
        "Early May Bank Holiday",
        &mut holidays,
    );
    push_substituted(
        last_weekday_of_month(year, 5, Weekday::Mon)?,
        "Spring Bank Holiday",
        &mut holidays,
    );
    push_substituted(
        last_weekday_of_month(year, 8, Weekday::Mon)?,
        "Summer Bank Holiday",
        &mut holidays,
    );
    push_substituted(ymd(year, 12, 25)?, "Christmas Day", &mut holidays);
    push_substituted(ymd(year, 12, 26)?, "Boxing Day", &mut holidays);

    Ok(holidays)
}

/// Easter Sunday by the anonymous Gregorian computus
pub fn easter_sunday(year: i32) -> Result<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    ymd(year, month as u32, day as u32)
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Number of days in the given month
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(31)
}

/// Days after `date` until the end of its month (0 on the last day)
pub fn days_remaining_in_month(date: NaiveDate) -> u32 {
    days_in_month(date.year(), date.month()) - date.day()
}

/// Weekday from its Monday-based index (0 = Monday); wraps modulo 7
pub fn weekday_from_index(index: u32) -> Weekday {
    match index % 7 {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

/// Which occurrence of its weekday `date` is within the month (1-5)
pub fn weekday_ordinal(date: NaiveDate) -> u32 {
    (date.day() - 1) / 7 + 1
}

/// Nth (1-5) given weekday of a month
pub fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> Result<NaiveDate> {
    let n = u8::try_from(n).map_err(|_| Error::InvalidInput(format!("Invalid ordinal {}", n)))?;
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n).ok_or_else(|| {
        Error::InvalidInput(format!(
            "No {} #{} in {:04}-{:02}",
            weekday, n, year, month
        ))
    })
}

/// Last given weekday of a month
pub fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Result<NaiveDate> {
    let last = ymd(year, month, days_in_month(year, month))?;
    let back = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    Ok(last - Duration::days(back as i64))
}

/// First working day of a month according to `calendar`
pub fn first_working_day(
    calendar: &dyn WorkingDayCalendar,
    year: i32,
    month: u32,
) -> Result<NaiveDate> {
    for day in 1..=days_in_month(year, month) {
        let date = ymd(year, month, day)?;
        if calendar.is_working_day(date)? {
            return Ok(date);
        }
    }
    Err(Error::Configuration(format!(
        "Calendar has no working day in {:04}-{:02}",
        year, month
    )))
}

/// Last working day of a month according to `calendar`
pub fn last_working_day(
    calendar: &dyn WorkingDayCalendar,
    year: i32,
    month: u32,
) -> Result<NaiveDate> {
    for day in (1..=days_in_month(year, month)).rev() {
        let date = ymd(year, month, day)?;
        if calendar.is_working_day(date)? {
            return Ok(date);
        }
    }
    Err(Error::Configuration(format!(
        "Calendar has no working day in {:04}-{:02}",
        year, month
    )))
}

pub(crate) fn ymd(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        Error::InvalidInput(format!("Invalid date {:04}-{:02}-{:02}", year, month, day))
    })
}
