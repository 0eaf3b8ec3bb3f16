//! Domain models for Recur

use chrono::{NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A financial transaction as provided by the surrounding application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    /// Negative = expense, positive = income
    pub amount: Decimal,
    pub description: String,
    pub user_id: i64,
}

impl Transaction {
    pub fn new(id: i64, date: NaiveDate, amount: Decimal, description: &str, user_id: i64) -> Self {
        Self {
            id,
            date,
            amount,
            description: description.to_string(),
            user_id,
        }
    }
}

/// How often a recurring charge happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    BiWeekly,
    SemiMonthly,
    Monthly,
    Quarterly,
    Annually,
    Irregular,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::BiWeekly => "bi_weekly",
            Self::SemiMonthly => "semi_monthly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annually => "annually",
            Self::Irregular => "irregular",
        }
    }

    /// Nominal number of days between occurrences
    pub fn nominal_interval_days(&self) -> Option<f64> {
        match self {
            Self::Daily => Some(1.0),
            Self::Weekly => Some(7.0),
            Self::BiWeekly => Some(14.0),
            Self::SemiMonthly => Some(15.0),
            Self::Monthly => Some(30.0),
            Self::Quarterly => Some(90.0),
            Self::Annually => Some(365.0),
            Self::Irregular => None,
        }
    }

    /// Calendar months advanced per occurrence for month-anchored patterns
    pub fn month_step(&self) -> u32 {
        match self {
            Self::Quarterly => 3,
            Self::Annually => 12,
            _ => 1,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "bi_weekly" | "biweekly" => Ok(Self::BiWeekly),
            "semi_monthly" | "semimonthly" => Ok(Self::SemiMonthly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "annually" | "yearly" => Ok(Self::Annually),
            "irregular" => Ok(Self::Irregular),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

/// Plain tag of a [`TemporalPattern`], without its parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalPatternType {
    LastWorkingDay,
    FirstWorkingDay,
    LastWeekdayOfMonth,
    FirstWeekdayOfMonth,
    NthWeekdayOfMonth,
    DayOfMonth,
    DayOfWeek,
    Flexible,
}

impl TemporalPatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LastWorkingDay => "last_working_day",
            Self::FirstWorkingDay => "first_working_day",
            Self::LastWeekdayOfMonth => "last_weekday_of_month",
            Self::FirstWeekdayOfMonth => "first_weekday_of_month",
            Self::NthWeekdayOfMonth => "nth_weekday_of_month",
            Self::DayOfMonth => "day_of_month",
            Self::DayOfWeek => "day_of_week",
            Self::Flexible => "flexible",
        }
    }
}

impl fmt::Display for TemporalPatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// When in its cycle a recurring charge lands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemporalPattern {
    /// Last working day of the month (holiday-aware)
    LastWorkingDay,
    /// First working day of the month (holiday-aware)
    FirstWorkingDay,
    /// Last given weekday of the month, e.g. "last Thursday"
    LastWeekdayOfMonth { weekday: Weekday },
    /// First given weekday of the month, e.g. "first Monday"
    FirstWeekdayOfMonth { weekday: Weekday },
    /// Nth given weekday of the month, e.g. "third Friday" (ordinal 1-5)
    NthWeekdayOfMonth { ordinal: u32, weekday: Weekday },
    /// Fixed calendar day, clamped to the month's last day
    DayOfMonth { day: u32 },
    /// Fixed weekday
    DayOfWeek { weekday: Weekday },
    /// No calendar anchor; recurs on a mean interval
    Flexible,
}

impl TemporalPattern {
    pub fn kind(&self) -> TemporalPatternType {
        match self {
            Self::LastWorkingDay => TemporalPatternType::LastWorkingDay,
            Self::FirstWorkingDay => TemporalPatternType::FirstWorkingDay,
            Self::LastWeekdayOfMonth { .. } => TemporalPatternType::LastWeekdayOfMonth,
            Self::FirstWeekdayOfMonth { .. } => TemporalPatternType::FirstWeekdayOfMonth,
            Self::NthWeekdayOfMonth { .. } => TemporalPatternType::NthWeekdayOfMonth,
            Self::DayOfMonth { .. } => TemporalPatternType::DayOfMonth,
            Self::DayOfWeek { .. } => TemporalPatternType::DayOfWeek,
            Self::Flexible => TemporalPatternType::Flexible,
        }
    }

    pub fn day_of_week(&self) -> Option<Weekday> {
        match *self {
            Self::LastWeekdayOfMonth { weekday }
            | Self::FirstWeekdayOfMonth { weekday }
            | Self::NthWeekdayOfMonth { weekday, .. }
            | Self::DayOfWeek { weekday } => Some(weekday),
            _ => None,
        }
    }

    pub fn day_of_month(&self) -> Option<u32> {
        match *self {
            Self::DayOfMonth { day } => Some(day),
            _ => None,
        }
    }

    /// Week-of-month ordinal (1-5) for weekday-in-month patterns
    pub fn week_of_month(&self) -> Option<u32> {
        match *self {
            Self::FirstWeekdayOfMonth { .. } => Some(1),
            Self::NthWeekdayOfMonth { ordinal, .. } => Some(ordinal),
            _ => None,
        }
    }

    /// Whether the pattern is anchored to a position within a calendar month
    pub fn is_month_anchored(&self) -> bool {
        !matches!(self, Self::DayOfWeek { .. } | Self::Flexible)
    }
}

impl fmt::Display for TemporalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LastWorkingDay => write!(f, "last working day"),
            Self::FirstWorkingDay => write!(f, "first working day"),
            Self::LastWeekdayOfMonth { weekday } => write!(f, "last {}", weekday),
            Self::FirstWeekdayOfMonth { weekday } => write!(f, "first {}", weekday),
            Self::NthWeekdayOfMonth { ordinal, weekday } => {
                write!(f, "{} {}", ordinal_suffix(*ordinal), weekday)
            }
            Self::DayOfMonth { day } => write!(f, "day {}", day),
            Self::DayOfWeek { weekday } => write!(f, "every {}", weekday),
            Self::Flexible => write!(f, "flexible"),
        }
    }
}

fn ordinal_suffix(n: u32) -> String {
    let suffix = match n {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// Amount statistics of a recurring charge (signed, in currency units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountStats {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    /// Expected deviation from the mean, as a percentage of |mean|
    pub tolerance_pct: f64,
}

impl AmountStats {
    /// Expected range `mean ± |mean| * tolerance_pct / 100`, low first
    pub fn expected_range(&self) -> (f64, f64) {
        let delta = self.mean.abs() * self.tolerance_pct / 100.0;
        (self.mean - delta, self.mean + delta)
    }
}

/// A recurring charge discovered in a user's transaction history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringChargePattern {
    /// Stable identifier (same inputs always produce the same id)
    pub id: String,
    pub user_id: i64,
    /// Description text shared by every member transaction
    pub merchant_pattern: String,
    pub frequency: Frequency,
    pub temporal_pattern: TemporalPattern,
    pub amount: AmountStats,
    pub mean_interval_days: f64,
    pub confidence_score: f64,
    /// Fraction of members matching the temporal rule that fired
    pub temporal_consistency: f64,
    pub transaction_count: usize,
    pub transaction_ids: Vec<i64>,
    pub first_occurrence: NaiveDate,
    pub last_occurrence: NaiveDate,
    pub active: bool,
}

impl RecurringChargePattern {
    /// Interval used for decay and day-based advancement
    pub fn expected_interval_days(&self) -> f64 {
        if self.mean_interval_days > 0.0 {
            self.mean_interval_days
        } else {
            self.frequency.nominal_interval_days().unwrap_or(30.0)
        }
    }
}

/// A forecast occurrence of a recurring charge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub pattern_id: String,
    pub expected_date: NaiveDate,
    pub expected_amount: f64,
    pub amount_low: f64,
    pub amount_high: f64,
    pub confidence: f64,
    pub days_until: i64,
}

/// Pipeline stages, used for progress reporting and timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStage {
    FeatureExtraction,
    Clustering,
    Analysis,
    Done,
}

impl DetectionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FeatureExtraction => "feature_extraction",
            Self::Clustering => "clustering",
            Self::Analysis => "analysis",
            Self::Done => "done",
        }
    }

    /// Progress percentage reported once the stage completes
    pub fn completion_percent(&self) -> u8 {
        match self {
            Self::FeatureExtraction => 20,
            Self::Clustering => 50,
            Self::Analysis => 80,
            Self::Done => 100,
        }
    }
}

impl fmt::Display for DetectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
