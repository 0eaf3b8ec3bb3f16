//! Pattern analysis of one cluster
//!
//! Turns the member transactions of a cluster into the raw facts of a
//! recurring charge: temporal pattern, frequency, merchant text, amount
//! statistics and interval regularity. Scoring happens in [`crate::confidence`].

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::calendar::{
    days_in_month, days_remaining_in_month, first_working_day, last_working_day,
    weekday_from_index, weekday_ordinal, WorkingDayCalendar,
};
use crate::error::{Error, Result};
use crate::features::amount::decimal_to_f64;
use crate::models::{AmountStats, Frequency, TemporalPattern, TemporalPatternType, Transaction};
use crate::stats::{self, mode, round2};

/// Shortest merchant text accepted from the common-substring search
const MIN_MERCHANT_LEN: usize = 3;

/// Tolerance bounds (percent of |mean|)
const MIN_TOLERANCE_PCT: f64 = 5.0;
const MAX_TOLERANCE_PCT: f64 = 100.0;

/// Minimum share of cluster members (percent) each temporal rule needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    pub last_working_day_pct: u32,
    pub first_working_day_pct: u32,
    pub last_weekday_pct: u32,
    pub first_weekday_pct: u32,
    pub nth_weekday_pct: u32,
    pub day_of_month_pct: u32,
    pub day_of_week_pct: u32,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            last_working_day_pct: 70,
            first_working_day_pct: 70,
            last_weekday_pct: 70,
            first_weekday_pct: 70,
            nth_weekday_pct: 70,
            day_of_month_pct: 60,
            day_of_week_pct: 60,
        }
    }
}

impl RuleThresholds {
    pub fn validate(&self) -> Result<()> {
        for pct in [
            self.last_working_day_pct,
            self.first_working_day_pct,
            self.last_weekday_pct,
            self.first_weekday_pct,
            self.nth_weekday_pct,
            self.day_of_month_pct,
            self.day_of_week_pct,
        ] {
            if pct > 100 {
                return Err(Error::Configuration(format!(
                    "rule thresholds are percentages, got {}",
                    pct
                )));
            }
        }
        Ok(())
    }
}

/// `matches / total >= pct / 100` in integer arithmetic
pub fn meets_threshold(matches: usize, total: usize, pct: u32) -> bool {
    total > 0 && matches * 100 >= pct as usize * total
}

/// Evaluates one rule: the candidate pattern and how many dates match it
type RuleEvaluator = fn(&[NaiveDate], &dyn WorkingDayCalendar) -> Result<Option<(TemporalPattern, usize)>>;

pub struct TemporalRule {
    pub kind: TemporalPatternType,
    pub threshold_pct: u32,
    evaluate: RuleEvaluator,
}

impl TemporalRule {
    pub fn evaluate(
        &self,
        dates: &[NaiveDate],
        calendar: &dyn WorkingDayCalendar,
    ) -> Result<Option<(TemporalPattern, usize)>> {
        (self.evaluate)(dates, calendar)
    }
}

/// Rules in evaluation order; the first one reaching its threshold wins.
/// Flexible is the fallback and has no entry.
pub fn temporal_rules(thresholds: &RuleThresholds) -> Vec<TemporalRule> {
    vec![
        TemporalRule {
            kind: TemporalPatternType::LastWorkingDay,
            threshold_pct: thresholds.last_working_day_pct,
            evaluate: last_working_day_rule,
        },
        TemporalRule {
            kind: TemporalPatternType::FirstWorkingDay,
            threshold_pct: thresholds.first_working_day_pct,
            evaluate: first_working_day_rule,
        },
        TemporalRule {
            kind: TemporalPatternType::LastWeekdayOfMonth,
            threshold_pct: thresholds.last_weekday_pct,
            evaluate: last_weekday_rule,
        },
        TemporalRule {
            kind: TemporalPatternType::FirstWeekdayOfMonth,
            threshold_pct: thresholds.first_weekday_pct,
            evaluate: first_weekday_rule,
        },
        TemporalRule {
            kind: TemporalPatternType::NthWeekdayOfMonth,
            threshold_pct: thresholds.nth_weekday_pct,
            evaluate: nth_weekday_rule,
        },
        TemporalRule {
            kind: TemporalPatternType::DayOfMonth,
            threshold_pct: thresholds.day_of_month_pct,
            evaluate: day_of_month_rule,
        },
        TemporalRule {
            kind: TemporalPatternType::DayOfWeek,
            threshold_pct: thresholds.day_of_week_pct,
            evaluate: day_of_week_rule,
        },
    ]
}

fn weekday_index(date: &NaiveDate) -> u32 {
    date.weekday().num_days_from_monday()
}

fn last_working_day_rule(
    dates: &[NaiveDate],
    calendar: &dyn WorkingDayCalendar,
) -> Result<Option<(TemporalPattern, usize)>> {
    let mut matches = 0;
    for date in dates {
        if last_working_day(calendar, date.year(), date.month())? == *date {
            matches += 1;
        }
    }
    Ok(Some((TemporalPattern::LastWorkingDay, matches)))
}

fn first_working_day_rule(
    dates: &[NaiveDate],
    calendar: &dyn WorkingDayCalendar,
) -> Result<Option<(TemporalPattern, usize)>> {
    let mut matches = 0;
    for date in dates {
        if first_working_day(calendar, date.year(), date.month())? == *date {
            matches += 1;
        }
    }
    Ok(Some((TemporalPattern::FirstWorkingDay, matches)))
}

fn last_weekday_rule(
    dates: &[NaiveDate],
    _calendar: &dyn WorkingDayCalendar,
) -> Result<Option<(TemporalPattern, usize)>> {
    let in_last_week = dates
        .iter()
        .filter(|d| days_remaining_in_month(**d) < 7)
        .map(weekday_index);
    Ok(mode(in_last_week).map(|(wd, count)| {
        (
            TemporalPattern::LastWeekdayOfMonth {
                weekday: weekday_from_index(wd),
            },
            count,
        )
    }))
}

fn first_weekday_rule(
    dates: &[NaiveDate],
    _calendar: &dyn WorkingDayCalendar,
) -> Result<Option<(TemporalPattern, usize)>> {
    let in_first_week = dates
        .iter()
        .filter(|d| weekday_ordinal(**d) == 1)
        .map(weekday_index);
    Ok(mode(in_first_week).map(|(wd, count)| {
        (
            TemporalPattern::FirstWeekdayOfMonth {
                weekday: weekday_from_index(wd),
            },
            count,
        )
    }))
}

fn nth_weekday_rule(
    dates: &[NaiveDate],
    _calendar: &dyn WorkingDayCalendar,
) -> Result<Option<(TemporalPattern, usize)>> {
    let pairs = dates.iter().map(|d| (weekday_ordinal(*d), weekday_index(d)));
    Ok(mode(pairs).map(|((ordinal, wd), count)| {
        (
            TemporalPattern::NthWeekdayOfMonth {
                ordinal,
                weekday: weekday_from_index(wd),
            },
            count,
        )
    }))
}

fn day_of_month_rule(
    dates: &[NaiveDate],
    _calendar: &dyn WorkingDayCalendar,
) -> Result<Option<(TemporalPattern, usize)>> {
    let Some((day, _)) = mode(dates.iter().map(|d| d.day())) else {
        return Ok(None);
    };
    // A day the month doesn't have is matched by the month's last day
    let matches = dates
        .iter()
        .filter(|d| {
            let len = days_in_month(d.year(), d.month());
            d.day() == day || (day > len && d.day() == len)
        })
        .count();
    Ok(Some((TemporalPattern::DayOfMonth { day }, matches)))
}

fn day_of_week_rule(
    dates: &[NaiveDate],
    _calendar: &dyn WorkingDayCalendar,
) -> Result<Option<(TemporalPattern, usize)>> {
    Ok(mode(dates.iter().map(weekday_index)).map(|(wd, count)| {
        (
            TemporalPattern::DayOfWeek {
                weekday: weekday_from_index(wd),
            },
            count,
        )
    }))
}

/// Outcome of temporal classification
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalMatch {
    pub pattern: TemporalPattern,
    /// Members matching the fired rule (0 for the flexible fallback)
    pub matches: usize,
    pub total: usize,
    /// Match fraction, or interval regularity for the flexible fallback
    pub consistency: f64,
}

/// Classify sorted member dates against the ordered rule table
pub fn classify_temporal_pattern(
    dates: &[NaiveDate],
    calendar: &dyn WorkingDayCalendar,
    thresholds: &RuleThresholds,
) -> Result<TemporalMatch> {
    let total = dates.len();
    for rule in temporal_rules(thresholds) {
        if let Some((pattern, matches)) = rule.evaluate(dates, calendar)? {
            if meets_threshold(matches, total, rule.threshold_pct) {
                debug!(
                    "Temporal rule {} matched {}/{} dates",
                    rule.kind, matches, total
                );
                return Ok(TemporalMatch {
                    pattern,
                    matches,
                    total,
                    consistency: matches as f64 / total as f64,
                });
            }
        }
    }

    Ok(TemporalMatch {
        pattern: TemporalPattern::Flexible,
        matches: 0,
        total,
        consistency: flexible_consistency(dates),
    })
}

/// Days between consecutive sorted dates
pub fn intervals(dates: &[NaiveDate]) -> Vec<f64> {
    dates
        .windows(2)
        .map(|w| (w[1] - w[0]).num_days() as f64)
        .collect()
}

/// `1 - coefficient of variation` of the intervals, clamped to [0, 1]
pub fn flexible_consistency(dates: &[NaiveDate]) -> f64 {
    let gaps = intervals(dates);
    let mean = stats::mean(&gaps);
    if gaps.is_empty() || mean <= 0.0 {
        return 0.0;
    }
    (1.0 - stats::std_dev(&gaps) / mean).clamp(0.0, 1.0)
}

/// Frequency band of a mean interval in days
pub fn classify_frequency(mean_interval: f64) -> Frequency {
    match mean_interval {
        d if (0.8..=1.2).contains(&d) => Frequency::Daily,
        d if (5.6..=8.4).contains(&d) => Frequency::Weekly,
        d if (11.2..14.5).contains(&d) => Frequency::BiWeekly,
        d if (14.5..=18.0).contains(&d) => Frequency::SemiMonthly,
        d if (24.0..=36.0).contains(&d) => Frequency::Monthly,
        d if (72.0..=108.0).contains(&d) => Frequency::Quarterly,
        d if (292.0..=438.0).contains(&d) => Frequency::Annually,
        _ => Frequency::Irregular,
    }
}

fn normalize_description(description: &str) -> String {
    description
        .to_uppercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Description text shared by all members
///
/// Longest common substring of the normalized descriptions, trimmed of
/// surrounding punctuation. Falls back to the most common description when
/// nothing meaningful is shared.
pub fn merchant_pattern<S: AsRef<str>>(descriptions: &[S]) -> String {
    let normalized: Vec<String> = descriptions
        .iter()
        .map(|d| normalize_description(d.as_ref()))
        .collect();
    let distinct: BTreeSet<&str> = normalized.iter().map(String::as_str).collect();
    let distinct: Vec<&str> = distinct.into_iter().collect();

    let common = longest_common_substring(&distinct);
    let trimmed = common.trim_matches(|c: char| !c.is_alphanumeric());
    if trimmed.chars().count() >= MIN_MERCHANT_LEN {
        return trimmed.to_string();
    }
    most_common(&normalized)
}

/// Leftmost longest substring of the shortest string present in every string
fn longest_common_substring(strings: &[&str]) -> String {
    let Some(shortest) = strings.iter().min_by_key(|s| s.chars().count()) else {
        return String::new();
    };
    let chars: Vec<char> = shortest.chars().collect();

    for len in (1..=chars.len()).rev() {
        for start in 0..=chars.len() - len {
            let candidate: String = chars[start..start + len].iter().collect();
            if strings.iter().all(|s| s.contains(candidate.as_str())) {
                return candidate;
            }
        }
    }
    String::new()
}

fn most_common(values: &[String]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values {
        *counts.entry(v.as_str()).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.to_string()).unwrap_or_default()
}

/// Mean, spread and tolerance of the member amounts
pub fn amount_stats(amounts: &[Decimal]) -> AmountStats {
    let values: Vec<f64> = amounts.iter().map(|a| decimal_to_f64(*a)).collect();
    let mean = stats::mean(&values);
    let std_dev = stats::std_dev(&values);
    let min = amounts.iter().min().copied().map(decimal_to_f64).unwrap_or(0.0);
    let max = amounts.iter().max().copied().map(decimal_to_f64).unwrap_or(0.0);

    let tolerance_pct = if mean.abs() < f64::EPSILON {
        MIN_TOLERANCE_PCT
    } else {
        (200.0 * std_dev / mean.abs()).clamp(MIN_TOLERANCE_PCT, MAX_TOLERANCE_PCT)
    };

    AmountStats {
        mean: round2(mean),
        std_dev: round2(std_dev),
        min: round2(min),
        max: round2(max),
        tolerance_pct: round2(tolerance_pct),
    }
}

/// Everything learned about one cluster before scoring
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAnalysis {
    pub user_id: i64,
    pub merchant_pattern: String,
    pub frequency: Frequency,
    pub temporal: TemporalMatch,
    pub amount: AmountStats,
    /// Unrounded amount spread, for scoring
    pub amount_mean: f64,
    pub amount_std_dev: f64,
    pub mean_interval_days: f64,
    pub interval_std_dev: f64,
    /// Member ids in date order
    pub transaction_ids: Vec<i64>,
    pub first_occurrence: NaiveDate,
    pub last_occurrence: NaiveDate,
    pub active: bool,
}

/// Analyze one cluster; `None` when it has fewer than 3 members
///
/// `batch_end` is the latest date of the analyzed batch and decides `active`.
pub fn analyze_cluster(
    members: &[&Transaction],
    batch_end: NaiveDate,
    calendar: &dyn WorkingDayCalendar,
    thresholds: &RuleThresholds,
) -> Result<Option<ClusterAnalysis>> {
    if members.len() < 3 {
        return Ok(None);
    }

    let mut sorted: Vec<&Transaction> = members.to_vec();
    sorted.sort_by_key(|t| (t.date, t.id));

    let dates: Vec<NaiveDate> = sorted.iter().map(|t| t.date).collect();
    let (first_occurrence, last_occurrence) = match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Ok(None),
    };

    let gaps = intervals(&dates);
    let mean_interval_days = stats::mean(&gaps);
    let interval_std_dev = stats::std_dev(&gaps);
    let frequency = classify_frequency(mean_interval_days);
    let temporal = classify_temporal_pattern(&dates, calendar, thresholds)?;

    let descriptions: Vec<&str> = sorted.iter().map(|t| t.description.as_str()).collect();
    let amounts: Vec<Decimal> = sorted.iter().map(|t| t.amount).collect();
    let amount_values: Vec<f64> = amounts.iter().map(|a| decimal_to_f64(*a)).collect();

    let expected_interval = if mean_interval_days > 0.0 {
        mean_interval_days
    } else {
        frequency.nominal_interval_days().unwrap_or(30.0)
    };
    let since_last = (batch_end - last_occurrence).num_days() as f64;

    Ok(Some(ClusterAnalysis {
        user_id: sorted[0].user_id,
        merchant_pattern: merchant_pattern(&descriptions[..]),
        frequency,
        temporal,
        amount: amount_stats(&amounts),
        amount_mean: stats::mean(&amount_values),
        amount_std_dev: stats::std_dev(&amount_values),
        mean_interval_days,
        interval_std_dev,
        transaction_ids: sorted.iter().map(|t| t.id).collect(),
        first_occurrence,
        last_occurrence,
        active: since_last <= 2.0 * expected_interval,
    }))
}
