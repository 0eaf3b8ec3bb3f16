//! Recurring charge detection pipeline
//!
//! Stages:
//! - Feature extraction: one weighted vector per transaction
//! - Clustering: density-based grouping of similar transactions
//! - Analysis: temporal classification and scoring of every cluster
//!
//! Results are deterministic for a given input order and configuration.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::analyze::{analyze_cluster, ClusterAnalysis};
use crate::calendar::{HolidayCalendar, WorkingDayCalendar, MAX_SUPPORTED_YEAR, MIN_SUPPORTED_YEAR};
use crate::cluster::{cluster, group_clusters};
use crate::config::DetectionConfig;
use crate::confidence::{score, ConfidenceBreakdown, ConfidenceInputs};
use crate::error::{Error, Result};
use crate::features::{extract_features, BatchContext};
use crate::models::{DetectionStage, Prediction, RecurringChargePattern, Transaction};
use crate::predict;
use crate::stats::round2;

/// Progress callback for detection stages
/// Parameters: (stage, percent complete)
pub type ProgressCallback = Box<dyn Fn(DetectionStage, u8) + Send + Sync>;

/// Per-call detection options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectOptions {
    /// Smallest cluster reported as a pattern (at least 3)
    pub min_occurrences: usize,
    /// Patterns scoring below this are discarded
    pub min_confidence: f64,
    /// Only transactions on or after this date are analyzed
    pub start_date: Option<NaiveDate>,
    /// Only transactions on or before this date are analyzed
    pub end_date: Option<NaiveDate>,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            min_occurrences: 3,
            min_confidence: 0.6,
            start_date: None,
            end_date: None,
        }
    }
}

impl DetectOptions {
    /// Options seeded from the configured thresholds
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            min_occurrences: config.min_occurrences,
            min_confidence: config.min_confidence,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_occurrences < 3 {
            return Err(Error::InvalidInput(format!(
                "min_occurrences must be at least 3, got {}",
                self.min_occurrences
            )));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::InvalidInput(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(Error::InvalidInput(format!(
                    "start_date {} is after end_date {}",
                    start, end
                )));
            }
        }
        Ok(())
    }

    fn includes(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |s| date >= s) && self.end_date.map_or(true, |e| date <= e)
    }
}

/// How a detection run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectionStatus {
    /// Every cluster was analyzed
    Complete,
    /// Too little history to look for patterns; not an error
    InsufficientHistory,
    /// Cancelled or past the deadline; patterns hold what finished before `stage`
    TimedOut { stage: DetectionStage },
}

/// Result of one detection run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Sorted by confidence (descending), merchant, first occurrence
    pub patterns: Vec<RecurringChargePattern>,
    pub status: DetectionStatus,
    /// Transactions left after date filtering
    pub transactions_analyzed: usize,
    pub clusters_found: usize,
    pub noise_points: usize,
}

impl DetectionReport {
    fn empty(status: DetectionStatus, transactions_analyzed: usize) -> Self {
        Self {
            patterns: Vec::new(),
            status,
            transactions_analyzed,
            clusters_found: 0,
            noise_points: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        !matches!(self.status, DetectionStatus::TimedOut { .. })
    }

    /// Patterns, or `ComputationTimeout` when the run did not finish
    pub fn into_result(self) -> Result<Vec<RecurringChargePattern>> {
        match self.status {
            DetectionStatus::TimedOut { stage } => Err(Error::ComputationTimeout { stage }),
            _ => Ok(self.patterns),
        }
    }
}

/// Cooperative cancellation: an explicit flag plus an optional deadline
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Recurring charge detector
pub struct RecurringChargeDetector<'a> {
    calendar: &'a dyn WorkingDayCalendar,
    config: DetectionConfig,
    progress: Option<&'a ProgressCallback>,
    cancellation: CancellationToken,
}

impl<'a> RecurringChargeDetector<'a> {
    pub fn new(calendar: &'a dyn WorkingDayCalendar) -> Self {
        Self::with_config(calendar, DetectionConfig::default())
    }

    pub fn with_config(calendar: &'a dyn WorkingDayCalendar, config: DetectionConfig) -> Self {
        Self {
            calendar,
            config,
            progress: None,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: &'a ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    fn report_progress(&self, stage: DetectionStage, percent: u8) {
        if let Some(cb) = self.progress {
            cb(stage, percent);
        }
    }

    /// Detect recurring charges in one user's transactions
    pub fn detect(
        &self,
        transactions: &[Transaction],
        options: &DetectOptions,
    ) -> Result<DetectionReport> {
        self.config.validate()?;
        options.validate()?;
        self.validate_batch(transactions)?;

        let batch: Vec<Transaction> = transactions
            .iter()
            .filter(|t| options.includes(t.date))
            .cloned()
            .collect();
        info!(
            "Detecting recurring charges in {} of {} transactions",
            batch.len(),
            transactions.len()
        );

        let months: BTreeSet<(i32, u32)> = batch.iter().map(|t| (t.date.year(), t.date.month())).collect();
        if months.len() < self.config.min_history_months || batch.len() < options.min_occurrences {
            info!(
                "Insufficient history: {} transactions over {} distinct months",
                batch.len(),
                months.len()
            );
            return Ok(DetectionReport::empty(
                DetectionStatus::InsufficientHistory,
                batch.len(),
            ));
        }

        // Feature extraction
        if let Some(report) = self.check_cancelled(DetectionStage::FeatureExtraction, batch.len()) {
            return Ok(report);
        }
        let ctx = BatchContext::fit(&batch, &self.config.features)?;
        let vectors = extract_features(&batch, &ctx, self.calendar)?;
        debug!(
            "Extracted {} feature vectors of width {}",
            vectors.len(),
            ctx.dimension()
        );
        self.report_progress(
            DetectionStage::FeatureExtraction,
            DetectionStage::FeatureExtraction.completion_percent(),
        );

        // Clustering
        if let Some(report) = self.check_cancelled(DetectionStage::Clustering, batch.len()) {
            return Ok(report);
        }
        let min_samples = self.config.clustering.min_samples(batch.len());
        let labels = cluster(&vectors, self.config.clustering.eps, min_samples);
        let groups = group_clusters(&labels);
        let noise_points = labels.iter().filter(|l| l.is_noise()).count();
        info!(
            "Found {} clusters ({} noise points, min_samples {})",
            groups.len(),
            noise_points,
            min_samples
        );
        self.report_progress(
            DetectionStage::Clustering,
            DetectionStage::Clustering.completion_percent(),
        );

        if groups.is_empty() {
            return Ok(DetectionReport {
                noise_points,
                ..DetectionReport::empty(DetectionStatus::InsufficientHistory, batch.len())
            });
        }

        // Analysis
        let batch_end = batch.iter().map(|t| t.date).max().unwrap_or(NaiveDate::MIN);
        let min_members = options.min_occurrences.max(3);
        let total_clusters = groups.len();
        let mut patterns = Vec::new();
        let mut status = DetectionStatus::Complete;

        for (done, (cluster_id, indices)) in groups.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                warn!(
                    "Detection cancelled after {} of {} clusters",
                    done, total_clusters
                );
                status = DetectionStatus::TimedOut {
                    stage: DetectionStage::Analysis,
                };
                break;
            }

            if indices.len() < min_members {
                debug!(
                    "Skipping cluster {} with {} members",
                    cluster_id,
                    indices.len()
                );
            } else {
                let members: Vec<&Transaction> = indices.iter().map(|&i| &batch[i]).collect();
                if let Some(pattern) = self.analyze(&members, batch_end, options)? {
                    patterns.push(pattern);
                }
            }

            let span = (DetectionStage::Analysis.completion_percent()
                - DetectionStage::Clustering.completion_percent()) as usize;
            let percent = DetectionStage::Clustering.completion_percent() as usize
                + span * (done + 1) / total_clusters;
            self.report_progress(DetectionStage::Analysis, percent as u8);
        }

        sort_patterns(&mut patterns);

        if status == DetectionStatus::Complete {
            self.report_progress(DetectionStage::Done, DetectionStage::Done.completion_percent());
        }
        info!("Detected {} recurring charges", patterns.len());

        Ok(DetectionReport {
            patterns,
            status,
            transactions_analyzed: batch.len(),
            clusters_found: total_clusters,
            noise_points,
        })
    }

    /// Upcoming occurrences of `pattern` using this detector's calendar
    pub fn predict_next(
        &self,
        pattern: &RecurringChargePattern,
        as_of: NaiveDate,
        count: usize,
    ) -> Result<Vec<Prediction>> {
        predict::predict_next(pattern, as_of, count, self.calendar)
    }

    fn check_cancelled(&self, stage: DetectionStage, analyzed: usize) -> Option<DetectionReport> {
        if self.cancellation.is_cancelled() {
            warn!("Detection cancelled before {}", stage);
            return Some(DetectionReport::empty(
                DetectionStatus::TimedOut { stage },
                analyzed,
            ));
        }
        None
    }

    fn validate_batch(&self, transactions: &[Transaction]) -> Result<()> {
        let first = transactions
            .first()
            .ok_or_else(|| Error::InvalidInput("no transactions provided".into()))?;

        if transactions.len() > self.config.max_batch_size {
            return Err(Error::InvalidInput(format!(
                "batch of {} transactions exceeds the limit of {}",
                transactions.len(),
                self.config.max_batch_size
            )));
        }

        let mut ids = HashSet::with_capacity(transactions.len());
        for tx in transactions {
            if tx.user_id != first.user_id {
                return Err(Error::InvalidInput(format!(
                    "transactions belong to more than one user ({} and {})",
                    first.user_id, tx.user_id
                )));
            }
            if !ids.insert(tx.id) {
                return Err(Error::InvalidInput(format!(
                    "duplicate transaction id {}",
                    tx.id
                )));
            }
            // Observed-holiday rules look one year ahead
            if !(MIN_SUPPORTED_YEAR..MAX_SUPPORTED_YEAR).contains(&tx.date.year()) {
                return Err(Error::InvalidInput(format!(
                    "transaction {} has unsupported date {}",
                    tx.id, tx.date
                )));
            }
        }
        Ok(())
    }

    fn analyze(
        &self,
        members: &[&Transaction],
        batch_end: NaiveDate,
        options: &DetectOptions,
    ) -> Result<Option<RecurringChargePattern>> {
        let Some(analysis) =
            analyze_cluster(members, batch_end, self.calendar, &self.config.thresholds)?
        else {
            return Ok(None);
        };

        let breakdown = score(
            &ConfidenceInputs {
                mean_interval: analysis.mean_interval_days,
                interval_std_dev: analysis.interval_std_dev,
                mean_amount: analysis.amount_mean,
                amount_std_dev: analysis.amount_std_dev,
                occurrences: analysis.transaction_ids.len(),
                temporal_consistency: analysis.temporal.consistency,
            },
            &self.config.confidence,
        );

        if breakdown.score < options.min_confidence {
            debug!(
                "Discarding {} ({}, {}): confidence {:.2} below {:.2}",
                analysis.merchant_pattern,
                analysis.frequency,
                analysis.temporal.pattern,
                breakdown.score,
                options.min_confidence
            );
            return Ok(None);
        }

        let pattern = build_pattern(analysis, &breakdown);
        check_invariants(&pattern)?;
        debug!(
            "Pattern {}: {} {} ({}) confidence {:.2}",
            pattern.id,
            pattern.merchant_pattern,
            pattern.frequency,
            pattern.temporal_pattern,
            pattern.confidence_score
        );
        Ok(Some(pattern))
    }
}

/// Detect with the default configuration and its holiday calendar
pub fn detect(transactions: &[Transaction], options: &DetectOptions) -> Result<DetectionReport> {
    let config = DetectionConfig::default();
    let calendar = HolidayCalendar::new(config.locale);
    RecurringChargeDetector::with_config(&calendar, config).detect(transactions, options)
}

/// Stable identifier: SHA-256 over user, merchant, pattern type and first occurrence
pub fn pattern_id(analysis: &ClusterAnalysis) -> String {
    let mut hasher = Sha256::new();
    hasher.update(analysis.user_id.to_le_bytes());
    hasher.update(analysis.merchant_pattern.as_bytes());
    hasher.update(b"|");
    hasher.update(analysis.temporal.pattern.kind().as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(analysis.first_occurrence.to_string().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}

fn build_pattern(analysis: ClusterAnalysis, breakdown: &ConfidenceBreakdown) -> RecurringChargePattern {
    let id = pattern_id(&analysis);
    RecurringChargePattern {
        id,
        user_id: analysis.user_id,
        frequency: analysis.frequency,
        temporal_pattern: analysis.temporal.pattern,
        amount: analysis.amount,
        mean_interval_days: round2(analysis.mean_interval_days),
        confidence_score: breakdown.score,
        temporal_consistency: round2(analysis.temporal.consistency),
        transaction_count: analysis.transaction_ids.len(),
        transaction_ids: analysis.transaction_ids,
        first_occurrence: analysis.first_occurrence,
        last_occurrence: analysis.last_occurrence,
        active: analysis.active,
        merchant_pattern: analysis.merchant_pattern,
    }
}

/// Every reported pattern has at least 3 members and a confidence in [0, 1]
fn check_invariants(pattern: &RecurringChargePattern) -> Result<()> {
    if pattern.transaction_count < 3 || pattern.transaction_count != pattern.transaction_ids.len() {
        return Err(Error::Internal(format!(
            "pattern {} has {} transactions ({} ids)",
            pattern.id,
            pattern.transaction_count,
            pattern.transaction_ids.len()
        )));
    }
    if !(0.0..=1.0).contains(&pattern.confidence_score) {
        return Err(Error::Internal(format!(
            "pattern {} has confidence {}",
            pattern.id, pattern.confidence_score
        )));
    }
    Ok(())
}

fn sort_patterns(patterns: &mut [RecurringChargePattern]) {
    patterns.sort_by(|a, b| {
        b.confidence_score
            .total_cmp(&a.confidence_score)
            .then_with(|| a.merchant_pattern.cmp(&b.merchant_pattern))
            .then_with(|| a.first_occurrence.cmp(&b.first_occurrence))
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::Locale;
    use crate::models::TemporalPattern;
    use crate::test_utils::{date, monthly_series, tx};
    use std::sync::Mutex;

    #[test]
    fn test_options_validation() {
        assert!(DetectOptions::default().validate().is_ok());
        let few = DetectOptions {
            min_occurrences: 2,
            ..Default::default()
        };
        assert!(matches!(few.validate(), Err(Error::InvalidInput(_))));
        let reversed = DetectOptions {
            start_date: Some(date("2024-06-01")),
            end_date: Some(date("2024-01-01")),
            ..Default::default()
        };
        assert!(matches!(reversed.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_cancellation_token() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        let shared = token.clone();
        shared.cancel();
        assert!(token.is_cancelled());

        assert!(CancellationToken::with_timeout(Duration::ZERO).is_cancelled());
        assert!(!CancellationToken::with_timeout(Duration::from_secs(3600)).is_cancelled());
    }

    #[test]
    fn test_into_result_maps_timeout() {
        let report = DetectionReport::empty(
            DetectionStatus::TimedOut {
                stage: DetectionStage::Clustering,
            },
            10,
        );
        assert!(!report.is_complete());
        assert!(matches!(
            report.into_result(),
            Err(Error::ComputationTimeout {
                stage: DetectionStage::Clustering
            })
        ));

        let done = DetectionReport::empty(DetectionStatus::InsufficientHistory, 0);
        assert!(done.into_result().unwrap().is_empty());
    }

    #[test]
    fn test_rejects_invalid_batches() {
        let options = DetectOptions::default();
        assert!(matches!(detect(&[], &options), Err(Error::InvalidInput(_))));

        let mut mixed = monthly_series(1, "NETFLIX", "-15.49", 2024, 1, 15, 3);
        mixed[1].user_id = 2;
        assert!(matches!(detect(&mixed, &options), Err(Error::InvalidInput(_))));

        let mut duplicated = monthly_series(1, "NETFLIX", "-15.49", 2024, 1, 15, 3);
        duplicated[2].id = 1;
        assert!(matches!(detect(&duplicated, &options), Err(Error::InvalidInput(_))));

        let ancient = vec![tx(1, "1500-01-01", "-1.00", "OLD")];
        assert!(matches!(detect(&ancient, &options), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_batch_ceiling() {
        let cal = HolidayCalendar::new(Locale::Us);
        let config = DetectionConfig {
            max_batch_size: 5,
            ..Default::default()
        };
        let txs = monthly_series(1, "NETFLIX", "-15.49", 2024, 1, 15, 6);
        let result = RecurringChargeDetector::with_config(&cal, config)
            .detect(&txs, &DetectOptions::default());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_progress_is_reported_in_order() {
        let cal = HolidayCalendar::new(Locale::Us);
        let seen: Arc<Mutex<Vec<(DetectionStage, u8)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress: ProgressCallback = Box::new(move |stage, percent| {
            sink.lock().unwrap().push((stage, percent));
        });

        let txs = monthly_series(1, "NETFLIX.COM", "-15.49", 2024, 1, 15, 12);
        let report = RecurringChargeDetector::new(&cal)
            .with_progress(&progress)
            .detect(&txs, &DetectOptions::default())
            .unwrap();
        assert_eq!(report.status, DetectionStatus::Complete);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.first(), Some(&(DetectionStage::FeatureExtraction, 20)));
        assert_eq!(seen[1], (DetectionStage::Clustering, 50));
        assert_eq!(seen.last(), Some(&(DetectionStage::Done, 100)));
        assert!(seen.windows(2).all(|w| w[0].1 <= w[1].1));
        assert!(seen.contains(&(DetectionStage::Analysis, 80)));
    }

    #[test]
    fn test_cancelled_before_start_reports_feature_stage() {
        let cal = HolidayCalendar::new(Locale::Us);
        let token = CancellationToken::new();
        token.cancel();
        let txs = monthly_series(1, "NETFLIX.COM", "-15.49", 2024, 1, 15, 12);
        let report = RecurringChargeDetector::new(&cal)
            .with_cancellation(token)
            .detect(&txs, &DetectOptions::default())
            .unwrap();
        assert_eq!(
            report.status,
            DetectionStatus::TimedOut {
                stage: DetectionStage::FeatureExtraction
            }
        );
        assert!(report.patterns.is_empty());
    }

    #[test]
    fn test_cancelled_during_analysis_keeps_partial_patterns() {
        let cal = HolidayCalendar::new(Locale::Us);
        let token = CancellationToken::new();
        let trigger = token.clone();
        let seen: Arc<Mutex<Vec<(DetectionStage, u8)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let progress: ProgressCallback = Box::new(move |stage, percent| {
            if stage == DetectionStage::Analysis {
                trigger.cancel();
            }
            sink.lock().unwrap().push((stage, percent));
        });

        let mut txs = monthly_series(1, "NETFLIX.COM", "-15.49", 2024, 1, 15, 12);
        txs.extend(monthly_series(100, "CITY WATER UTILITY", "-61.20", 2024, 1, 3, 12));
        txs.extend(monthly_series(200, "PARKSIDE RENT", "-1450.00", 2024, 1, 28, 12));
        txs.extend(monthly_series(300, "IRONWORKS GYM", "-39.00", 2024, 1, 9, 12));

        let report = RecurringChargeDetector::new(&cal)
            .with_progress(&progress)
            .with_cancellation(token)
            .detect(&txs, &DetectOptions::default())
            .unwrap();

        assert_eq!(
            report.status,
            DetectionStatus::TimedOut {
                stage: DetectionStage::Analysis
            }
        );
        assert_eq!(report.clusters_found, 4);
        assert_eq!(report.patterns.len(), 1);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].0, DetectionStage::Analysis);
        assert!(!seen.iter().any(|(stage, _)| *stage == DetectionStage::Done));
    }

    struct UnconfiguredCalendar;

    impl WorkingDayCalendar for UnconfiguredCalendar {
        fn is_holiday(&self, _date: NaiveDate) -> Result<bool> {
            Err(Error::Configuration("no holiday rules loaded".into()))
        }
    }

    #[test]
    fn test_calendar_errors_reach_the_caller() {
        let txs = monthly_series(1, "NETFLIX.COM", "-15.49", 2024, 1, 15, 12);
        let result = RecurringChargeDetector::new(&UnconfiguredCalendar)
            .detect(&txs, &DetectOptions::default());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_pattern_ids_are_stable_and_distinct() {
        let txs = {
            let mut all = monthly_series(1, "NETFLIX.COM", "-15.49", 2024, 1, 15, 12);
            all.extend(monthly_series(100, "CITY WATER UTILITY", "-61.20", 2024, 1, 3, 12));
            all
        };
        let first = detect(&txs, &DetectOptions::default()).unwrap();
        let second = detect(&txs, &DetectOptions::default()).unwrap();
        assert_eq!(first, second);

        let ids: HashSet<&str> = first.patterns.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), first.patterns.len());
        assert!(first.patterns.iter().all(|p| p.id.len() == 16));
    }

    #[test]
    fn test_detector_predicts_with_its_calendar() {
        let cal = HolidayCalendar::new(Locale::Us);
        let detector = RecurringChargeDetector::new(&cal);
        let txs = monthly_series(1, "NETFLIX.COM", "-15.49", 2024, 1, 15, 12);
        let report = detector.detect(&txs, &DetectOptions::default()).unwrap();
        let pattern = &report.patterns[0];
        assert_eq!(pattern.temporal_pattern, TemporalPattern::DayOfMonth { day: 15 });

        let next = detector.predict_next(pattern, date("2024-12-20"), 2).unwrap();
        assert_eq!(next[0].expected_date, date("2025-01-15"));
        assert_eq!(next[1].expected_date, date("2025-02-15"));
    }

    #[test]
    fn test_check_invariants() {
        let txs = monthly_series(1, "NETFLIX.COM", "-15.49", 2024, 1, 15, 12);
        let mut pattern = detect(&txs, &DetectOptions::default()).unwrap().patterns.remove(0);
        assert!(check_invariants(&pattern).is_ok());

        pattern.confidence_score = 1.5;
        assert!(matches!(check_invariants(&pattern), Err(Error::Internal(_))));

        pattern.confidence_score = 0.9;
        pattern.transaction_ids.truncate(2);
        pattern.transaction_count = 2;
        assert!(matches!(check_invariants(&pattern), Err(Error::Internal(_))));
    }
}
