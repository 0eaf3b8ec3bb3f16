//! Confidence scoring for recurring charge candidates

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stats::round2;

/// Occurrence count at which the sample size stops adding confidence
const FULL_SAMPLE_SIZE: f64 = 12.0;

/// Weights of the four regularity measures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceWeights {
    pub interval: f64,
    pub amount: f64,
    pub sample_size: f64,
    pub temporal: f64,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            interval: 0.30,
            amount: 0.20,
            sample_size: 0.20,
            temporal: 0.30,
        }
    }
}

impl ConfidenceWeights {
    pub fn validate(&self) -> Result<()> {
        let weights = [self.interval, self.amount, self.sample_size, self.temporal];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::Configuration(
                "confidence weights must be non-negative numbers".into(),
            ));
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(Error::Configuration(format!(
                "confidence weights must sum to 1.0, got {:.4}",
                total
            )));
        }
        Ok(())
    }
}

/// Raw regularity facts of one candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInputs {
    pub mean_interval: f64,
    pub interval_std_dev: f64,
    pub mean_amount: f64,
    pub amount_std_dev: f64,
    pub occurrences: usize,
    pub temporal_consistency: f64,
}

/// Per-measure scores and the weighted total
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceBreakdown {
    pub interval_regularity: f64,
    pub amount_regularity: f64,
    pub sample_size: f64,
    pub temporal_consistency: f64,
    /// Weighted sum, clamped to [0, 1] and rounded to 2 decimals
    pub score: f64,
}

/// `1 / (1 + sd / (|mean| + 1))`: 1 for no spread, towards 0 as spread grows
pub fn regularity(mean: f64, std_dev: f64) -> f64 {
    1.0 / (1.0 + std_dev / (mean.abs() + 1.0))
}

pub fn sample_size_score(occurrences: usize) -> f64 {
    (occurrences as f64 / FULL_SAMPLE_SIZE).min(1.0)
}

pub fn score(inputs: &ConfidenceInputs, weights: &ConfidenceWeights) -> ConfidenceBreakdown {
    let interval = regularity(inputs.mean_interval, inputs.interval_std_dev);
    let amount = regularity(inputs.mean_amount, inputs.amount_std_dev);
    let sample = sample_size_score(inputs.occurrences);
    let temporal = inputs.temporal_consistency.clamp(0.0, 1.0);

    let weighted = weights.interval * interval
        + weights.amount * amount
        + weights.sample_size * sample
        + weights.temporal * temporal;
    let score = if weighted.is_finite() {
        round2(weighted.clamp(0.0, 1.0))
    } else {
        0.0
    };

    ConfidenceBreakdown {
        interval_regularity: interval,
        amount_regularity: amount,
        sample_size: sample,
        temporal_consistency: temporal,
        score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(interval_sd: f64, amount_sd: f64, n: usize, temporal: f64) -> ConfidenceInputs {
        ConfidenceInputs {
            mean_interval: 30.4,
            interval_std_dev: interval_sd,
            mean_amount: -15.49,
            amount_std_dev: amount_sd,
            occurrences: n,
            temporal_consistency: temporal,
        }
    }

    #[test]
    fn test_perfect_series_scores_one() {
        let b = score(&inputs(0.0, 0.0, 12, 1.0), &ConfidenceWeights::default());
        assert_eq!(b.score, 1.0);
        assert_eq!(b.sample_size, 1.0);
    }

    #[test]
    fn test_twelve_monthly_occurrences_score_high() {
        // Calendar-month intervals of 29-31 days have a std dev around 0.8
        let b = score(&inputs(0.8, 0.0, 12, 1.0), &ConfidenceWeights::default());
        assert!(b.score >= 0.95, "score was {}", b.score);
    }

    #[test]
    fn test_more_occurrences_never_lower_confidence() {
        let weights = ConfidenceWeights::default();
        let mut previous = 0.0;
        for n in 3..=24 {
            let s = score(&inputs(1.0, 0.5, n, 0.9), &weights).score;
            assert!(s >= previous);
            previous = s;
        }
    }

    #[test]
    fn test_irregularity_lowers_confidence() {
        let weights = ConfidenceWeights::default();
        let steady = score(&inputs(0.5, 0.0, 6, 1.0), &weights).score;
        let erratic = score(&inputs(20.0, 10.0, 6, 0.6), &weights).score;
        assert!(erratic < steady);
        assert!((0.0..=1.0).contains(&erratic));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        assert!(ConfidenceWeights::default().validate().is_ok());
        let bad = ConfidenceWeights {
            temporal: 0.5,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(Error::Configuration(_))));
    }
}
