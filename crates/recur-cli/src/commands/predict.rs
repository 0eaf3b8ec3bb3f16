//! Predict command implementation

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use recur_core::{
    DetectOptions, DetectionConfig, HolidayCalendar, Prediction, RecurringChargeDetector,
    RecurringChargePattern, Transaction,
};
use serde_json::json;
use tracing::info;

use super::{parse_date_arg, read_transactions, split_by_user, truncate};

/// Detect patterns per user and predict the next `count` occurrences of each
///
/// Without `as_of`, each user's latest transaction date is the reference.
pub fn run_predictions(
    config: &DetectionConfig,
    transactions: Vec<Transaction>,
    as_of: Option<NaiveDate>,
    count: usize,
) -> Result<Vec<(RecurringChargePattern, Vec<Prediction>)>> {
    let calendar = HolidayCalendar::new(config.locale);
    let detector = RecurringChargeDetector::with_config(&calendar, config.clone());
    let options = DetectOptions::from_config(config);

    let mut results = Vec::new();
    for (user_id, batch) in split_by_user(transactions) {
        let reference = match as_of.or_else(|| batch.iter().map(|t| t.date).max()) {
            Some(d) => d,
            None => continue,
        };
        let report = detector
            .detect(&batch, &options)
            .with_context(|| format!("Detection failed for user {}", user_id))?;
        info!(
            "User {}: {} patterns, predicting from {}",
            user_id,
            report.patterns.len(),
            reference
        );

        for pattern in report.patterns {
            let predictions = detector
                .predict_next(&pattern, reference, count)
                .with_context(|| format!("Prediction failed for {}", pattern.merchant_pattern))?;
            results.push((pattern, predictions));
        }
    }

    // Soonest first
    results.sort_by(|a, b| {
        let first = |r: &(RecurringChargePattern, Vec<Prediction>)| {
            r.1.first().map(|p| p.expected_date)
        };
        first(a)
            .cmp(&first(b))
            .then_with(|| a.0.merchant_pattern.cmp(&b.0.merchant_pattern))
    });
    Ok(results)
}

pub fn cmd_predict(
    config: &DetectionConfig,
    file: &Path,
    as_of: Option<&str>,
    count: usize,
    json: bool,
) -> Result<()> {
    let as_of = as_of.map(|s| parse_date_arg(s, "--as-of")).transpose()?;
    let transactions = read_transactions(file)?;
    let results = run_predictions(config, transactions, as_of, count)?;

    if json {
        let output: Vec<_> = results
            .iter()
            .map(|(pattern, predictions)| {
                json!({
                    "pattern_id": pattern.id,
                    "user_id": pattern.user_id,
                    "merchant": pattern.merchant_pattern,
                    "frequency": pattern.frequency,
                    "predictions": predictions,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No recurring charges detected, nothing to predict.");
        return Ok(());
    }

    println!();
    println!("🔮 Upcoming Charges");
    println!("   ─────────────────────────────────────────────────────────────");

    for (pattern, predictions) in &results {
        for p in predictions {
            println!(
                "   {:24} │ {} │ {:>10.2} ({:.2} to {:.2}) │ in {:>3} days │ {:.2}",
                truncate(&pattern.merchant_pattern, 24),
                p.expected_date,
                p.expected_amount,
                p.amount_low,
                p.amount_high,
                p.days_until,
                p.confidence
            );
        }
    }

    Ok(())
}
