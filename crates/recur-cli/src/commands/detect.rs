//! Detect command implementation

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use recur_core::{
    CancellationToken, DetectOptions, DetectionConfig, DetectionReport, DetectionStatus,
    HolidayCalendar, ProgressCallback, RecurringChargeDetector, Transaction,
};
use serde_json::json;
use tracing::{debug, warn};

use super::{parse_date_arg, read_transactions, split_by_user, truncate};

/// Detection options from the config, overridden by command-line flags
pub fn build_options(
    config: &DetectionConfig,
    min_confidence: Option<f64>,
    min_occurrences: Option<usize>,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<DetectOptions> {
    let mut options = DetectOptions::from_config(config);
    if let Some(min_confidence) = min_confidence {
        options.min_confidence = min_confidence;
    }
    if let Some(min_occurrences) = min_occurrences {
        options.min_occurrences = min_occurrences;
    }
    options.start_date = from.map(|s| parse_date_arg(s, "--from")).transpose()?;
    options.end_date = to.map(|s| parse_date_arg(s, "--to")).transpose()?;

    options.validate().context("Invalid detection options")?;
    Ok(options)
}

/// Run detection separately for every user in `transactions`
///
/// The timeout covers the whole run, not each user.
pub fn run_detection(
    config: &DetectionConfig,
    transactions: Vec<Transaction>,
    options: &DetectOptions,
    timeout: Option<Duration>,
) -> Result<Vec<(i64, DetectionReport)>> {
    let calendar = HolidayCalendar::new(config.locale);
    let progress: ProgressCallback =
        Box::new(|stage, percent| debug!("Detection progress: {} {}%", stage, percent));
    let token = match timeout {
        Some(t) => CancellationToken::with_timeout(t),
        None => CancellationToken::new(),
    };

    let detector = RecurringChargeDetector::with_config(&calendar, config.clone())
        .with_progress(&progress)
        .with_cancellation(token);

    let mut reports = Vec::new();
    for (user_id, batch) in split_by_user(transactions) {
        let report = detector
            .detect(&batch, options)
            .with_context(|| format!("Detection failed for user {}", user_id))?;
        reports.push((user_id, report));
    }
    Ok(reports)
}

pub fn cmd_detect(
    config: &DetectionConfig,
    file: &Path,
    options: &DetectOptions,
    timeout: Option<Duration>,
    json: bool,
) -> Result<()> {
    let transactions = read_transactions(file)?;
    let reports = run_detection(config, transactions, options, timeout)?;

    if json {
        let output: Vec<_> = reports
            .iter()
            .map(|(user_id, report)| json!({ "user_id": user_id, "report": report }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for (user_id, report) in &reports {
        print_report(*user_id, report);
    }
    Ok(())
}

fn print_report(user_id: i64, report: &DetectionReport) {
    println!();
    println!(
        "🔁 Recurring Charges (user {}, {} transactions)",
        user_id, report.transactions_analyzed
    );
    println!("   ─────────────────────────────────────────────────────────────");

    match report.status {
        DetectionStatus::InsufficientHistory => {
            println!("   Not enough history to detect recurring charges.");
            println!("   Provide at least three months of transactions.");
            return;
        }
        DetectionStatus::TimedOut { stage } => {
            warn!("Detection timed out during {}", stage);
            println!("   ⏱️  Timed out during {}; showing finished results", stage);
        }
        DetectionStatus::Complete => {}
    }

    if report.patterns.is_empty() {
        println!("   No recurring charges found.");
        return;
    }

    for p in &report.patterns {
        let status_icon = if p.active { "✅" } else { "💤" };
        println!(
            "   {} {:24} │ {:>10.2} │ {:<11} │ {:<28} │ {:.2}",
            status_icon,
            truncate(&p.merchant_pattern, 24),
            p.amount.mean,
            p.frequency.as_str(),
            truncate(&p.temporal_pattern.to_string(), 28),
            p.confidence_score
        );
    }

    println!(
        "   {} clusters, {} unclustered transactions",
        report.clusters_found, report.noise_points
    );
}
