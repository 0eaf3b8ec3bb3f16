//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::time::Duration;

use chrono::{NaiveDate, Weekday};
use recur_core::test_utils::{last_weekday_series, monthly_series};
use recur_core::{
    DetectOptions, DetectionConfig, DetectionStatus, Locale, TemporalPattern, Transaction,
};
use tempfile::NamedTempFile;

use crate::commands::{self, truncate};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Write transactions as a CSV file with every supported column
fn write_csv(transactions: &[Transaction]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "id,date,amount,description,user_id").unwrap();
    for t in transactions {
        writeln!(
            file,
            "{},{},{},{},{}",
            t.id, t.date, t.amount, t.description, t.user_id
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}

fn subscription_history() -> Vec<Transaction> {
    let mut txs = monthly_series(1, "NETFLIX.COM", "-15.49", 2024, 1, 15, 12);
    txs.extend(last_weekday_series(
        100,
        "ACME CORP PAYROLL",
        "3500.00",
        2024,
        1,
        Weekday::Thu,
        12,
    ));
    txs
}

// ========== Shared Utility Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("NETFLIX", 10), "NETFLIX");
    assert_eq!(truncate("ACME CORP PAYROLL", 10), "ACME CO...");
    assert_eq!(truncate("CAFÉ CRÈME", 7), "CAFÉ...");
}

#[test]
fn test_parse_date_arg() {
    assert_eq!(
        commands::parse_date_arg("2024-03-01", "--from").unwrap(),
        date("2024-03-01")
    );
    let err = commands::parse_date_arg("03/01/2024", "--from").unwrap_err();
    assert!(err.to_string().contains("--from"));
}

#[test]
fn test_read_transactions() {
    let file = write_csv(&subscription_history());
    let txs = commands::read_transactions(file.path()).unwrap();
    assert_eq!(txs.len(), 24);
    assert_eq!(txs[0].description, "NETFLIX.COM");
}

#[test]
fn test_read_transactions_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = commands::read_transactions(&dir.path().join("absent.csv"));
    assert!(missing.unwrap_err().to_string().contains("Failed to open"));

    let empty = write_csv(&[]);
    let result = commands::read_transactions(empty.path());
    assert!(result.unwrap_err().to_string().contains("No transactions"));
}

#[test]
fn test_split_by_user() {
    let mut txs = subscription_history();
    for t in txs.iter_mut().filter(|t| t.id >= 100) {
        t.user_id = 2;
    }
    let users = commands::split_by_user(txs);
    assert_eq!(users.len(), 2);
    assert_eq!(users[&1].len(), 12);
    assert_eq!(users[&2].len(), 12);
}

#[test]
fn test_load_settings_with_locale_override() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "min_confidence = 0.8").unwrap();
    file.flush().unwrap();

    let config = commands::load_settings(Some(file.path()), Some("gb")).unwrap();
    assert_eq!(config.min_confidence, 0.8);
    assert_eq!(config.locale, Locale::Gb);

    assert!(commands::load_settings(Some(file.path()), Some("mars")).is_err());
}

#[test]
fn test_load_settings_rejects_invalid_config() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "min_occurrences = 1").unwrap();
    file.flush().unwrap();

    let err = commands::load_settings(Some(file.path()), None).unwrap_err();
    assert!(err.to_string().contains("configuration"));
}

// ========== Detect Command Tests ==========

#[test]
fn test_build_options_overrides_config() {
    let config = DetectionConfig::default();
    let options = commands::build_options(
        &config,
        Some(0.9),
        Some(4),
        Some("2024-02-01"),
        Some("2024-11-30"),
    )
    .unwrap();
    assert_eq!(options.min_confidence, 0.9);
    assert_eq!(options.min_occurrences, 4);
    assert_eq!(options.start_date, Some(date("2024-02-01")));
    assert_eq!(options.end_date, Some(date("2024-11-30")));

    let defaults = commands::build_options(&config, None, None, None, None).unwrap();
    assert_eq!(defaults, DetectOptions::from_config(&config));
}

#[test]
fn test_build_options_rejects_invalid_values() {
    let config = DetectionConfig::default();
    assert!(commands::build_options(&config, Some(1.2), None, None, None).is_err());
    assert!(commands::build_options(&config, None, Some(2), None, None).is_err());
    assert!(commands::build_options(&config, None, None, Some("2024-06-01"), Some("2024-01-01")).is_err());
    assert!(commands::build_options(&config, None, None, Some("June"), None).is_err());
}

#[test]
fn test_run_detection() {
    let config = DetectionConfig::default();
    let reports = commands::run_detection(
        &config,
        subscription_history(),
        &DetectOptions::default(),
        None,
    )
    .unwrap();

    assert_eq!(reports.len(), 1);
    let (user_id, report) = &reports[0];
    assert_eq!(*user_id, 1);
    assert_eq!(report.status, DetectionStatus::Complete);
    assert_eq!(report.patterns.len(), 2);
    assert!(report.patterns.iter().any(|p| p.temporal_pattern
        == TemporalPattern::LastWeekdayOfMonth {
            weekday: Weekday::Thu
        }));
}

#[test]
fn test_run_detection_per_user() {
    let mut txs = subscription_history();
    for t in txs.iter_mut().filter(|t| t.id >= 100) {
        t.user_id = 7;
    }
    let reports = commands::run_detection(
        &DetectionConfig::default(),
        txs,
        &DetectOptions::default(),
        None,
    )
    .unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|(_, r)| r.patterns.len() == 1));
    assert_eq!(reports[1].1.patterns[0].user_id, 7);
}

#[test]
fn test_run_detection_with_expired_timeout() {
    let reports = commands::run_detection(
        &DetectionConfig::default(),
        subscription_history(),
        &DetectOptions::default(),
        Some(Duration::ZERO),
    )
    .unwrap();
    assert!(matches!(
        reports[0].1.status,
        DetectionStatus::TimedOut { .. }
    ));
}

#[test]
fn test_cmd_detect() {
    let file = write_csv(&subscription_history());
    let config = DetectionConfig::default();
    let options = DetectOptions::default();

    assert!(commands::cmd_detect(&config, file.path(), &options, None, false).is_ok());
    assert!(commands::cmd_detect(&config, file.path(), &options, None, true).is_ok());
}

#[test]
fn test_cmd_detect_insufficient_history() {
    let file = write_csv(&monthly_series(1, "NETFLIX.COM", "-15.49", 2024, 1, 15, 2));
    let result = commands::cmd_detect(
        &DetectionConfig::default(),
        file.path(),
        &DetectOptions::default(),
        None,
        false,
    );
    assert!(result.is_ok());
}

// ========== Predict Command Tests ==========

#[test]
fn test_run_predictions_defaults_to_latest_transaction() {
    let results = commands::run_predictions(
        &DetectionConfig::default(),
        subscription_history(),
        None,
        2,
    )
    .unwrap();

    assert_eq!(results.len(), 2);
    // Latest transaction is the Dec 26 salary; Netflix is due first
    let (netflix, predictions) = &results[0];
    assert!(netflix.merchant_pattern.contains("NETFLIX"));
    assert_eq!(predictions[0].expected_date, date("2025-01-15"));
    assert_eq!(predictions[1].expected_date, date("2025-02-15"));

    let (salary, predictions) = &results[1];
    assert!(salary.merchant_pattern.contains("PAYROLL"));
    assert_eq!(predictions[0].expected_date, date("2025-01-30"));
}

#[test]
fn test_run_predictions_with_as_of() {
    let results = commands::run_predictions(
        &DetectionConfig::default(),
        subscription_history(),
        Some(date("2025-02-01")),
        1,
    )
    .unwrap();

    let netflix = results
        .iter()
        .find(|(p, _)| p.merchant_pattern.contains("NETFLIX"))
        .unwrap();
    assert_eq!(netflix.1[0].expected_date, date("2025-02-15"));
    assert_eq!(netflix.1[0].days_until, 14);
}

#[test]
fn test_cmd_predict() {
    let file = write_csv(&subscription_history());
    let config = DetectionConfig::default();

    assert!(commands::cmd_predict(&config, file.path(), None, 3, false).is_ok());
    assert!(commands::cmd_predict(&config, file.path(), Some("2025-01-01"), 1, true).is_ok());
    assert!(commands::cmd_predict(&config, file.path(), Some("soon"), 1, false).is_err());
    assert!(commands::cmd_predict(&config, file.path(), None, 0, false).is_err());
}

// ========== Holidays Command Tests ==========

#[test]
fn test_cmd_holidays() {
    assert!(commands::cmd_holidays(Locale::Us, 2025).is_ok());
    assert!(commands::cmd_holidays(Locale::Gb, 2025).is_ok());
    assert!(commands::cmd_holidays(Locale::None, 2025).is_ok());
}

#[test]
fn test_cmd_holidays_unsupported_year() {
    let result = commands::cmd_holidays(Locale::Us, 1200);
    assert!(result.is_err());
}
