//! Recur Core Library
//!
//! Recurring charge detection for a single user's transaction history:
//! - Holiday-aware working-day calendar (US federal, England bank holidays)
//! - Feature engineering (cyclical calendar encoding, amounts, TF-IDF descriptions)
//! - Density-based clustering of similar transactions
//! - Temporal pattern classification and confidence scoring
//! - Prediction of upcoming occurrences
//! - CSV import and TOML configuration

pub mod analyze;
pub mod calendar;
pub mod cluster;
pub mod confidence;
pub mod config;
pub mod detect;
pub mod error;
pub mod features;
pub mod import;
pub mod models;
pub mod predict;
pub mod stats;

/// Synthetic transaction builders for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use calendar::{Holiday, HolidayCalendar, Locale, WorkingDayCalendar};
pub use config::{load_config, DetectionConfig};
pub use detect::{
    detect, CancellationToken, DetectOptions, DetectionReport, DetectionStatus, ProgressCallback,
    RecurringChargeDetector,
};
pub use error::{Error, Result};
pub use models::{
    AmountStats, DetectionStage, Frequency, Prediction, RecurringChargePattern, TemporalPattern,
    TemporalPatternType, Transaction,
};
pub use predict::predict_next;
