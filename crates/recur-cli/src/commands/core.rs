//! Shared command utilities
//!
//! - `load_settings` - Config file plus command-line overrides
//! - `read_transactions` - CSV loading
//! - `split_by_user` - Per-user batches for detection

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use recur_core::{import::parse_csv, load_config, DetectionConfig, Locale, Transaction};
use tracing::debug;

/// Load the detection config, applying `--locale` on top of it
pub fn load_settings(config_path: Option<&Path>, locale: Option<&str>) -> Result<DetectionConfig> {
    let mut config = load_config(config_path).context("Failed to load configuration")?;
    if let Some(locale) = locale {
        config.locale = locale.parse::<Locale>().context("Invalid --locale")?;
    }
    debug!("Using holiday locale {}", config.locale);
    Ok(config)
}

/// Parse a YYYY-MM-DD command-line date
pub fn parse_date_arg(value: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid {} format (use YYYY-MM-DD): {}", flag, value))
}

pub fn read_transactions(path: &Path) -> Result<Vec<Transaction>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let transactions =
        parse_csv(file).with_context(|| format!("Failed to parse {}", path.display()))?;

    if transactions.is_empty() {
        anyhow::bail!("No transactions found in {}", path.display());
    }
    Ok(transactions)
}

/// Group transactions by user; detection runs on one user's history at a time
pub fn split_by_user(transactions: Vec<Transaction>) -> BTreeMap<i64, Vec<Transaction>> {
    let mut users: BTreeMap<i64, Vec<Transaction>> = BTreeMap::new();
    for tx in transactions {
        users.entry(tx.user_id).or_default().push(tx);
    }
    users
}
