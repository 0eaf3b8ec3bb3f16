//! Detection configuration
//!
//! Loaded from TOML. Every section and field is optional; missing values keep
//! their defaults:
//!
//! ```toml
//! locale = "gb"
//! min_confidence = 0.7
//!
//! [clustering]
//! eps = 0.4
//!
//! [thresholds]
//! day_of_month_pct = 65
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::analyze::RuleThresholds;
use crate::calendar::Locale;
use crate::cluster::ClusterConfig;
use crate::confidence::ConfidenceWeights;
use crate::error::{Error, Result};
use crate::features::FeatureConfig;

/// Detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Holiday rules used for working-day decisions
    pub locale: Locale,
    /// Patterns scoring below this are discarded
    pub min_confidence: f64,
    /// Minimum cluster size reported as a pattern (never below 3)
    pub min_occurrences: usize,
    /// Distinct calendar months required before detection runs
    pub min_history_months: usize,
    /// Largest accepted batch; bigger inputs are rejected outright
    pub max_batch_size: usize,
    pub clustering: ClusterConfig,
    pub features: FeatureConfig,
    pub thresholds: RuleThresholds,
    pub confidence: ConfidenceWeights,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            locale: Locale::Us,
            min_confidence: 0.6,
            min_occurrences: 3,
            min_history_months: 3,
            max_batch_size: 50_000,
            clustering: ClusterConfig::default(),
            features: FeatureConfig::default(),
            thresholds: RuleThresholds::default(),
            confidence: ConfidenceWeights::default(),
        }
    }
}

impl DetectionConfig {
    /// Parse and validate TOML content
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::Configuration(format!("Invalid config TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::Configuration(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.min_occurrences < 3 {
            return Err(Error::Configuration(format!(
                "min_occurrences must be at least 3, got {}",
                self.min_occurrences
            )));
        }
        if self.max_batch_size == 0 {
            return Err(Error::Configuration(
                "max_batch_size must be positive".into(),
            ));
        }
        self.clustering.validate()?;
        self.features.validate()?;
        self.thresholds.validate()?;
        self.confidence.validate()
    }
}

/// Default config location: `<config dir>/recur/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("recur").join("config.toml"))
}

/// Load configuration (override first, then the default location, then built-ins)
pub fn load_config(override_path: Option<&Path>) -> Result<DetectionConfig> {
    if let Some(path) = override_path {
        if path.exists() {
            return read_config(path);
        }
        warn!("Config file {} not found, using defaults", path.display());
        return Ok(DetectionConfig::default());
    }

    match default_config_path() {
        Some(path) if path.exists() => read_config(&path),
        _ => Ok(DetectionConfig::default()),
    }
}

fn read_config(path: &Path) -> Result<DetectionConfig> {
    debug!("Loading config from {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!("Failed to read {}: {}", path.display(), e))
    })?;
    DetectionConfig::from_toml_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = DetectionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.features.dimension(), 67);
        assert_eq!(config.clustering.eps, 0.5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = DetectionConfig::from_toml_str(
            r#"
            locale = "gb"
            min_confidence = 0.75

            [clustering]
            eps = 0.4

            [thresholds]
            day_of_month_pct = 65
            "#,
        )
        .unwrap();

        assert_eq!(config.locale, Locale::Gb);
        assert_eq!(config.min_confidence, 0.75);
        assert_eq!(config.clustering.eps, 0.4);
        assert_eq!(config.clustering.min_samples_floor, 3);
        assert_eq!(config.thresholds.day_of_month_pct, 65);
        assert_eq!(config.thresholds.last_working_day_pct, 70);
        assert_eq!(config.max_batch_size, 50_000);
    }

    #[test]
    fn test_invalid_toml_is_configuration_error() {
        assert!(matches!(
            DetectionConfig::from_toml_str("min_confidence = ["),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            DetectionConfig::from_toml_str(r#"locale = "mars""#),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            DetectionConfig::from_toml_str("min_confidence = 1.5"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            DetectionConfig::from_toml_str("min_occurrences = 2"),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "min_history_months = 6").unwrap();
        writeln!(file, "[confidence]").unwrap();
        writeln!(file, "interval = 0.4").unwrap();
        writeln!(file, "temporal = 0.2").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.min_history_months, 6);
        assert_eq!(config.confidence.interval, 0.4);
        assert_eq!(config.confidence.amount, 0.2);
    }

    #[test]
    fn test_missing_override_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(dir.path().join("absent.toml").as_path())).unwrap();
        assert_eq!(config, DetectionConfig::default());
    }
}
