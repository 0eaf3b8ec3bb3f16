//! Feature engineering
//!
//! Every transaction becomes one fixed-width vector:
//!
//! ```text
//! [ temporal (17) | amount (1) | description (description_width) ]
//! ```
//!
//! Each block is multiplied by its configured weight, so the Euclidean
//! distance used by the clustering engine can favour merchant and amount
//! similarity over calendar position. The calendar position is still
//! recovered later by the pattern analyzer.

pub mod amount;
pub mod temporal;
pub mod text;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::calendar::WorkingDayCalendar;
use crate::error::{Error, Result};
use crate::models::Transaction;

pub use amount::{extract_amount_features, log_scale, AmountScaler, AMOUNT_WIDTH};
pub use temporal::{cyclical_encode, extract_temporal_features, month_position, TEMPORAL_WIDTH};
pub use text::DescriptionVectorizer;

/// Feature vector of one transaction
pub type FeatureVector = Vec<f64>;

/// Feature layout and block weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Width of the description block (vocabulary is truncated/padded to it)
    pub description_width: usize,
    pub temporal_weight: f64,
    pub amount_weight: f64,
    pub description_weight: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            description_width: 49,
            temporal_weight: 0.1,
            amount_weight: 1.0,
            description_weight: 1.0,
        }
    }
}

impl FeatureConfig {
    /// Total vector width (67 with the defaults)
    pub fn dimension(&self) -> usize {
        TEMPORAL_WIDTH + AMOUNT_WIDTH + self.description_width
    }

    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("temporal_weight", self.temporal_weight),
            ("amount_weight", self.amount_weight),
            ("description_weight", self.description_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(Error::Configuration(format!(
                    "features.{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }
}

/// Batch-level statistics every feature vector of one run depends on
#[derive(Debug, Clone)]
pub struct BatchContext {
    config: FeatureConfig,
    vectorizer: DescriptionVectorizer,
    amount_scaler: AmountScaler,
}

impl BatchContext {
    /// Fit vocabulary and amount normalization on the batch
    pub fn fit(transactions: &[Transaction], config: &FeatureConfig) -> Result<Self> {
        let descriptions: Vec<&str> = transactions
            .iter()
            .map(|t| t.description.as_str())
            .collect();
        let amounts: Vec<_> = transactions.iter().map(|t| t.amount).collect();

        Ok(Self {
            config: config.clone(),
            vectorizer: DescriptionVectorizer::fit(&descriptions[..], config.description_width)?,
            amount_scaler: AmountScaler::fit(&amounts),
        })
    }

    pub fn dimension(&self) -> usize {
        TEMPORAL_WIDTH + AMOUNT_WIDTH + self.vectorizer.width()
    }

    pub fn vectorizer(&self) -> &DescriptionVectorizer {
        &self.vectorizer
    }

    pub fn amount_scaler(&self) -> &AmountScaler {
        &self.amount_scaler
    }
}

/// Build the weighted feature vector of one transaction
pub fn construct_feature_vector(
    transaction: &Transaction,
    ctx: &BatchContext,
    calendar: &dyn WorkingDayCalendar,
) -> Result<FeatureVector> {
    let config = &ctx.config;
    let mut vector = Vec::with_capacity(ctx.dimension());

    let temporal = extract_temporal_features(transaction.date, calendar)?;
    vector.extend(temporal.iter().map(|v| v * config.temporal_weight));

    let amount = extract_amount_features(transaction.amount, &ctx.amount_scaler);
    vector.extend(amount.iter().map(|v| v * config.amount_weight));

    let description = ctx.vectorizer.transform(&transaction.description);
    vector.extend(description.iter().map(|v| v * config.description_weight));

    if vector.len() != ctx.dimension() {
        return Err(Error::Internal(format!(
            "feature vector has width {}, expected {}",
            vector.len(),
            ctx.dimension()
        )));
    }
    Ok(vector)
}

/// Feature vectors for a whole batch, in input order
pub fn extract_features(
    transactions: &[Transaction],
    ctx: &BatchContext,
    calendar: &dyn WorkingDayCalendar,
) -> Result<Vec<FeatureVector>> {
    transactions
        .par_iter()
        .map(|tx| construct_feature_vector(tx, ctx, calendar))
        .collect()
}
