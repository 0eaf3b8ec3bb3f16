//! Amount feature block: signed log scaling, z-scored across the batch

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::stats;

pub const AMOUNT_WIDTH: usize = 1;

/// `sign(a) * ln(1 + |a|)`
pub fn log_scale(amount: f64) -> f64 {
    if amount == 0.0 {
        return 0.0;
    }
    amount.signum() * amount.abs().ln_1p()
}

pub fn decimal_to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

/// Batch normalization statistics of log-scaled amounts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountScaler {
    pub mean: f64,
    pub std_dev: f64,
}

impl AmountScaler {
    pub fn fit(amounts: &[Decimal]) -> Self {
        let scaled: Vec<f64> = amounts
            .iter()
            .map(|a| log_scale(decimal_to_f64(*a)))
            .collect();
        Self {
            mean: stats::mean(&scaled),
            std_dev: stats::std_dev(&scaled),
        }
    }

    /// Z-score of the log-scaled amount; 0 when the batch has no spread
    pub fn transform(&self, amount: Decimal) -> f64 {
        if self.std_dev < 1e-9 {
            return 0.0;
        }
        (log_scale(decimal_to_f64(amount)) - self.mean) / self.std_dev
    }
}

pub fn extract_amount_features(amount: Decimal, scaler: &AmountScaler) -> [f64; AMOUNT_WIDTH] {
    [scaler.transform(amount)]
}
