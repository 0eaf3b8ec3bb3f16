//! Error types for Recur

use thiserror::Error;

use crate::models::DetectionStage;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Computation timed out during {stage}")]
    ComputationTimeout { stage: DetectionStage },

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A pipeline invariant was violated. Always a bug, never user error.
    #[error("Internal invariant violated: {0}")]
    Internal(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
