//! Error types for the grade potential pipeline

use thiserror::Error;

/// Errors that can occur while loading, encoding, predicting or scoring.
///
/// Every variant is terminal for the batch being processed.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid category for field '{field}': {value:?}")]
    InvalidCategory { field: String, value: String },

    #[error("Invalid numeric value for field '{field}': {value:?}")]
    InvalidValue { field: String, value: String },

    #[error("Feature shape mismatch: model expects {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Dimension mismatch: {actual} actual grades vs {potential} potential grades")]
    DimensionMismatch { actual: usize, potential: usize },

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ComputeError {
    pub(crate) fn missing_in_row(field: &str, row: usize) -> Self {
        ComputeError::MissingField(format!("{field} (row {row})"))
    }
}
