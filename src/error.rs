//! Error types for the threshold engine

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse step table: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(
        "Not enough valid data points: found {found}, a minimum of {required} are required for this analysis"
    )]
    InsufficientData { found: usize, required: usize },

    #[error("Curve fitting failed: {0}")]
    FitFailed(String),

    #[error("Degenerate Modified Dmax geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Non-finite value during threshold search: {0}")]
    NonFinite(String),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
