//! Error types for Stride Planner

use thiserror::Error;

/// Errors that can occur while planning or persisting samples
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Invalid plan input: {0}")]
    InvalidInput(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] std::io::Error),

    #[error("Time parse error: {0}")]
    TimeParseError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
