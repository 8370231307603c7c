//! Error types for Treetest Flux

use thiserror::Error;

/// Errors that can occur while analysing a study snapshot
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse study snapshot: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
