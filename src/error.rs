//! Error types for CogniLearn

use thiserror::Error;

/// Errors that can occur during a cohort analysis run
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Unknown pattern: {0}")]
    UnknownPattern(String),

    #[error("Invalid interaction record at index {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("Invalid roster: {0}")]
    InvalidRoster(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
