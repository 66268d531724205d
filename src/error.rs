//! Error types for ACubed

use thiserror::Error;

/// Malformed notes and illegal note combinations.
///
/// Always fatal to the chart being processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Time must be non-negative, got {0}")]
    NegativeTime(f64),

    #[error("Time must be a finite number")]
    NonFiniteTime,

    #[error("Step {step:?} is not a non-zero binary string of length {num_channels}")]
    InvalidStep { step: String, num_channels: usize },

    #[error("Channel count must be between 1 and 32, got {0}")]
    InvalidChannelCount(usize),

    #[error("Cannot combine notes with different times ({left} != {right})")]
    TimeMismatch { left: f64, right: f64 },

    #[error("Cannot combine notes with overlapping steps {left} and {right} at time {time}")]
    OverlappingSteps {
        time: f64,
        left: String,
        right: String,
    },

    #[error("Channel count mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
}

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Failed to parse chart payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
