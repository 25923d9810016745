//! Error types for model construction and forward passes.

use thiserror::Error;

/// Model-specific errors.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Invalid model configuration.
    #[error("Invalid model configuration: {message}")]
    Config { message: String },

    /// Sequence length exceeds the configured maximum.
    #[error("Sequence length {actual} exceeds configured maximum {max}")]
    SequenceTooLong { actual: usize, max: usize },

    /// Dimension mismatch between tensors.
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A tensor-engine operation failed inside a forward pass.
    #[error("{stage} failed: {source}")]
    Forward {
        stage: &'static str,
        #[source]
        source: candle_core::Error,
    },

    /// IO error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModelError {
    /// Build a `map_err` closure that tags an engine error with the failing stage.
    pub fn stage(stage: &'static str) -> impl FnOnce(candle_core::Error) -> ModelError {
        move |source| ModelError::Forward { stage, source }
    }
}

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
