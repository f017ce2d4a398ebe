//! Pipeline Error Types

use thiserror::Error;

/// Errors raised anywhere in the extraction pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EegError {
    /// Channel count, sample shape or rating layout violates the fixed contract.
    /// The offending recording is skipped.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Malformed filter, band or threshold parameters. Fatal.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Recording produced zero complete windows
    #[error("Recording {recording} produced no complete windows")]
    EmptyResult { recording: String },

    /// Persistence layer rejected a batch
    #[error("Feature store failure: {0}")]
    StoreFailure(String),

    /// Configuration sources could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EegError {
    /// Whether this error only affects the current recording
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EegError::InvalidShape(_) | EegError::EmptyResult { .. } | EegError::StoreFailure(_)
        )
    }
}

impl From<config::ConfigError> for EegError {
    fn from(err: config::ConfigError) -> Self {
        EegError::Config(err.to_string())
    }
}
