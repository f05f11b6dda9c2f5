//! Error types for salon.

use thiserror::Error;

/// Common error type for salon.
#[derive(Error, Debug)]
pub enum SalonError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for configuration or request input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Malformed wire frame.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A channel endpoint is closed or otherwise unusable.
    #[error("channel error: {0}")]
    Channel(String),
}

impl From<serde_json::Error> for SalonError {
    fn from(e: serde_json::Error) -> Self {
        SalonError::Protocol(e.to_string())
    }
}

/// Result type alias for salon operations.
pub type Result<T> = std::result::Result<T, SalonError>;
