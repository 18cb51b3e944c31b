//! Pipeline errors
//!
//! Only configuration loading can fail. Once a [`Throttle`](crate::pipeline::Throttle)
//! is built, every degradation is silent and at most logged.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ThrottleError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Invalid configuration JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Result type for configuration operations
pub type ThrottleResult<T> = Result<T, ThrottleError>;
