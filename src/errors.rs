//! Error types for keygate

use thiserror::Error;

/// Main error type for keygate operations
#[derive(Error, Debug)]
pub enum KeyGateError {
    // Configuration errors (fatal at startup)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid CIDR range '{range}': {reason}")]
    InvalidCidr { range: String, reason: String },

    #[error("Invalid check pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    // Per-request errors
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Request denied by policy for '{0}'")]
    Forbidden(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    // Storage errors
    #[error("Storage error: {0}")]
    StorageError(String),

    // Internal errors
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for KeyGateError {
    fn from(err: std::io::Error) -> Self {
        KeyGateError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for KeyGateError {
    fn from(err: serde_json::Error) -> Self {
        KeyGateError::StorageError(format!("JSON error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, KeyGateError>;
