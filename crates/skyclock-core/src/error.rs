//! Error types for Skyclock

use thiserror::Error;

/// Core Skyclock errors
///
/// None of these are fatal: callers degrade to "retry on next tick" or
/// "use a safe default".
#[derive(Error, Debug)]
pub enum SkyError {
    // Connectivity errors
    #[error("No peer reachable")]
    ConnectivityUnavailable,

    #[error("Connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),

    // Record errors
    #[error("Malformed record at {path}: key {key} missing or wrong type")]
    MalformedRecord { path: String, key: String },

    // Wire errors
    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    // Transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    // Collaborator errors
    #[error("Forecast provider error: {0}")]
    Provider(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl SkyError {
    /// Whether the error only means "no peer this cycle"
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            SkyError::ConnectivityUnavailable | SkyError::ConnectTimeout(_)
        )
    }
}

/// Result type for Skyclock operations
pub type SkyResult<T> = Result<T, SkyError>;
