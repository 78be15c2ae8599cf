//! Storage error types.

use std::time::Duration;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Operation timed out
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Unique constraint violated
    #[error("{0}")]
    Conflict(String),

    /// Stored JSON could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored value does not fit the model
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Get a client-safe error message
    ///
    /// Only conflicts carry a message meant for the caller.
    pub fn client_message(&self) -> String {
        match self {
            StoreError::Conflict(msg) => msg.clone(),
            _ => "Internal server error".to_string(),
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
