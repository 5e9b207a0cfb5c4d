//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key material could not be stored.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// A change subscriber rejected the mutation.
    #[error("subscriber failed: {0}")]
    Subscriber(String),

    /// Backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
