//! Error types for the hashquery module.

use sks_recon_core::CoreError;
use thiserror::Error;

/// Errors that can occur during a hashquery round-trip.
#[derive(Debug, Error)]
pub enum HashQueryError {
    /// Malformed or truncated frame.
    #[error("wire error: {0}")]
    Wire(#[from] CoreError),

    /// HTTP transport failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-HTTP transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote answered with a status other than 200.
    #[error("error response from {addr:?} ({status}): {body}")]
    BadStatus { addr: String, status: u16, body: String },
}

/// Result type for hashquery operations.
pub type Result<T> = std::result::Result<T, HashQueryError>;
