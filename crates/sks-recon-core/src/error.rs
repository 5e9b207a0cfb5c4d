//! Error types for SKS Recon Core.

use thiserror::Error;

/// Errors raised by the core primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed digest {digest:?}: {source}")]
    MalformedDigest {
        digest: String,
        #[source]
        source: hex::FromHexError,
    },

    #[error("truncated input: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("length {0} does not fit in a wire integer")]
    LengthOverflow(usize),

    #[error("cannot resolve remote address: {0}")]
    AddressResolution(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
