//! Error types for the recon peer.

use std::fmt;
use std::path::PathBuf;

use sks_recon_core::CoreError;
use sks_recon_engine::EngineError;
use sks_recon_hashquery::HashQueryError;
use sks_recon_store::StoreError;
use thiserror::Error;

/// Errors that can occur during peer operations.
#[derive(Debug, Error)]
pub enum PeerError {
    /// A digest in a change notification is not valid hexadecimal.
    #[error("bad digest: {0}")]
    MalformedDigest(#[source] CoreError),

    /// The prefix tree could not be created or opened.
    #[error("cannot initialize prefix tree at {path:?}: {source}")]
    TreeInit {
        path: PathBuf,
        #[source]
        source: EngineError,
    },

    /// A recover event did not name a reachable HKP address.
    #[error("address resolution failed: {0}")]
    AddressResolution(#[source] CoreError),

    /// One or more chunks of a recovery failed.
    #[error(transparent)]
    Recovery(#[from] RecoveryError),

    /// Engine or tree failure outside construction.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Stats file could not be read or written.
    #[error("stats I/O error on {path:?}: {source}")]
    StatsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Stats snapshot could not be encoded.
    #[error("stats encoding error: {0}")]
    StatsFormat(#[from] serde_json::Error),

    /// A background task panicked or was aborted.
    #[error("task {name} failed: {reason}")]
    Task { name: &'static str, reason: String },

    /// `start` was called on a running peer.
    #[error("peer already started")]
    AlreadyStarted,

    /// The peer is shutting down and no longer accepts changes.
    #[error("peer stopped")]
    Stopped,
}

/// Failure of a single hashquery chunk.
#[derive(Debug, Error)]
pub enum ChunkError {
    /// Request, transport, status or framing failure.
    #[error(transparent)]
    HashQuery(#[from] HashQueryError),

    /// A fetched key could not be merged into storage.
    #[error("merge failed: {0}")]
    Merge(#[from] StoreError),
}

/// A failed chunk within a recovery.
#[derive(Debug)]
pub struct ChunkFailure {
    /// Position of the chunk within its recover event.
    pub index: usize,
    /// Number of elements the chunk requested.
    pub elements: usize,
    pub error: ChunkError,
}

/// Combined error of a recovery in which some chunks failed.
#[derive(Debug)]
pub struct RecoveryError {
    pub remote: String,
    /// Total chunks attempted.
    pub chunks: usize,
    pub failures: Vec<ChunkFailure>,
}

impl fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "recovery from {} failed for {} of {} chunks",
            self.remote,
            self.failures.len(),
            self.chunks
        )?;
        for failure in &self.failures {
            write!(f, "; chunk {}: {}", failure.index, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for RecoveryError {}

/// Result type for peer operations.
pub type Result<T> = std::result::Result<T, PeerError>;
