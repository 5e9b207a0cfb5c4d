//! Error types for the engine module.

use thiserror::Error;

/// Errors raised by engines and prefix trees.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The tree has been closed.
    #[error("prefix tree is closed")]
    Closed,

    /// The engine is not running.
    #[error("engine not running")]
    NotRunning,

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Unusable or mismatched tree configuration.
    #[error("tree configuration: {0}")]
    Config(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
