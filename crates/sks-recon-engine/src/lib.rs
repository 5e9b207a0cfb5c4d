//! # SKS Recon Engine
//!
//! Contracts for the set-reconciliation engine and the prefix tree that
//! backs it, plus local implementations.
//!
//! ## Overview
//!
//! The recon peer treats the comparison protocol as an opaque engine. It
//! only needs to add and remove elements, start and stop the engine, and
//! consume the [`Recover`](sks_recon_core::Recover) events the engine emits
//! when a remote holds elements the local set lacks.
//!
//! ## Key Types
//!
//! - [`ReconEngine`] - Insert/remove elements, start/stop, recover stream
//! - [`PrefixTree`] - Persistent element set backing an engine
//! - [`ReconBackend`] - Factory opening a tree and binding an engine to it
//! - [`Settings`] - Engine settings with SKS defaults
//! - [`LocalEngine`] - Engine that keeps its tree current and relays recover
//!   events pushed by an external comparison driver
//! - [`MemoryPrefixTree`] / [`SqlitePrefixTree`] - Tree implementations
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use sks_recon_engine::{ReconBackend, SqliteBackend, Settings};
//!
//! fn example() {
//!     let settings = Settings::default();
//!     let backend = SqliteBackend;
//!     let tree = backend.open_tree(&settings.ptree, Path::new("recon.ptree")).unwrap();
//!     // let engine = backend.new_engine(&settings, std::sync::Arc::new(tree));
//! }
//! ```

pub mod error;
pub mod local;
pub mod memory;
pub mod migration;
pub mod settings;
pub mod sqlite;
pub mod traits;

pub use error::{EngineError, Result};
pub use local::LocalEngine;
pub use memory::{MemoryBackend, MemoryPrefixTree};
pub use settings::{PTreeConfig, Settings};
pub use sqlite::{SqliteBackend, SqlitePrefixTree};
pub use traits::{PrefixTree, ReconBackend, ReconEngine, RootSummary};
