//! # SKS Recon
//!
//! The peer side of SKS-style set reconciliation between OpenPGP keyservers.
//!
//! ## Overview
//!
//! A recon peer keeps a prefix tree of key digests in step with the local key
//! store, lets a reconciliation engine compare that tree with remote peers,
//! and fetches the keys the engine finds missing:
//!
//! - **Digest pipeline**: every key added or replaced in storage updates the
//!   engine's element set and the load statistics
//! - **Recovery**: recover events from the engine become chunked hashquery
//!   requests; returned keys are merged into storage
//! - **Statistics**: hourly and daily counts of inserted and updated keys,
//!   persisted next to the tree
//! - **Lifecycle**: ordered startup and a shutdown that always attempts every
//!   step
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sks_recon::{Peer, PeerConfig};
//! use sks_recon::engine::SqliteBackend;
//! use sks_recon::store::MemoryKeyStore;
//!
//! async fn example() {
//!     let config = PeerConfig::default();
//!     let transport = Arc::new(config.http_transport().unwrap());
//!     let storage = Arc::new(MemoryKeyStore::new());
//!
//!     let mut peer = Peer::new(&SqliteBackend, storage, transport, "/var/lib/sks/ptree", None, config)
//!         .unwrap();
//!     peer.start().unwrap();
//!
//!     // ... serve until asked to exit ...
//!
//!     let report = peer.stop().await;
//!     assert!(report.is_clean());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `sks_recon::core` - Field elements, change and recover events, wire integers
//! - `sks_recon::store` - Key storage contract and in-memory store
//! - `sks_recon::engine` - Engine and prefix tree contracts, SQLite tree
//! - `sks_recon::hashquery` - Hashquery codec, client and transports

pub mod config;
pub mod error;
pub mod peer;
pub mod pipeline;
pub mod recovery;
pub mod stats;
pub mod supervisor;

pub use sks_recon_core as core;
pub use sks_recon_engine as engine;
pub use sks_recon_hashquery as hashquery;
pub use sks_recon_store as store;

pub use config::{PeerConfig, REQUEST_CHUNK_SIZE};
pub use error::{ChunkError, ChunkFailure, PeerError, RecoveryError, Result};
pub use peer::{Peer, ShutdownReport, ShutdownStep};
pub use pipeline::DigestPipeline;
pub use recovery::{RecoveryProcessor, RecoveryReport};
pub use stats::{stats_path, LoadStat, LoadStatMap, Stats, StatsSnapshot};
pub use supervisor::TaskGroup;

pub use sks_recon_core::{ChangeKind, KeyChange, Recover, RemoteConfig, Zp};
