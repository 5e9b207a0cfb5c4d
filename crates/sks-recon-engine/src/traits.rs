//! Engine and prefix tree traits.
//!
//! These are the only seams the recon peer depends on. The comparison
//! algorithm itself lives behind [`ReconEngine`] and is swappable.

use std::path::Path;
use std::sync::Arc;

use sks_recon_core::{Recover, Zp};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::settings::{PTreeConfig, Settings};

/// Summary of a prefix tree's root node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootSummary {
    size: usize,
}

impl RootSummary {
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    /// Number of elements in the tree.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Persistent element set backing a recon engine.
pub trait PrefixTree: Send + Sync + 'static {
    /// Initialize the tree's storage. Idempotent.
    fn create(&self) -> Result<()>;

    /// Add an element. Adding a present element is a no-op.
    fn insert(&self, z: &Zp) -> Result<()>;

    /// Remove an element. Removing an absent element is a no-op.
    fn remove(&self, z: &Zp) -> Result<()>;

    /// Summary of the root node.
    fn root(&self) -> Result<RootSummary>;

    /// Release the tree's storage. Further calls fail with `Closed`.
    fn close(&self) -> Result<()>;
}

/// A set-reconciliation engine bound to a prefix tree.
///
/// `insert` and `remove` are called synchronously from storage change
/// notifications and must not block on network activity.
pub trait ReconEngine: Send + Sync + 'static {
    fn insert(&self, z: &Zp);

    fn remove(&self, z: &Zp);

    /// Start the engine's own background activity.
    fn start(&self);

    /// Stop background activity.
    fn stop(&self) -> Result<()>;

    /// Take the stream of recover events.
    ///
    /// There is a single consumer: the first call returns the receiver and
    /// later calls return `None`.
    fn take_recoveries(&self) -> Option<mpsc::Receiver<Recover>>;
}

/// Factory for a tree and the engine bound to it.
pub trait ReconBackend: Send + Sync {
    type Tree: PrefixTree;
    type Engine: ReconEngine;

    /// Open (without initializing) the tree stored under `path`.
    fn open_tree(&self, config: &PTreeConfig, path: &Path) -> Result<Self::Tree>;

    /// Construct an engine over `tree`.
    fn new_engine(&self, settings: &Settings, tree: Arc<Self::Tree>) -> Self::Engine;
}
