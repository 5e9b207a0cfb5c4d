//! In-memory prefix tree.
//!
//! Keeps the element set in a `BTreeSet`. Nothing is written to disk, so
//! the path handed to [`MemoryBackend::open_tree`] is only recorded.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use sks_recon_core::Zp;

use crate::error::{EngineError, Result};
use crate::local::LocalEngine;
use crate::settings::{PTreeConfig, Settings};
use crate::traits::{PrefixTree, ReconBackend, RootSummary};

/// In-memory prefix tree.
pub struct MemoryPrefixTree {
    path: PathBuf,
    inner: RwLock<Option<BTreeSet<Zp>>>,
}

impl MemoryPrefixTree {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `z` is in the set. False when the tree is not open.
    pub fn contains(&self, z: &Zp) -> bool {
        self.inner
            .read()
            .map(|inner| inner.as_ref().map_or(false, |set| set.contains(z)))
            .unwrap_or(false)
    }

    /// All elements, in ascending order.
    pub fn elements(&self) -> Vec<Zp> {
        self.inner
            .read()
            .map(|inner| inner.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    fn with_set<T>(&self, f: impl FnOnce(&mut BTreeSet<Zp>) -> T) -> Result<T> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| EngineError::InvalidData(format!("tree lock poisoned: {}", e)))?;
        inner.as_mut().map(f).ok_or(EngineError::Closed)
    }
}

impl PrefixTree for MemoryPrefixTree {
    fn create(&self) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| EngineError::InvalidData(format!("tree lock poisoned: {}", e)))?;
        if inner.is_none() {
            *inner = Some(BTreeSet::new());
        }
        Ok(())
    }

    fn insert(&self, z: &Zp) -> Result<()> {
        self.with_set(|set| {
            set.insert(*z);
        })
    }

    fn remove(&self, z: &Zp) -> Result<()> {
        self.with_set(|set| {
            set.remove(z);
        })
    }

    fn root(&self) -> Result<RootSummary> {
        self.with_set(|set| RootSummary::new(set.len()))
    }

    fn close(&self) -> Result<()> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| EngineError::InvalidData(format!("tree lock poisoned: {}", e)))?;
        inner.take().map(|_| ()).ok_or(EngineError::Closed)
    }
}

/// Backend producing in-memory trees and local engines.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryBackend;

impl ReconBackend for MemoryBackend {
    type Tree = MemoryPrefixTree;
    type Engine = LocalEngine<MemoryPrefixTree>;

    fn open_tree(&self, config: &PTreeConfig, path: &Path) -> Result<Self::Tree> {
        config.validate()?;
        Ok(MemoryPrefixTree::new(path))
    }

    fn new_engine(&self, settings: &Settings, tree: Arc<Self::Tree>) -> Self::Engine {
        LocalEngine::new(settings, tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_create() {
        let tree = MemoryPrefixTree::new("ptree");
        assert!(matches!(tree.insert(&Zp::from_u64(1)), Err(EngineError::Closed)));

        tree.create().unwrap();
        tree.insert(&Zp::from_u64(1)).unwrap();
        assert_eq!(tree.root().unwrap().size(), 1);
    }

    #[test]
    fn test_insert_remove_idempotent() {
        let tree = MemoryPrefixTree::new("ptree");
        tree.create().unwrap();

        tree.insert(&Zp::from_u64(5)).unwrap();
        tree.insert(&Zp::from_u64(5)).unwrap();
        tree.insert(&Zp::from_u64(6)).unwrap();
        assert_eq!(tree.root().unwrap().size(), 2);

        tree.remove(&Zp::from_u64(5)).unwrap();
        tree.remove(&Zp::from_u64(5)).unwrap();
        assert_eq!(tree.elements(), vec![Zp::from_u64(6)]);
    }

    #[test]
    fn test_close() {
        let tree = MemoryPrefixTree::new("ptree");
        tree.create().unwrap();
        tree.close().unwrap();

        assert!(matches!(tree.root(), Err(EngineError::Closed)));
        assert!(matches!(tree.close(), Err(EngineError::Closed)));
    }

    #[test]
    fn test_backend_rejects_invalid_shape() {
        let config = PTreeConfig {
            mbar: 0,
            ..Default::default()
        };
        let result = MemoryBackend.open_tree(&config, Path::new("ptree"));
        assert!(matches!(result, Err(EngineError::Config(_))));
        assert!(MemoryBackend.open_tree(&PTreeConfig::default(), Path::new("ptree")).is_ok());
    }
}
