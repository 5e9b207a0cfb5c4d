//! In-memory implementation of the KeyStorage trait.
//!
//! Keys are addressed by a content digest (the first 16 bytes of the
//! Blake3 hash of the blob, hex encoded). An identity function decides
//! which blobs describe the same key, so that a changed blob is reported
//! as a replacement rather than a second key.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use sks_recon_core::KeyChange;

use crate::error::{Result, StoreError};
use crate::traits::{ChangeHandler, KeyStorage, UpsertResult};

type IdentityFn = Box<dyn Fn(&[u8]) -> String + Send + Sync>;

struct StoredKey {
    digest: String,
    material: Vec<u8>,
}

/// In-memory key store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<String, StoredKey>>,
    handlers: RwLock<Vec<Arc<ChangeHandler>>>,
    identity: IdentityFn,
}

impl MemoryKeyStore {
    /// Create a store where every distinct blob is a distinct key.
    pub fn new() -> Self {
        Self::with_identity(content_digest)
    }

    /// Create a store that groups blobs into keys using `identity`.
    pub fn with_identity<F>(identity: F) -> Self
    where
        F: Fn(&[u8]) -> String + Send + Sync + 'static,
    {
        Self {
            keys: RwLock::new(HashMap::new()),
            handlers: RwLock::new(Vec::new()),
            identity: Box::new(identity),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.keys.read().map(|keys| keys.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a key with this content digest is stored.
    pub fn contains_digest(&self, digest: &str) -> bool {
        self.keys
            .read()
            .map(|keys| keys.values().any(|k| k.digest == digest))
            .unwrap_or(false)
    }

    /// Stored material for a content digest.
    pub fn get(&self, digest: &str) -> Option<Vec<u8>> {
        let keys = self.keys.read().ok()?;
        keys.values()
            .find(|k| k.digest == digest)
            .map(|k| k.material.clone())
    }

    /// Deliver a change to all subscribers.
    ///
    /// Stops at the first failing handler and returns its error.
    pub fn notify(&self, change: &KeyChange) -> Result<()> {
        // Snapshot the handlers so none of our locks are held while they run.
        let handlers: Vec<Arc<ChangeHandler>> = self
            .handlers
            .read()
            .map_err(|e| StoreError::Backend(format!("handler lock poisoned: {}", e)))?
            .clone();

        for handler in handlers {
            (**handler)(change).map_err(|e| StoreError::Subscriber(e.to_string()))?;
        }
        Ok(())
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStorage for MemoryKeyStore {
    fn subscribe(&self, handler: ChangeHandler) {
        match self.handlers.write() {
            Ok(mut handlers) => handlers.push(Arc::new(handler)),
            Err(e) => tracing::error!("cannot register change handler: {}", e),
        }
    }

    async fn upsert_key(&self, material: &[u8]) -> Result<UpsertResult> {
        if material.is_empty() {
            return Err(StoreError::InvalidKey("empty key material".into()));
        }

        let digest = content_digest(material);
        let identity = (self.identity)(material);

        let result = {
            let mut keys = self
                .keys
                .write()
                .map_err(|e| StoreError::Backend(format!("key lock poisoned: {}", e)))?;

            let previous = keys.insert(
                identity,
                StoredKey {
                    digest: digest.clone(),
                    material: material.to_vec(),
                },
            );
            match previous {
                None => UpsertResult::Inserted { digest },
                Some(old) if old.digest == digest => UpsertResult::Unchanged { digest },
                Some(old) => UpsertResult::Replaced {
                    old_digest: old.digest,
                    new_digest: digest,
                },
            }
        };

        match &result {
            UpsertResult::Inserted { digest } => self.notify(&KeyChange::added(digest.clone()))?,
            UpsertResult::Replaced {
                old_digest,
                new_digest,
            } => self.notify(&KeyChange::replaced(old_digest.clone(), new_digest.clone()))?,
            UpsertResult::Unchanged { .. } => {}
        }

        Ok(result)
    }
}

/// Hex content digest of a key blob: the first 16 bytes of its Blake3 hash.
pub fn content_digest(material: &[u8]) -> String {
    let hash = blake3::hash(material);
    hex::encode(&hash.as_bytes()[..16])
}
