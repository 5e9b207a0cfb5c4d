//! KeyStorage trait: the interface a recon peer needs from a key store.

use async_trait::async_trait;
use sks_recon_core::KeyChange;

use crate::error::Result;

/// Error type returned by change subscribers.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Callback invoked for every storage mutation.
pub type ChangeHandler = Box<dyn Fn(&KeyChange) -> std::result::Result<(), SubscriberError> + Send + Sync>;

/// Result of upserting key material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertResult {
    /// The key was not stored before.
    Inserted { digest: String },
    /// A stored key changed content.
    Replaced { old_digest: String, new_digest: String },
    /// The exact content was already stored.
    Unchanged { digest: String },
}

/// The storage interface consumed by the recon peer.
///
/// Implementations normalize and deduplicate key material themselves; the
/// peer only hands over raw key blobs.
#[async_trait]
pub trait KeyStorage: Send + Sync {
    /// Register a change handler.
    ///
    /// Handlers are called synchronously for every mutation, in
    /// registration order. A handler error is returned from the mutating
    /// call; the store does not retry.
    fn subscribe(&self, handler: ChangeHandler);

    /// Insert or merge one blob of key material.
    async fn upsert_key(&self, material: &[u8]) -> Result<UpsertResult>;
}
