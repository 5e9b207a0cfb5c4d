//! # SKS Recon Store
//!
//! The key storage contract consumed by a recon peer.
//!
//! ## Overview
//!
//! A recon peer never owns key records. It consumes a store through the
//! [`KeyStorage`] trait: recovered key material is handed to
//! [`KeyStorage::upsert_key`], and every mutation the store performs is
//! announced to subscribers as a [`KeyChange`](sks_recon_core::KeyChange).
//!
//! ## Key Types
//!
//! - [`KeyStorage`] - The async trait for upserts and change subscriptions
//! - [`MemoryKeyStore`] - In-memory store for tests and embedding
//! - [`UpsertResult`] - Outcome of upserting key material
//!
//! ## Design Notes
//!
//! - **Synchronous notification**: subscribers run on the caller's thread
//!   before `upsert_key` returns, and their errors are returned to the caller.
//! - **Reentrancy**: stores must not hold internal locks while notifying.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{content_digest, MemoryKeyStore};
pub use traits::{ChangeHandler, KeyStorage, SubscriberError, UpsertResult};
