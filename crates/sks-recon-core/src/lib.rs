//! # SKS Recon Core
//!
//! Pure primitives for an SKS reconciliation peer.
//!
//! This crate contains no I/O, no storage, no networking. It is pure
//! computation over the values that flow between the key store, the
//! reconciliation engine and the hashquery protocol.
//!
//! ## Key Types
//!
//! - [`Zp`] - An element of the SKS prime field, the unit of set reconciliation
//! - [`KeyChange`] - A storage mutation: digests added and digests removed
//! - [`Recover`] - Elements a remote peer has that the local set lacks
//!
//! ## Wire Integers
//!
//! All length prefixes on the SKS wire are 4-byte big-endian unsigned
//! integers. See the [`wire`] module.

pub mod error;
pub mod types;
pub mod wire;
pub mod zp;

pub use error::{CoreError, Result};
pub use types::{ChangeKind, KeyChange, Recover, RemoteConfig};
pub use wire::{read_int, write_int};
pub use zp::{pad_sks_element, Zp, P_SKS, SKS_ZP_NBYTES};
