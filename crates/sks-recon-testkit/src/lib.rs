//! # SKS Recon Testkit
//!
//! Testing utilities for the SKS recon peer.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Digests with their field elements and hashquery
//!   request bytes
//! - **Generators**: Proptest strategies for digests, elements and key material
//! - **Fixtures**: A remote HKP server stand-in and peers on temporary
//!   directories
//!
//! ## Golden Vectors
//!
//! ```rust
//! use sks_recon_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, detail) in verify_all_vectors() {
//!     assert!(ok, "{}: {}", name, detail);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use sks_recon::core::Zp;
//! use sks_recon_testkit::generators::digest;
//!
//! proptest! {
//!     #[test]
//!     fn digest_survives_element_conversion(d in digest()) {
//!         prop_assert_eq!(Zp::from_digest(&d).unwrap().to_digest(), d);
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use sks_recon_testkit::fixtures::{PeerFixture, RemoteHkp};
//!
//! let mut remote = RemoteHkp::new();
//! let z = remote.add_key(b"remote key");
//! let fixture = PeerFixture::new().unwrap();
//! let peer = fixture.memory_peer(&remote).unwrap();
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{init_tracing, recover_from, wait_until, MemoryPeer, PeerFixture, RemoteHkp, SqlitePeer};
pub use generators::{digest, key_material, zp};
pub use vectors::{all_vectors, verify_all_vectors, DigestVector};
