//! Events exchanged between the key store, the recon engine and the peer.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::zp::Zp;

/// Kind of storage mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// A key not previously stored.
    Added,
    /// An existing key whose content changed.
    Replaced,
}

/// A single storage mutation, as seen by change subscribers.
///
/// Digests are hexadecimal content hashes of the stored key records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    pub kind: ChangeKind,
    /// Digests newly present in the store.
    pub inserted: Vec<String>,
    /// Digests no longer present in the store.
    pub removed: Vec<String>,
}

impl KeyChange {
    /// A newly added key.
    pub fn added(digest: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Added,
            inserted: vec![digest.into()],
            removed: Vec::new(),
        }
    }

    /// A key whose stored content changed from `old` to `new`.
    pub fn replaced(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self {
            kind: ChangeKind::Replaced,
            inserted: vec![new.into()],
            removed: vec![old.into()],
        }
    }

    pub fn insert_digests(&self) -> &[String] {
        &self.inserted
    }

    pub fn remove_digests(&self) -> &[String] {
        &self.removed
    }
}

/// Configuration a remote peer advertises during the recon handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub version: String,
    /// Port of the remote's HKP (HTTP) listener.
    pub http_port: u16,
    pub bit_quantum: u32,
    pub mbar: u32,
    pub filters: Vec<String>,
}

/// Elements held by a remote peer and missing locally.
#[derive(Debug, Clone)]
pub struct Recover {
    /// Address the remote's recon connection came from.
    pub remote_addr: Option<SocketAddr>,
    pub remote_config: Option<RemoteConfig>,
    /// Remote elements, in the order the engine discovered them.
    pub remote_elements: Vec<Zp>,
}

impl Recover {
    pub fn new(remote_addr: SocketAddr, remote_config: RemoteConfig, remote_elements: Vec<Zp>) -> Self {
        Self {
            remote_addr: Some(remote_addr),
            remote_config: Some(remote_config),
            remote_elements,
        }
    }

    /// The remote's HKP address: its recon host with its advertised HTTP port.
    ///
    /// IPv6 hosts are rendered in brackets.
    pub fn hkp_addr(&self) -> Result<String> {
        let addr = self
            .remote_addr
            .ok_or_else(|| CoreError::AddressResolution("no remote address".into()))?;
        let config = self.remote_config.as_ref().ok_or_else(|| {
            CoreError::AddressResolution(format!("no remote config for {}", addr))
        })?;
        if config.http_port == 0 {
            return Err(CoreError::AddressResolution(format!(
                "remote {} did not advertise an HTTP port",
                addr
            )));
        }
        Ok(SocketAddr::new(addr.ip(), config.http_port).to_string())
    }
}
