//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use bytes::Bytes;
use rand::RngCore;
use sks_recon::{Peer, PeerConfig};
use sks_recon_core::{Recover, RemoteConfig, Zp};
use sks_recon_engine::{LocalEngine, MemoryBackend, MemoryPrefixTree, SqliteBackend, SqlitePrefixTree};
use sks_recon_hashquery::MemoryTransport;
use sks_recon_store::{content_digest, MemoryKeyStore};
use tempfile::TempDir;

/// A peer on an in-memory tree.
pub type MemoryPeer = Peer<MemoryPrefixTree, LocalEngine<MemoryPrefixTree>, MemoryKeyStore, MemoryTransport>;

/// A peer on a SQLite tree.
pub type SqlitePeer = Peer<SqlitePrefixTree, LocalEngine<SqlitePrefixTree>, MemoryKeyStore, MemoryTransport>;

/// Stand-in for a remote HKP server answering hashqueries.
#[derive(Debug, Clone, Default)]
pub struct RemoteHkp {
    keys: HashMap<Zp, Bytes>,
}

impl RemoteHkp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `material`, returning the element it is known by.
    pub fn add_key(&mut self, material: &[u8]) -> Zp {
        let z = element_for(material);
        self.keys.insert(z, Bytes::copy_from_slice(material));
        z
    }

    /// Serve `count` random keys, returning their elements.
    pub fn add_random_keys(&mut self, count: usize) -> Vec<Zp> {
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| {
                let mut material = vec![0u8; 64];
                rng.fill_bytes(&mut material);
                self.add_key(&material)
            })
            .collect()
    }

    pub fn elements(&self) -> Vec<Zp> {
        self.keys.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// A transport answering from this server's keys.
    pub fn transport(&self) -> MemoryTransport {
        MemoryTransport::with_keys(self.keys.clone())
    }
}

/// The element the in-memory key store reports for `material`.
pub fn element_for(material: &[u8]) -> Zp {
    // A content digest is always valid hex.
    Zp::from_digest(&content_digest(material)).unwrap_or(Zp::ZERO)
}

/// A recover event from the peer at `ip` advertising `http_port`.
pub fn recover_from(ip: IpAddr, http_port: u16, elements: Vec<Zp>) -> Recover {
    let config = RemoteConfig {
        http_port,
        ..Default::default()
    };
    Recover::new(SocketAddr::new(ip, 11370), config, elements)
}

/// A temporary directory holding a peer's tree and stats file.
pub struct PeerFixture {
    pub dir: TempDir,
    pub config: PeerConfig,
}

impl PeerFixture {
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(PeerConfig::default())
    }

    pub fn with_config(config: PeerConfig) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir().context("creating fixture directory")?;
        Ok(Self { dir, config })
    }

    /// Path of the prefix tree.
    pub fn tree_path(&self) -> PathBuf {
        self.dir.path().join("ptree")
    }

    /// Path of the stats file.
    pub fn stats_path(&self) -> PathBuf {
        sks_recon::stats_path(&self.tree_path())
    }

    pub fn memory_peer(&self, remote: &RemoteHkp) -> anyhow::Result<MemoryPeer> {
        self.memory_peer_with(Arc::new(remote.transport()))
    }

    /// A memory peer over `transport`, so callers can inspect its requests.
    pub fn memory_peer_with(&self, transport: Arc<MemoryTransport>) -> anyhow::Result<MemoryPeer> {
        let peer = Peer::new(
            &MemoryBackend,
            Arc::new(MemoryKeyStore::new()),
            transport,
            self.tree_path(),
            None,
            self.config.clone(),
        )?;
        Ok(peer)
    }

    pub fn sqlite_peer(&self, remote: &RemoteHkp) -> anyhow::Result<SqlitePeer> {
        let peer = Peer::new(
            &SqliteBackend,
            Arc::new(MemoryKeyStore::new()),
            Arc::new(remote.transport()),
            self.tree_path(),
            None,
            self.config.clone(),
        )?;
        Ok(peer)
    }
}

/// Install a log subscriber that writes through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F>(timeout: Duration, condition: F) -> anyhow::Result<()>
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            bail!("condition not met within {:?}", timeout);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_serves_added_keys() {
        let mut remote = RemoteHkp::new();
        let z = remote.add_key(b"a key");
        assert_eq!(remote.elements(), vec![z]);

        let random = remote.add_random_keys(3);
        assert_eq!(random.len(), 3);
        assert_eq!(remote.len(), 4);
    }

    #[test]
    fn test_element_for_matches_store_digest() {
        let z = element_for(b"material");
        assert_eq!(z.to_digest(), content_digest(b"material"));
    }

    #[test]
    fn test_recover_from_builds_hkp_address() {
        let rcvr = recover_from("2001:db8::1".parse().unwrap(), 11371, Vec::new());
        assert_eq!(rcvr.hkp_addr().unwrap(), "[2001:db8::1]:11371");
    }

    #[tokio::test]
    async fn test_fixture_paths() {
        let fixture = PeerFixture::new().unwrap();
        let peer = fixture.memory_peer(&RemoteHkp::new()).unwrap();
        assert_eq!(peer.path(), fixture.tree_path());
        assert_eq!(peer.stats_path(), fixture.stats_path());
    }
}
