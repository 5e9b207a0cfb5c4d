//! The Peer: lifecycle of a recon peer.
//!
//! A peer owns the prefix tree, the recon engine bound to it, the load
//! statistics and the background tasks that recover missing keys and prune
//! the statistics.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sks_recon_core::KeyChange;
use sks_recon_engine::{PrefixTree, ReconBackend, ReconEngine, Settings};
use sks_recon_hashquery::{HashQueryClient, HashQueryTransport};
use sks_recon_store::{KeyStorage, SubscriberError};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PeerConfig;
use crate::error::{PeerError, Result};
use crate::pipeline::DigestPipeline;
use crate::recovery::RecoveryProcessor;
use crate::stats::{stats_path, Stats, StatsSnapshot};
use crate::supervisor::TaskGroup;

/// A step of peer shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownStep {
    /// Cancel and join the background tasks.
    Tasks,
    /// Stop the recon engine.
    Engine,
    /// Close the prefix tree.
    Tree,
    /// Write the statistics file.
    Stats,
}

/// What happened during [`Peer::stop`].
///
/// Every step is attempted even when an earlier one fails.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub completed: Vec<ShutdownStep>,
    pub failures: Vec<(ShutdownStep, PeerError)>,
}

impl ShutdownReport {
    fn record(&mut self, step: ShutdownStep, result: Result<()>) {
        match result {
            Ok(()) => self.completed.push(step),
            Err(e) => {
                warn!(step = ?step, error = %e, "shutdown step failed");
                self.failures.push((step, e));
            }
        }
    }

    /// Whether every step succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, step: ShutdownStep) -> bool {
        self.failures.iter().any(|(s, _)| *s == step)
    }
}

/// A recon peer over tree `Tr`, engine `E`, key storage `S` and hashquery
/// transport `T`.
pub struct Peer<Tr, E, S, T>
where
    Tr: PrefixTree,
    E: ReconEngine,
    S: KeyStorage + 'static,
    T: HashQueryTransport + 'static,
{
    path: PathBuf,
    stats_path: PathBuf,
    settings: Settings,
    config: PeerConfig,
    tree: Arc<Tr>,
    engine: Arc<E>,
    storage: Arc<S>,
    client: HashQueryClient<T>,
    stats: Arc<Stats>,
    pipeline: Arc<DigestPipeline<E>>,
    tasks: TaskGroup,
    started: bool,
}

impl<Tr, E, S, T> Peer<Tr, E, S, T>
where
    Tr: PrefixTree,
    E: ReconEngine,
    S: KeyStorage + 'static,
    T: HashQueryTransport + 'static,
{
    /// Create a peer whose prefix tree lives at `path`.
    ///
    /// Creates the tree directory if needed, opens and initializes the tree,
    /// binds an engine to it, loads the statistics and subscribes to
    /// `storage` so that every key change reaches the engine.
    pub fn new<B>(
        backend: &B,
        storage: Arc<S>,
        transport: Arc<T>,
        path: impl AsRef<Path>,
        settings: Option<Settings>,
        config: PeerConfig,
    ) -> Result<Self>
    where
        B: ReconBackend<Tree = Tr, Engine = E>,
    {
        let path = path.as_ref().to_path_buf();
        let settings = settings.unwrap_or_default();

        ensure_dir(&path).map_err(|source| PeerError::TreeInit {
            path: path.clone(),
            source: source.into(),
        })?;

        let tree = backend
            .open_tree(&settings.ptree, &path)
            .and_then(|tree| tree.create().map(|()| tree))
            .map_err(|source| PeerError::TreeInit {
                path: path.clone(),
                source,
            })?;
        let tree = Arc::new(tree);
        let engine = Arc::new(backend.new_engine(&settings, Arc::clone(&tree)));

        let stats_path = stats_path(&path);
        let stats = Arc::new(Stats::load(&stats_path, tree.as_ref(), &config));

        let pipeline = Arc::new(DigestPipeline::new(Arc::clone(&engine), Arc::clone(&stats)));
        let subscriber = Arc::clone(&pipeline);
        storage.subscribe(Box::new(move |change: &KeyChange| {
            subscriber
                .update_digests(change)
                .map_err(|e| Box::new(e) as SubscriberError)
        }));

        info!(
            path = %path.display(),
            elements = stats.total(),
            "recon peer ready"
        );

        Ok(Self {
            path,
            stats_path,
            settings,
            config,
            tree,
            engine,
            storage,
            client: HashQueryClient::new(transport),
            stats,
            pipeline,
            tasks: TaskGroup::new(),
            started: false,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Start recovery processing, stats pruning and the engine.
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(PeerError::AlreadyStarted);
        }
        let recoveries = self
            .engine
            .take_recoveries()
            .ok_or(PeerError::AlreadyStarted)?;

        let token = self.tasks.token();
        let processor = RecoveryProcessor::new(
            Arc::clone(&self.storage),
            self.client.clone(),
            self.config.chunk_size,
        );
        self.tasks
            .spawn("recovery", processor.run(recoveries, token.clone()));

        self.tasks.spawn(
            "stats-prune",
            prune_stats(
                Arc::clone(&self.stats),
                self.stats_path.clone(),
                self.config.prune_interval,
                self.config.persist_stats_on_prune,
                token,
            ),
        );

        info!("recon engine: starting");
        self.engine.start();
        self.started = true;
        Ok(())
    }

    /// Stop the peer.
    ///
    /// Background tasks are cancelled and joined, then the engine is
    /// stopped, the tree closed and the statistics saved. Each step runs
    /// regardless of earlier failures.
    pub async fn stop(mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        info!("recon processing: stopping");
        report.record(ShutdownStep::Tasks, self.tasks.shutdown().await);

        // Nothing may reach the engine or tree once they start closing.
        self.pipeline.close();

        info!("recon engine: stopping");
        report.record(ShutdownStep::Engine, self.engine.stop().map_err(PeerError::from));

        let tree = Arc::clone(&self.tree);
        let closed = blocking("tree-close", move || tree.close().map_err(PeerError::from)).await;
        report.record(ShutdownStep::Tree, closed);

        let stats = Arc::clone(&self.stats);
        let path = self.stats_path.clone();
        let saved = blocking("stats-save", move || stats.save(&path)).await;
        report.record(ShutdownStep::Stats, saved);

        info!(failures = report.failures.len(), "recon peer stopped");
        report
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply a storage change to the statistics and the engine.
    ///
    /// This is what the storage subscription calls; it is exposed for
    /// callers that feed changes directly.
    pub fn update_digests(&self, change: &KeyChange) -> Result<()> {
        self.pipeline.update_digests(change)
    }

    /// Current statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn tree(&self) -> &Arc<Tr> {
        &self.tree
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats_path(&self) -> &Path {
        &self.stats_path
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

/// Create the tree directory with mode 0755 if it does not exist.
fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    debug!(path = %path.display(), "creating prefix tree directory");

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(path)
}

/// Run file and database work on the blocking pool.
async fn blocking<F>(name: &'static str, f: F) -> Result<()>
where
    F: FnOnce() -> Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| Err(PeerError::Task { name, reason: e.to_string() }))
}

/// Prune the statistics every `period` until cancelled.
async fn prune_stats(
    stats: Arc<Stats>,
    path: PathBuf,
    period: Duration,
    persist: bool,
    token: CancellationToken,
) -> Result<()> {
    let period = period.max(Duration::from_millis(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(()),
            _ = ticker.tick() => {
                stats.prune();
                if persist {
                    let stats = Arc::clone(&stats);
                    let path = path.clone();
                    if let Err(e) = blocking("stats-save", move || stats.save(&path)).await {
                        warn!(error = %e, "cannot save load stats");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::SocketAddr;

    use bytes::Bytes;
    use sks_recon_core::{Recover, RemoteConfig, Zp};
    use sks_recon_engine::{
        EngineError, LocalEngine, MemoryBackend, MemoryPrefixTree, SqliteBackend, SqlitePrefixTree,
    };
    use sks_recon_hashquery::MemoryTransport;
    use sks_recon_store::{content_digest, MemoryKeyStore};
    use tempfile::tempdir;

    type MemoryPeer = Peer<MemoryPrefixTree, LocalEngine<MemoryPrefixTree>, MemoryKeyStore, MemoryTransport>;

    fn memory_peer(path: &Path, transport: MemoryTransport) -> MemoryPeer {
        Peer::new(
            &MemoryBackend,
            Arc::new(MemoryKeyStore::new()),
            Arc::new(transport),
            path,
            None,
            PeerConfig::default(),
        )
        .unwrap()
    }

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    fn idle_transport() -> MemoryTransport {
        MemoryTransport::with_keys(HashMap::new())
    }

    #[tokio::test]
    async fn test_new_creates_tree_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("ptree");

        let peer = memory_peer(&path, idle_transport());
        assert!(path.is_dir());
        assert_eq!(peer.stats_path(), dir.path().join("nested").join(".ptree.stats"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o022, 0);
        }
    }

    #[tokio::test]
    async fn test_tree_init_failure() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"x").unwrap();

        let result = Peer::new(
            &SqliteBackend,
            Arc::new(MemoryKeyStore::new()),
            Arc::new(idle_transport()),
            &file,
            None,
            PeerConfig::default(),
        );
        assert!(matches!(result, Err(PeerError::TreeInit { .. })));
    }

    #[tokio::test]
    async fn test_storage_changes_reach_engine() {
        let dir = tempdir().unwrap();
        let peer = memory_peer(&dir.path().join("ptree"), idle_transport());

        let result = peer.storage().upsert_key(b"some key").await.unwrap();
        let digest = content_digest(b"some key");
        assert_eq!(result, sks_recon_store::UpsertResult::Inserted { digest: digest.clone() });

        assert!(peer.tree().contains(&Zp::from_digest(&digest).unwrap()));
        assert_eq!(peer.stats().total, 1);
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let dir = tempdir().unwrap();
        let mut peer = memory_peer(&dir.path().join("ptree"), idle_transport());

        peer.start().unwrap();
        assert!(peer.is_started());
        assert!(peer.engine().is_running());
        assert!(matches!(peer.start(), Err(PeerError::AlreadyStarted)));

        assert!(peer.stop().await.is_clean());
    }

    #[tokio::test]
    async fn test_recover_event_merges_remote_keys() {
        init_tracing();
        let dir = tempdir().unwrap();
        let material = Bytes::from_static(b"remote key");
        let z = Zp::from_digest(&content_digest(&material)).unwrap();
        let mut keys = HashMap::new();
        keys.insert(z, material);

        let mut peer = memory_peer(&dir.path().join("ptree"), MemoryTransport::with_keys(keys));
        peer.start().unwrap();

        let addr: SocketAddr = "192.0.2.9:11370".parse().unwrap();
        let config = RemoteConfig {
            http_port: 11371,
            ..Default::default()
        };
        peer.engine()
            .recover_sender()
            .send(Recover::new(addr, config, vec![z]))
            .await
            .unwrap();

        while !peer.tree().contains(&z) {
            tokio::task::yield_now().await;
        }
        assert_eq!(peer.storage().len(), 1);

        let requests = peer.client.transport().requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://192.0.2.9:11371/pks/hashquery");

        assert!(peer.stop().await.is_clean());
    }

    #[tokio::test]
    async fn test_stop_runs_every_step() {
        init_tracing();
        let dir = tempdir().unwrap();
        let path = dir.path().join("ptree");
        // Never started: the engine refuses to stop.
        let peer = memory_peer(&path, idle_transport());
        peer.update_digests(&KeyChange::added("00112233445566778899aabbccddeeff"))
            .unwrap();
        let stats_file = peer.stats_path().to_path_buf();
        let tree = Arc::clone(peer.tree());

        let report = peer.stop().await;

        assert!(report.failed(ShutdownStep::Engine));
        assert!(matches!(
            report.failures[0].1,
            PeerError::Engine(EngineError::NotRunning)
        ));
        assert_eq!(
            report.completed,
            vec![ShutdownStep::Tasks, ShutdownStep::Tree, ShutdownStep::Stats]
        );
        assert!(matches!(tree.root(), Err(EngineError::Closed)));
        assert!(stats_file.exists());
    }

    #[tokio::test]
    async fn test_stop_saves_stats_after_tree_close_failure() {
        let dir = tempdir().unwrap();
        let mut peer = memory_peer(&dir.path().join("ptree"), idle_transport());
        peer.start().unwrap();
        peer.tree().close().unwrap();
        let stats_file = peer.stats_path().to_path_buf();

        let report = peer.stop().await;
        assert!(report.failed(ShutdownStep::Tree));
        assert!(!report.failed(ShutdownStep::Engine));
        assert!(report.completed.contains(&ShutdownStep::Stats));
        assert!(stats_file.exists());
    }

    #[tokio::test]
    async fn test_changes_rejected_after_stop_begins() {
        let dir = tempdir().unwrap();
        let mut peer = memory_peer(&dir.path().join("ptree"), idle_transport());
        peer.start().unwrap();
        let storage = Arc::clone(peer.storage());

        peer.stop().await;

        let err = storage.upsert_key(b"late key").await.unwrap_err();
        assert!(matches!(err, sks_recon_store::StoreError::Subscriber(_)));
    }

    #[tokio::test]
    async fn test_restart_restores_total_and_buckets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ptree");

        let first: Peer<SqlitePrefixTree, LocalEngine<SqlitePrefixTree>, MemoryKeyStore, MemoryTransport> =
            Peer::new(
                &SqliteBackend,
                Arc::new(MemoryKeyStore::new()),
                Arc::new(idle_transport()),
                &path,
                None,
                PeerConfig::default(),
            )
            .unwrap();
        for key in [b"one".as_ref(), b"two", b"three"] {
            first.storage().upsert_key(key).await.unwrap();
        }
        let hourly = first.stats().hourly;
        first.stop().await;

        let second: Peer<SqlitePrefixTree, LocalEngine<SqlitePrefixTree>, MemoryKeyStore, MemoryTransport> =
            Peer::new(
                &SqliteBackend,
                Arc::new(MemoryKeyStore::new()),
                Arc::new(idle_transport()),
                &path,
                None,
                PeerConfig::default(),
            )
            .unwrap();
        let stats = second.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.hourly, hourly);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_loop_persists_stats() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".ptree.stats");
        let stats = Arc::new(Stats::new(&PeerConfig::default()));
        let token = CancellationToken::new();

        let task = tokio::spawn(prune_stats(
            Arc::clone(&stats),
            path.clone(),
            Duration::from_secs(3600),
            true,
            token.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(3601)).await;
        token.cancel();
        task.await.unwrap().unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_blocking_runs_off_the_runtime_thread() {
        let caller = std::thread::current().id();
        let (tx, rx) = std::sync::mpsc::channel();

        blocking("thread-check", move || {
            tx.send(std::thread::current().id()).ok();
            Ok(())
        })
        .await
        .unwrap();
        assert_ne!(rx.recv().unwrap(), caller);

        let err = blocking("stats-save", || panic!("disk on fire")).await.unwrap_err();
        assert!(matches!(err, PeerError::Task { name: "stats-save", .. }));
    }
}
