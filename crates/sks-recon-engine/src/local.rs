//! Local engine: keeps a prefix tree current and relays recover events.
//!
//! The comparison protocol runs elsewhere. Whatever drives it pushes
//! [`Recover`] events through [`LocalEngine::recover_sender`]; the peer
//! consumes them from [`ReconEngine::take_recoveries`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use sks_recon_core::{Recover, Zp};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::settings::Settings;
use crate::traits::{PrefixTree, ReconEngine};

/// Engine bound to a prefix tree of type `T`.
pub struct LocalEngine<T: PrefixTree> {
    tree: Arc<T>,
    settings: Settings,
    running: AtomicBool,
    recover_tx: mpsc::Sender<Recover>,
    recover_rx: Mutex<Option<mpsc::Receiver<Recover>>>,
}

impl<T: PrefixTree> LocalEngine<T> {
    pub fn new(settings: &Settings, tree: Arc<T>) -> Self {
        let (recover_tx, recover_rx) = mpsc::channel(settings.max_outstanding_recon_requests.max(1));
        Self {
            tree,
            settings: settings.clone(),
            running: AtomicBool::new(false),
            recover_tx,
            recover_rx: Mutex::new(Some(recover_rx)),
        }
    }

    /// Sender for recover events discovered by the comparison driver.
    pub fn recover_sender(&self) -> mpsc::Sender<Recover> {
        self.recover_tx.clone()
    }

    pub fn tree(&self) -> &Arc<T> {
        &self.tree
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl<T: PrefixTree> ReconEngine for LocalEngine<T> {
    fn insert(&self, z: &Zp) {
        if let Err(e) = self.tree.insert(z) {
            warn!(element = %z, error = %e, "cannot insert element into prefix tree");
        }
    }

    fn remove(&self, z: &Zp) {
        if let Err(e) = self.tree.remove(z) {
            warn!(element = %z, error = %e, "cannot remove element from prefix tree");
        }
    }

    fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("recon engine already running");
            return;
        }
        info!(recon_addr = %self.settings.recon_addr, "recon engine started");
    }

    fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(EngineError::NotRunning);
        }
        info!("recon engine stopped");
        Ok(())
    }

    fn take_recoveries(&self) -> Option<mpsc::Receiver<Recover>> {
        self.recover_rx.lock().ok()?.take()
    }
}
