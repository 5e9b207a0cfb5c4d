//! Digest update pipeline: storage change notifications into the engine.

use std::sync::{Arc, PoisonError, RwLock};

use sks_recon_core::{KeyChange, Zp};
use sks_recon_engine::ReconEngine;
use tracing::trace;

use crate::error::{PeerError, Result};
use crate::stats::Stats;

/// Applies storage changes to the statistics and the recon engine.
///
/// Digests are applied in order and the first malformed digest aborts the
/// change. Elements applied before it are not rolled back.
///
/// An update holds the read side of `closed` until it returns, so
/// [`close`](Self::close) waits for updates already in flight.
pub struct DigestPipeline<E: ReconEngine> {
    engine: Arc<E>,
    stats: Arc<Stats>,
    closed: RwLock<bool>,
}

impl<E: ReconEngine> DigestPipeline<E> {
    pub fn new(engine: Arc<E>, stats: Arc<Stats>) -> Self {
        Self {
            engine,
            stats,
            closed: RwLock::new(false),
        }
    }

    /// Count `change`, then insert and remove its digests in the engine.
    pub fn update_digests(&self, change: &KeyChange) -> Result<()> {
        let closed = self.closed.read().unwrap_or_else(PoisonError::into_inner);
        if *closed {
            return Err(PeerError::Stopped);
        }

        self.stats.update(change);

        for digest in change.insert_digests() {
            let z = Zp::from_digest(digest).map_err(PeerError::MalformedDigest)?;
            trace!(%z, "engine insert");
            self.engine.insert(&z);
        }
        for digest in change.remove_digests() {
            let z = Zp::from_digest(digest).map_err(PeerError::MalformedDigest)?;
            trace!(%z, "engine remove");
            self.engine.remove(&z);
        }
        Ok(())
    }

    /// Reject all further changes, once in-flight ones have finished.
    pub fn close(&self) {
        *self.closed.write().unwrap_or_else(PoisonError::into_inner) = true;
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.read().unwrap_or_else(PoisonError::into_inner)
    }
}
