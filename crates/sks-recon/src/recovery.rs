//! Recovery of keys the engine found missing locally.
//!
//! Each [`Recover`] event is split into chunks of at most `chunk_size`
//! elements. Every chunk is one hashquery request to the remote HKP server;
//! the keys in the response are merged into local storage one by one. A
//! failed chunk does not stop the remaining chunks of the same event.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use sks_recon_core::{Recover, Zp};
use sks_recon_hashquery::{HashQueryClient, HashQueryTransport};
use sks_recon_store::{KeyStorage, UpsertResult};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ChunkError, ChunkFailure, PeerError, RecoveryError, Result};

/// Outcome of a fully successful recovery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// HKP address the keys were fetched from.
    pub remote: String,
    pub chunks: usize,
    pub requested: usize,
    /// Keys returned by the remote.
    pub fetched: usize,
    pub inserted: usize,
    pub replaced: usize,
    /// Keys already stored, or repeated within a response.
    pub unchanged: usize,
}

#[derive(Debug, Default)]
struct ChunkTally {
    fetched: usize,
    inserted: usize,
    replaced: usize,
    unchanged: usize,
}

/// Fetches missing keys from remote peers and merges them into storage.
pub struct RecoveryProcessor<S: KeyStorage, T: HashQueryTransport> {
    storage: Arc<S>,
    client: HashQueryClient<T>,
    chunk_size: usize,
}

impl<S, T> RecoveryProcessor<S, T>
where
    S: KeyStorage + 'static,
    T: HashQueryTransport + 'static,
{
    pub fn new(storage: Arc<S>, client: HashQueryClient<T>, chunk_size: usize) -> Self {
        Self {
            storage,
            client,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Consume recover events until `token` is cancelled.
    ///
    /// Recovery failures are logged and do not end the loop. If the event
    /// stream closes, the loop idles until cancellation.
    pub async fn run(self, mut recoveries: mpsc::Receiver<Recover>, token: CancellationToken) -> Result<()> {
        info!(chunk_size = self.chunk_size, "recon processing: started");
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                next = recoveries.recv() => match next {
                    Some(rcvr) => {
                        if let Err(e) = self.process(rcvr).await {
                            warn!(error = %e, "recovery failed");
                        }
                    }
                    None => {
                        debug!("recover stream closed");
                        token.cancelled().await;
                        break;
                    }
                },
            }
        }
        info!("recon processing: stopped");
        Ok(())
    }

    /// Recover all elements of one event.
    ///
    /// Fails before any request if the event names no usable HKP address.
    /// Otherwise every chunk is attempted, and the failures are combined
    /// into a single [`RecoveryError`].
    pub async fn process(&self, rcvr: Recover) -> Result<RecoveryReport> {
        let remote = rcvr.hkp_addr().map_err(PeerError::AddressResolution)?;
        let elements = rcvr.remote_elements;

        let mut report = RecoveryReport {
            remote: remote.clone(),
            requested: elements.len(),
            ..Default::default()
        };
        let mut failures = Vec::new();

        debug!(remote = %remote, elements = elements.len(), "recovering");
        for (index, chunk) in elements.chunks(self.chunk_size).enumerate() {
            report.chunks += 1;
            match self.request_chunk(&remote, chunk).await {
                Ok(tally) => {
                    report.fetched += tally.fetched;
                    report.inserted += tally.inserted;
                    report.replaced += tally.replaced;
                    report.unchanged += tally.unchanged;
                }
                Err(error) => {
                    warn!(remote = %remote, chunk = index, error = %error, "chunk failed");
                    failures.push(ChunkFailure {
                        index,
                        elements: chunk.len(),
                        error,
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(RecoveryError {
                remote,
                chunks: report.chunks,
                failures,
            }
            .into());
        }

        info!(
            remote = %report.remote,
            chunks = report.chunks,
            fetched = report.fetched,
            inserted = report.inserted,
            replaced = report.replaced,
            "recovered keys"
        );
        Ok(report)
    }

    async fn request_chunk(&self, remote: &str, chunk: &[Zp]) -> std::result::Result<ChunkTally, ChunkError> {
        let mut reader = self.client.query(remote, chunk).await?;
        let mut tally = ChunkTally::default();
        let mut seen: HashSet<Bytes> = HashSet::new();

        while let Some(key) = reader.next_key()? {
            tally.fetched += 1;
            if !seen.insert(key.clone()) {
                tally.unchanged += 1;
                continue;
            }
            match self.storage.upsert_key(&key).await? {
                UpsertResult::Inserted { .. } => tally.inserted += 1,
                UpsertResult::Replaced { .. } => tally.replaced += 1,
                UpsertResult::Unchanged { .. } => tally.unchanged += 1,
            }
        }
        reader.finish();

        Ok(tally)
    }
}
