//! Peer configuration.

use std::time::Duration;

use sks_recon_hashquery::{HashQueryError, HttpTransport};

/// Maximum elements per hashquery request.
pub const REQUEST_CHUNK_SIZE: usize = 100;

/// Configuration for the recon peer.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Maximum elements per hashquery request.
    pub chunk_size: usize,
    /// Period of the stats pruning loop.
    pub prune_interval: Duration,
    /// How long hourly buckets are kept.
    pub hourly_retention: Duration,
    /// How long daily buckets are kept.
    pub daily_retention: Duration,
    /// Timeout for hashquery requests. `None` leaves the transport defaults.
    pub request_timeout: Option<Duration>,
    /// Write the stats file after every prune, not only at shutdown.
    pub persist_stats_on_prune: bool,
}

impl PeerConfig {
    /// An HTTP transport honoring `request_timeout`.
    pub fn http_transport(&self) -> Result<HttpTransport, HashQueryError> {
        match self.request_timeout {
            Some(timeout) => HttpTransport::with_timeout(timeout),
            None => Ok(HttpTransport::new()),
        }
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            chunk_size: REQUEST_CHUNK_SIZE,
            prune_interval: Duration::from_secs(60 * 60),
            hourly_retention: Duration::from_secs(24 * 60 * 60),
            daily_retention: Duration::from_secs(7 * 24 * 60 * 60),
            request_timeout: None,
            persist_stats_on_prune: true,
        }
    }
}
