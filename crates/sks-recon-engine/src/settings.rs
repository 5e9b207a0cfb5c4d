//! Engine settings.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Prefix tree shape parameters.
///
/// A tree is built for one shape; reopening it with another is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PTreeConfig {
    /// Split threshold multiplier.
    pub thresh_mult: u32,
    /// Bits consumed per tree level.
    pub bit_quantum: u32,
    /// Sample points per node.
    pub mbar: u32,
}

impl PTreeConfig {
    /// Reject shapes no tree can be built with.
    pub fn validate(&self) -> Result<()> {
        if self.mbar == 0 {
            return Err(EngineError::Config("mbar must be positive".into()));
        }
        if self.thresh_mult == 0 {
            return Err(EngineError::Config("thresh_mult must be positive".into()));
        }
        if !(1..=8).contains(&self.bit_quantum) {
            return Err(EngineError::Config(format!(
                "bit_quantum must be within 1..=8, got {}",
                self.bit_quantum
            )));
        }
        Ok(())
    }
}

impl Default for PTreeConfig {
    fn default() -> Self {
        Self {
            thresh_mult: 10,
            bit_quantum: 2,
            mbar: 5,
        }
    }
}

/// Recon engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Address the recon protocol listens on.
    pub recon_addr: String,
    /// Bound on buffered recover events.
    pub max_outstanding_recon_requests: usize,
    pub ptree: PTreeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recon_addr: ":11370".into(),
            max_outstanding_recon_requests: 100,
            ptree: PTreeConfig::default(),
        }
    }
}
