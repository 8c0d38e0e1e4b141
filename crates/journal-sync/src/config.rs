//! Sync engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::messages::limits;

/// Configuration for sync behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Records snapshotted into each outbound message.
    pub max_entries: usize,
    /// Bound on connecting to a peer, in seconds.
    pub connect_timeout_secs: u64,
    /// Largest accepted clock difference for inbound messages, in seconds.
    pub max_clock_skew_secs: u64,
}

impl SyncConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_entries: limits::SYNC_ENTRIES,
            connect_timeout_secs: limits::CONNECT_TIMEOUT_SECS,
            max_clock_skew_secs: limits::MAX_CLOCK_SKEW_SECS,
        }
    }
}
