//! Node configuration.

use serde::{Deserialize, Serialize};

use journal_sync::{SyncConfig, TimestampPolicy};

/// Configuration for a [`JournalNode`](crate::JournalNode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Sync engine configuration.
    pub sync: SyncConfig,
    /// Which timestamp wins when a peer disagrees about the same content.
    pub timestamp_policy: TimestampPolicy,
    /// Offer content a peer is missing back to it after reconciling.
    pub notify_remote_needs: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            timestamp_policy: TimestampPolicy::default(),
            notify_remote_needs: true,
        }
    }
}

impl NodeConfig {
    pub fn with_policy(mut self, policy: TimestampPolicy) -> Self {
        self.timestamp_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json() {
        let config: NodeConfig =
            serde_json::from_str(r#"{"timestamp_policy": "latest", "sync": {"max_entries": 4}}"#)
                .unwrap();
        assert_eq!(config.timestamp_policy, TimestampPolicy::Latest);
        assert_eq!(config.sync.max_entries, 4);
        assert_eq!(config.sync.max_clock_skew_secs, 300);
        assert!(config.notify_remote_needs);
    }
}
