//! Per-peer sync bookkeeping.

use serde::{Deserialize, Serialize};

use journal_core::Epoch;

use crate::messages::PeerId;

/// A peer we replicate our journal to.
///
/// Only a fully successful outbound sync touches the two epoch fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationPeer {
    pub id: PeerId,
    /// Sender clock at the last successful sync.
    pub last_connect: Epoch,
    /// Newest journal time shipped to this peer.
    pub last_journal_time: Epoch,
}

impl ReplicationPeer {
    pub fn new(id: PeerId) -> Self {
        Self {
            id,
            last_connect: 0,
            last_journal_time: 0,
        }
    }

    /// Record a completed sync. `last_journal_time` never moves backwards.
    pub(crate) fn mark_synced(&mut self, current_epoch: Epoch, end_epoch: Epoch) {
        self.last_connect = current_epoch;
        self.last_journal_time = self.last_journal_time.max(end_epoch);
    }

    /// True once at least one sync has completed.
    pub fn has_synced(&self) -> bool {
        self.last_connect != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_synced_is_monotonic() {
        let mut peer = ReplicationPeer::new(PeerId::from_bytes([1; 32]));
        assert!(!peer.has_synced());

        peer.mark_synced(1000, 200);
        assert_eq!(peer.last_connect, 1000);
        assert_eq!(peer.last_journal_time, 200);

        peer.mark_synced(1010, 150);
        assert_eq!(peer.last_connect, 1010);
        assert_eq!(peer.last_journal_time, 200);
        assert!(peer.has_synced());
    }
}
