//! Reconciliation actions.

use serde::{Deserialize, Serialize};

use crate::types::{ContentHash, Epoch};

/// One action computed by diffing a remote journal against local state.
///
/// Every variant owns its hash; a `ToDo` never borrows from the message it
/// was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToDo {
    /// The remote journaled content we do not have.
    EntryNeeded {
        hash: ContentHash,
        remote_timestamp: Epoch,
    },
    /// Both sides have the content but disagree on when it was journaled.
    TimeAdjust {
        hash: ContentHash,
        local_timestamp: Epoch,
        remote_timestamp: Epoch,
    },
    /// We journaled content inside the remote's window that it did not list.
    RemoteNeeds {
        hash: ContentHash,
        local_timestamp: Epoch,
    },
}

impl ToDo {
    pub fn hash(&self) -> &ContentHash {
        match self {
            ToDo::EntryNeeded { hash, .. }
            | ToDo::TimeAdjust { hash, .. }
            | ToDo::RemoteNeeds { hash, .. } => hash,
        }
    }

    pub fn is_entry_needed(&self) -> bool {
        matches!(self, ToDo::EntryNeeded { .. })
    }

    pub fn is_time_adjust(&self) -> bool {
        matches!(self, ToDo::TimeAdjust { .. })
    }

    pub fn is_remote_needs(&self) -> bool {
        matches!(self, ToDo::RemoteNeeds { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_accessors() {
        let hash = ContentHash::from_bytes(vec![0xaa]);
        let todo = ToDo::TimeAdjust {
            hash: hash.clone(),
            local_timestamp: 150,
            remote_timestamp: 100,
        };
        assert!(todo.is_time_adjust());
        assert!(!todo.is_entry_needed());
        assert_eq!(todo.hash(), &hash);
    }

    #[test]
    fn test_serializes_with_variant_tag() {
        let todo = ToDo::RemoteNeeds {
            hash: ContentHash::from_bytes(vec![1, 2]),
            local_timestamp: 9,
        };
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["RemoteNeeds"]["local_timestamp"], 9);
    }
}
