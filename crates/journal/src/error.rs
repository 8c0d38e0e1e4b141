//! Error types for the journal node.

use journal_store::StoreError;
use journal_sync::{PeerId, SyncError};
use thiserror::Error;

/// Errors that can occur during node operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// The peer is not registered for replication.
    #[error("peer not registered: {0}")]
    PeerNotFound(PeerId),

    /// The node has been shut down.
    #[error("node is shut down")]
    ShutDown,
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;
