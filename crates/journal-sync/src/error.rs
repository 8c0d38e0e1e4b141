//! Error types for the sync module.

use thiserror::Error;

use crate::messages::PeerId;

/// Errors that can occur during sync operations.
///
/// Every failure surfaces to the caller. The engine never retries; retry
/// cadence belongs to whoever schedules `sync()`.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The peer is the local node or has no secure channel.
    #[error("peer not eligible for sync: {0}")]
    PeerNotEligible(String),

    /// Could not establish a connection to the peer.
    #[error("connection to {peer} failed: {reason}")]
    ConnectionFailed { peer: PeerId, reason: String },

    /// The message codec rejected the outgoing message.
    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    /// Writing the header or body to the peer stream failed.
    #[error("write to {peer} failed: {reason}")]
    WriteFailed { peer: PeerId, reason: String },

    /// An incoming message could not be decoded.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// The remote clock is too far from ours to trust its journal.
    #[error("clock of peer {peer} is {skew}s off (limit {limit}s)")]
    ClockSkewExceeded { peer: PeerId, skew: u64, limit: u64 },

    /// Store operation failed.
    #[error("store error: {0}")]
    StoreFailed(#[from] journal_store::StoreError),

    /// Allocation failed while building a message or ToDo list.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// The ToDo consumer could not act on part of a reconciled list.
    #[error("acting on journal from {peer} failed for {failed} item(s): {reason}")]
    ActionFailed {
        peer: PeerId,
        failed: usize,
        reason: String,
    },

    /// The operation was cancelled.
    #[error("sync cancelled")]
    Cancelled,
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
