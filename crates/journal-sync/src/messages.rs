//! Wire literals, limits, and peer identity for the journal protocol.
//!
//! The message body itself is [`journal_core::JournalMessage`]; this module
//! holds what surrounds it on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Protocol negotiation identifier.
pub const PROTOCOL_ID: &str = "/ipfs/journal/1.0.0";

/// Header written ahead of every encoded message.
///
/// The trailing `/n` is two literal characters, not a newline.
pub const STREAM_HEADER: &str = "/ipfs/journalio/1.0.0/n";

/// Protocol limits.
pub mod limits {
    /// Inputs shorter than this are never routed to the journal handler.
    pub const MIN_DISPATCH_LEN: usize = 8;
    /// Records snapshotted per outbound sync.
    pub const SYNC_ENTRIES: usize = 10;
    /// Largest accepted difference between our clock and the sender's.
    pub const MAX_CLOCK_SKEW_SECS: u64 = 300;
    /// Bound on connecting to a peer before a sync.
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
}

/// Unique identifier for a node in the replication network.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(pub [u8; 32]);

impl PeerId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a random peer ID.
    pub fn random() -> Self {
        use rand::Rng;
        Self(rand::thread_rng().gen())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Strip a leading [`STREAM_HEADER`] if the host delivered it with the body.
pub fn strip_stream_header(bytes: &[u8]) -> &[u8] {
    bytes
        .strip_prefix(STREAM_HEADER.as_bytes())
        .unwrap_or(bytes)
}
