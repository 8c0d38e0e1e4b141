//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use journal_core::{ContentHash, Epoch, JournalEntry, JournalMessage, JournalRecord, ManualClock};
use journal_store::MemoryStore;
use journal_sync::{MemoryNetwork, MemoryTransport, PeerId};

/// Default wall clock for fixtures: 2023-11-14T22:13:20Z.
pub const FIXTURE_NOW: Epoch = 1_700_000_000;

/// Content hash for a short name.
pub fn hash(name: &str) -> ContentHash {
    ContentHash::digest(name.as_bytes())
}

pub fn record(name: &str, timestamp: Epoch) -> JournalRecord {
    JournalRecord::new(timestamp, hash(name))
}

/// Records for `(name, timestamp)` pairs.
pub fn records(pairs: &[(&str, Epoch)]) -> Vec<JournalRecord> {
    pairs.iter().map(|(name, ts)| record(name, *ts)).collect()
}

/// A message carrying pinned entries for `pairs`, in the given order, with
/// a window matching the entries.
pub fn message(current_epoch: Epoch, pairs: &[(&str, Epoch)]) -> JournalMessage {
    let entries: Vec<JournalEntry> = pairs
        .iter()
        .map(|(name, ts)| JournalEntry::new(*ts, true, hash(name)))
        .collect();
    JournalMessage {
        start_epoch: entries.iter().map(|e| e.timestamp).min().unwrap_or(0),
        end_epoch: entries.iter().map(|e| e.timestamp).max().unwrap_or(0),
        current_epoch,
        offer: false,
        entries,
    }
}

/// A deterministic peer ID.
pub fn peer_id(seed: u8) -> PeerId {
    PeerId::from_bytes([seed; 32])
}

/// Install a test-writer tracing subscriber. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// A shared in-memory network and a manual clock.
pub struct TestFixture {
    pub network: Arc<MemoryNetwork>,
    pub clock: Arc<ManualClock>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::at(FIXTURE_NOW)
    }

    /// Start the clock at `now`.
    pub fn at(now: Epoch) -> Self {
        Self {
            network: MemoryNetwork::new(),
            clock: Arc::new(ManualClock::new(now)),
        }
    }

    pub fn now(&self) -> Epoch {
        use journal_core::Clock;
        self.clock.now_epoch()
    }

    /// Attach a transport for `peer_id(seed)` to the network.
    pub async fn transport(&self, seed: u8) -> MemoryTransport {
        self.network.create_transport(peer_id(seed)).await
    }

    /// A memory store holding `pairs`.
    pub fn store(&self, pairs: &[(&str, Epoch)]) -> MemoryStore {
        MemoryStore::with_records(records(pairs))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
