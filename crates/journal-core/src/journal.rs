//! Journal records, wire entries, and the sync message.
//!
//! A [`JournalRecord`] is what a store persists. A [`JournalEntry`] is the
//! wire form of one record inside a [`JournalMessage`]. Crossing from one
//! to the other always deep-copies the hash.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{ContentHash, Epoch};

/// Maximum number of entries accepted in a single message.
pub const MAX_MESSAGE_ENTRIES: usize = 1000;

/// A persisted journal record. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JournalRecord {
    /// When the content was journaled.
    pub timestamp: Epoch,
    /// Content address of the block.
    pub hash: ContentHash,
}

impl JournalRecord {
    pub fn new(timestamp: Epoch, hash: ContentHash) -> Self {
        Self { timestamp, hash }
    }
}

/// One journal record as it travels on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: Epoch,
    /// Whether the sender pins this content.
    pub pin: bool,
    pub hash: ContentHash,
}

impl JournalEntry {
    pub fn new(timestamp: Epoch, pin: bool, hash: ContentHash) -> Self {
        Self {
            timestamp,
            pin,
            hash,
        }
    }

    /// Deep-copy a record into a pinned entry.
    pub fn from_record(record: &JournalRecord) -> Result<Self> {
        Self::from_record_with(record, &HeapAllocator)
    }

    /// Deep-copy a record into a pinned entry using `alloc` for the hash buffer.
    pub fn from_record_with(record: &JournalRecord, alloc: &dyn HashAllocator) -> Result<Self> {
        Ok(Self {
            timestamp: record.timestamp,
            pin: true,
            hash: alloc.copy_hash(&record.hash)?,
        })
    }
}

/// A snapshot of recent journal activity sent to a peer.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JournalMessage {
    /// Smallest entry timestamp.
    pub start_epoch: Epoch,
    /// Largest entry timestamp.
    pub end_epoch: Epoch,
    /// Sender's wall clock when the message was built.
    pub current_epoch: Epoch,
    /// Set on a reply offering content the recipient lacks. The recipient
    /// reconciles only the listed entries and offers nothing back.
    #[serde(default)]
    pub offer: bool,
    pub entries: Vec<JournalEntry>,
}

impl JournalMessage {
    /// Build a message from records, newest first as the store returns them.
    pub fn from_records(records: &[JournalRecord], current_epoch: Epoch) -> Result<Self> {
        let mut builder = MessageBuilder::new();
        for record in records {
            builder.push_record(record)?;
        }
        Ok(builder.finish(current_epoch))
    }

    /// The covered time window, inclusive. `None` for an empty message.
    pub fn window(&self) -> Option<(Epoch, Epoch)> {
        if self.entries.is_empty() {
            None
        } else {
            Some((self.start_epoch, self.end_epoch))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Mark this message as an offer.
    pub fn into_offer(mut self) -> Self {
        self.offer = true;
        self
    }
}

/// Source of hash buffers for entries under construction.
///
/// The default [`HeapAllocator`] reports allocation failure as
/// [`CoreError::AllocationFailed`]. Alternative allocators let hosts cap
/// memory use per message.
pub trait HashAllocator: Send + Sync {
    /// Produce an owned copy of `hash`.
    fn copy_hash(&self, hash: &ContentHash) -> Result<ContentHash>;
}

/// Allocates hash copies on the global heap.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

impl HashAllocator for HeapAllocator {
    fn copy_hash(&self, hash: &ContentHash) -> Result<ContentHash> {
        hash.try_copy()
    }
}

/// Incrementally builds a [`JournalMessage`] from records.
///
/// Tracks the running min/max timestamp. If a push fails, the builder
/// should be dropped; every entry built so far goes with it.
pub struct MessageBuilder<'a> {
    alloc: &'a dyn HashAllocator,
    start_epoch: Option<Epoch>,
    end_epoch: Epoch,
    entries: Vec<JournalEntry>,
}

impl MessageBuilder<'static> {
    pub fn new() -> Self {
        MessageBuilder::with_allocator(&HeapAllocator)
    }
}

impl<'a> MessageBuilder<'a> {
    pub fn with_allocator(alloc: &'a dyn HashAllocator) -> Self {
        Self {
            alloc,
            start_epoch: None,
            end_epoch: 0,
            entries: Vec::new(),
        }
    }

    /// Copy a record into a new pinned entry.
    pub fn push_record(&mut self, record: &JournalRecord) -> Result<()> {
        if self.entries.len() >= MAX_MESSAGE_ENTRIES {
            return Err(CoreError::InvalidMessage(format!(
                "more than {} entries",
                MAX_MESSAGE_ENTRIES
            )));
        }
        self.entries
            .try_reserve(1)
            .map_err(|_| CoreError::AllocationFailed(std::mem::size_of::<JournalEntry>()))?;

        let entry = JournalEntry::from_record_with(record, self.alloc)?;

        self.end_epoch = self.end_epoch.max(entry.timestamp);
        self.start_epoch = Some(match self.start_epoch {
            Some(start) => start.min(entry.timestamp),
            None => entry.timestamp,
        });
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stamp the sender's clock and produce the message.
    pub fn finish(self, current_epoch: Epoch) -> JournalMessage {
        JournalMessage {
            start_epoch: self.start_epoch.unwrap_or(0),
            end_epoch: self.end_epoch,
            current_epoch,
            offer: false,
            entries: self.entries,
        }
    }
}

impl Default for MessageBuilder<'static> {
    fn default() -> Self {
        MessageBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails the nth hash copy (1-based).
    struct FailOn {
        nth: usize,
        calls: AtomicUsize,
    }

    impl HashAllocator for FailOn {
        fn copy_hash(&self, hash: &ContentHash) -> Result<ContentHash> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.nth {
                return Err(CoreError::AllocationFailed(hash.len()));
            }
            hash.try_copy()
        }
    }

    fn record(ts: Epoch, byte: u8) -> JournalRecord {
        JournalRecord::new(ts, ContentHash::from_bytes(vec![byte; 4]))
    }

    #[test]
    fn test_from_records_tracks_window() {
        let records = vec![record(200, 0xbb), record(100, 0xaa), record(150, 0xcc)];
        let msg = JournalMessage::from_records(&records, 1_000).unwrap();

        assert_eq!(msg.start_epoch, 100);
        assert_eq!(msg.end_epoch, 200);
        assert_eq!(msg.current_epoch, 1_000);
        assert_eq!(msg.window(), Some((100, 200)));
        assert!(msg.entries.iter().all(|e| e.pin));
        // Order is preserved
        assert_eq!(msg.entries[0].timestamp, 200);
        assert_eq!(msg.entries[1].timestamp, 100);
    }

    #[test]
    fn test_empty_builder_has_no_window() {
        let msg = MessageBuilder::new().finish(42);
        assert_eq!(msg.start_epoch, 0);
        assert_eq!(msg.end_epoch, 0);
        assert_eq!(msg.window(), None);
    }

    #[test]
    fn test_zero_timestamp_is_a_real_start() {
        let msg = JournalMessage::from_records(&[record(0, 1), record(5, 2)], 9).unwrap();
        assert_eq!(msg.window(), Some((0, 5)));
    }

    #[test]
    fn test_entry_is_deep_copy() {
        let rec = record(7, 0x11);
        let entry = JournalEntry::from_record(&rec).unwrap();
        assert_eq!(entry.hash, rec.hash);
        assert_ne!(entry.hash.as_bytes().as_ptr(), rec.hash.as_bytes().as_ptr());
    }

    #[test]
    fn test_allocation_failure_midway_fails_build() {
        let alloc = FailOn {
            nth: 3,
            calls: AtomicUsize::new(0),
        };
        let records: Vec<_> = (1..=5).map(|i| record(i * 10, i as u8)).collect();

        let mut builder = MessageBuilder::with_allocator(&alloc);
        let mut result = Ok(());
        for rec in &records {
            result = builder.push_record(rec);
            if result.is_err() {
                break;
            }
        }

        assert!(matches!(result, Err(CoreError::AllocationFailed(4))));
        assert_eq!(builder.len(), 2);
        drop(builder);
        assert_eq!(alloc.calls.load(Ordering::SeqCst), 3);
    }

    proptest::proptest! {
        #[test]
        fn prop_builder_window_matches_entries(
            stamps in proptest::collection::vec(0u64..1_000_000, 1..50)
        ) {
            let records: Vec<_> = stamps
                .iter()
                .enumerate()
                .map(|(i, ts)| JournalRecord::new(*ts, ContentHash::from_bytes((i as u32).to_be_bytes())))
                .collect();
            let msg = JournalMessage::from_records(&records, 0).unwrap();

            proptest::prop_assert_eq!(msg.start_epoch, *stamps.iter().min().unwrap());
            proptest::prop_assert_eq!(msg.end_epoch, *stamps.iter().max().unwrap());
            proptest::prop_assert_eq!(msg.len(), records.len());
            proptest::prop_assert!(crate::validation::validate_message(&msg).is_ok());
        }
    }
}
