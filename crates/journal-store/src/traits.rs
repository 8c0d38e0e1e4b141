//! Store trait: the abstract interface for journal persistence.
//!
//! The sync engine only needs ordered reads of recent records, point
//! lookups by hash, and window scans. Implementations include SQLite
//! (primary) and in-memory (for tests).

use std::sync::Arc;

use async_trait::async_trait;
use journal_core::{ContentHash, Epoch, JournalRecord};

use crate::error::Result;

/// Result of appending a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Record was journaled.
    Inserted,
    /// The same hash is already journaled at the same time (idempotent).
    AlreadyExists,
    /// The hash is already journaled at a different time.
    Conflict {
        /// The timestamp currently stored for this hash.
        existing_timestamp: Epoch,
    },
}

/// The JournalStore trait: async interface for journal persistence.
///
/// # Design Notes
///
/// - **One record per hash**: a hash is journaled once; moving it in time
///   goes through [`JournalStore::set_timestamp`].
/// - **Ordering**: records are ordered by `(timestamp, hash)`.
/// - **Cursors**: `recent` walks a cursor from the newest record backwards.
///   The cursor is scoped to the call and released on every exit path.
#[async_trait]
pub trait JournalStore: Send + Sync {
    /// Journal a record.
    async fn append(&self, record: &JournalRecord) -> Result<InsertResult>;

    /// The `n` newest records, newest first.
    ///
    /// An empty journal yields an empty vector. `StoreError` is reserved
    /// for a cursor that cannot be opened at all.
    async fn recent(&self, n: usize) -> Result<Vec<JournalRecord>>;

    /// The record journaled for `hash`, if any.
    async fn lookup(&self, hash: &ContentHash) -> Result<Option<JournalRecord>>;

    /// Records with `start <= timestamp <= end`, oldest first.
    async fn scan_window(&self, start: Epoch, end: Epoch) -> Result<Vec<JournalRecord>>;

    /// Move an existing record to a new timestamp.
    ///
    /// Returns `false` if the hash is not journaled.
    async fn set_timestamp(&self, hash: &ContentHash, timestamp: Epoch) -> Result<bool>;

    /// Number of journaled records.
    async fn count(&self) -> Result<usize>;
}

#[async_trait]
impl<S: JournalStore + ?Sized> JournalStore for Arc<S> {
    async fn append(&self, record: &JournalRecord) -> Result<InsertResult> {
        (**self).append(record).await
    }

    async fn recent(&self, n: usize) -> Result<Vec<JournalRecord>> {
        (**self).recent(n).await
    }

    async fn lookup(&self, hash: &ContentHash) -> Result<Option<JournalRecord>> {
        (**self).lookup(hash).await
    }

    async fn scan_window(&self, start: Epoch, end: Epoch) -> Result<Vec<JournalRecord>> {
        (**self).scan_window(start, end).await
    }

    async fn set_timestamp(&self, hash: &ContentHash, timestamp: Epoch) -> Result<bool> {
        (**self).set_timestamp(hash, timestamp).await
    }

    async fn count(&self) -> Result<usize> {
        (**self).count().await
    }
}
