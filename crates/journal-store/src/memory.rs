//! In-memory implementation of the JournalStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use journal_core::{ContentHash, Epoch, JournalRecord};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, JournalStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
    closed: AtomicBool,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Ordered index: (timestamp, hash).
    by_time: BTreeSet<(Epoch, ContentHash)>,

    /// Hash index: hash -> timestamp.
    by_hash: HashMap<ContentHash, Epoch>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a store pre-populated with records.
    pub fn with_records(records: impl IntoIterator<Item = JournalRecord>) -> Self {
        let store = Self::new();
        if let Ok(mut inner) = store.inner.write() {
            for record in records {
                inner.insert(record);
            }
        }
        store
    }

    /// Close the store. Every later operation fails with
    /// [`StoreError::CursorUnavailable`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Open a cursor positioned at the newest record.
    ///
    /// The cursor holds a read lock until it is dropped.
    pub fn cursor(&self) -> Result<JournalCursor<'_>> {
        Ok(JournalCursor {
            guard: self.read()?,
            last: None,
            exhausted: false,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::CursorUnavailable("store closed".into()));
        }
        self.inner
            .read()
            .map_err(|e| StoreError::CursorUnavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::CursorUnavailable("store closed".into()));
        }
        self.inner
            .write()
            .map_err(|e| StoreError::CursorUnavailable(format!("lock poisoned: {}", e)))
    }
}

impl MemoryStoreInner {
    fn insert(&mut self, record: JournalRecord) -> InsertResult {
        if let Some(&existing) = self.by_hash.get(&record.hash) {
            if existing == record.timestamp {
                return InsertResult::AlreadyExists;
            }
            return InsertResult::Conflict {
                existing_timestamp: existing,
            };
        }
        self.by_hash.insert(record.hash.clone(), record.timestamp);
        self.by_time.insert((record.timestamp, record.hash));
        InsertResult::Inserted
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks the journal from the newest record backwards.
///
/// Finite and not restartable: once it returns `None` it stays exhausted.
/// Dropping the cursor releases the store's read lock.
pub struct JournalCursor<'a> {
    guard: RwLockReadGuard<'a, MemoryStoreInner>,
    last: Option<(Epoch, ContentHash)>,
    exhausted: bool,
}

impl Iterator for JournalCursor<'_> {
    type Item = JournalRecord;

    fn next(&mut self) -> Option<JournalRecord> {
        if self.exhausted {
            return None;
        }

        let next = match self.last.take() {
            None => self.guard.by_time.iter().next_back().cloned(),
            Some(last) => self.guard.by_time.range(..last).next_back().cloned(),
        };

        match next {
            Some((timestamp, hash)) => {
                self.last = Some((timestamp, hash.clone()));
                Some(JournalRecord::new(timestamp, hash))
            }
            None => {
                self.exhausted = true;
                None
            }
        }
    }
}

impl std::iter::FusedIterator for JournalCursor<'_> {}

#[async_trait]
impl JournalStore for MemoryStore {
    async fn append(&self, record: &JournalRecord) -> Result<InsertResult> {
        let mut inner = self.write()?;
        Ok(inner.insert(record.clone()))
    }

    async fn recent(&self, n: usize) -> Result<Vec<JournalRecord>> {
        let cursor = self.cursor()?;
        Ok(cursor.take(n).collect())
    }

    async fn lookup(&self, hash: &ContentHash) -> Result<Option<JournalRecord>> {
        let inner = self.read()?;
        Ok(inner
            .by_hash
            .get(hash)
            .map(|&timestamp| JournalRecord::new(timestamp, hash.clone())))
    }

    async fn scan_window(&self, start: Epoch, end: Epoch) -> Result<Vec<JournalRecord>> {
        if start > end {
            return Ok(Vec::new());
        }
        let inner = self.read()?;
        // The empty hash sorts before every other, so this is the first
        // key at `start`.
        let from = (start, ContentHash::from_bytes(Vec::new()));
        Ok(inner
            .by_time
            .range(from..)
            .take_while(|(ts, _)| *ts <= end)
            .map(|(ts, hash)| JournalRecord::new(*ts, hash.clone()))
            .collect())
    }

    async fn set_timestamp(&self, hash: &ContentHash, timestamp: Epoch) -> Result<bool> {
        let mut inner = self.write()?;
        let Some(old) = inner.by_hash.get(hash).copied() else {
            return Ok(false);
        };
        if old != timestamp {
            inner.by_time.remove(&(old, hash.clone()));
            inner.by_time.insert((timestamp, hash.clone()));
            inner.by_hash.insert(hash.clone(), timestamp);
        }
        Ok(true)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.by_hash.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ts: Epoch, name: &str) -> JournalRecord {
        JournalRecord::new(ts, ContentHash::digest(name.as_bytes()))
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let record = rec(100, "a");

        let result = store.append(&record).await.unwrap();
        assert_eq!(result, InsertResult::Inserted);

        let found = store.lookup(&record.hash).await.unwrap().unwrap();
        assert_eq!(found, record);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_idempotent() {
        let store = MemoryStore::new();
        let record = rec(100, "a");

        assert_eq!(store.append(&record).await.unwrap(), InsertResult::Inserted);
        assert_eq!(
            store.append(&record).await.unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(
            store.append(&rec(150, "a")).await.unwrap(),
            InsertResult::Conflict {
                existing_timestamp: 100
            }
        );
    }

    #[tokio::test]
    async fn test_recent_newest_first() {
        let store = MemoryStore::with_records(vec![rec(100, "a"), rec(300, "c"), rec(200, "b")]);

        let recent = store.recent(10).await.unwrap();
        let stamps: Vec<_> = recent.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![300, 200, 100]);

        let two = store.recent(2).await.unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(two[0].timestamp, 300);
    }

    #[tokio::test]
    async fn test_recent_on_empty_store() {
        let store = MemoryStore::new();
        assert!(store.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_store_fails_cursor() {
        let store = MemoryStore::with_records(vec![rec(1, "a")]);
        store.close();
        assert!(matches!(
            store.recent(10).await,
            Err(StoreError::CursorUnavailable(_))
        ));
    }

    #[test]
    fn test_cursor_is_fused_and_releases_lock() {
        let store = MemoryStore::with_records(vec![rec(1, "a"), rec(2, "b")]);
        {
            let mut cursor = store.cursor().unwrap();
            assert_eq!(cursor.next().unwrap().timestamp, 2);
            assert_eq!(cursor.next().unwrap().timestamp, 1);
            assert!(cursor.next().is_none());
            assert!(cursor.next().is_none());
        }
        // Read lock released on drop, so a writer can proceed.
        assert!(store.inner.try_write().is_ok());
    }

    #[test]
    fn test_cursor_early_break_releases_lock() {
        let store = MemoryStore::with_records((0..5).map(|i| rec(i, &i.to_string())));
        let first = store.cursor().unwrap().next();
        assert_eq!(first.unwrap().timestamp, 4);
        assert!(store.inner.try_write().is_ok());
    }

    #[tokio::test]
    async fn test_scan_window_inclusive() {
        let store = MemoryStore::with_records(vec![
            rec(99, "x"),
            rec(100, "a"),
            rec(150, "b"),
            rec(200, "c"),
            rec(201, "y"),
        ]);
        let window = store.scan_window(100, 200).await.unwrap();
        let stamps: Vec<_> = window.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![100, 150, 200]);

        assert!(store.scan_window(300, 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scan_window_includes_every_hash_at_start() {
        let mut records: Vec<JournalRecord> = (0..1000u64)
            .map(|ts| JournalRecord::new(ts, ContentHash::from_bytes(ts.to_be_bytes())))
            .collect();
        let at_start = vec![
            JournalRecord::new(1000, ContentHash::from_bytes(vec![0x00])),
            JournalRecord::new(1000, ContentHash::from_bytes(vec![0x00, 0x00])),
            JournalRecord::new(1000, ContentHash::from_bytes(vec![0xff])),
        ];
        records.extend(at_start.clone());
        let store = MemoryStore::with_records(records);

        assert_eq!(store.scan_window(1000, 1000).await.unwrap(), at_start);
        assert_eq!(store.scan_window(1000, u64::MAX).await.unwrap(), at_start);

        let wider = store.scan_window(999, 1000).await.unwrap();
        assert_eq!(wider.len(), 4);
        assert_eq!(wider[0].timestamp, 999);
    }

    #[tokio::test]
    async fn test_set_timestamp_moves_record() {
        let store = MemoryStore::with_records(vec![rec(150, "a"), rec(200, "b")]);
        let a = ContentHash::digest(b"a");

        assert!(store.set_timestamp(&a, 100).await.unwrap());
        assert_eq!(store.lookup(&a).await.unwrap().unwrap().timestamp, 100);
        assert!(store.scan_window(150, 150).await.unwrap().is_empty());

        let missing = ContentHash::digest(b"zzz");
        assert!(!store.set_timestamp(&missing, 1).await.unwrap());
    }

    proptest::proptest! {
        #[test]
        fn prop_recent_is_strictly_descending(
            stamps in proptest::collection::btree_set(0u64..10_000, 0..40),
            n in 1usize..50,
        ) {
            let store = MemoryStore::with_records(
                stamps
                    .iter()
                    .map(|ts| JournalRecord::new(*ts, ContentHash::from_bytes(ts.to_be_bytes()))),
            );
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let recent = rt.block_on(store.recent(n)).unwrap();

            proptest::prop_assert_eq!(recent.len(), stamps.len().min(n));
            proptest::prop_assert!(recent.windows(2).all(|w| w[0].timestamp > w[1].timestamp));
        }
    }
}
