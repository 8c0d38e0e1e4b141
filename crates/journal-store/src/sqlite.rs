//! SQLite implementation of the JournalStore trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use journal_core::{ContentHash, Epoch, JournalRecord};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, JournalStore};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::CursorUnavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("spawn_blocking failed: {}", e),
            ))
        })?
    }
}

// Helper to convert a row to a JournalRecord
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<JournalRecord> {
    let timestamp: i64 = row.get("timestamp")?;
    let hash: Vec<u8> = row.get("hash")?;

    let timestamp = u64::try_from(timestamp).map_err(|_| {
        rusqlite::Error::IntegralValueOutOfRange(0, timestamp)
    })?;

    Ok(JournalRecord::new(timestamp, ContentHash::from_bytes(hash)))
}

fn epoch_param(epoch: Epoch) -> Result<i64> {
    i64::try_from(epoch)
        .map_err(|_| StoreError::InvalidData(format!("timestamp {} out of range", epoch)))
}

#[async_trait]
impl JournalStore for SqliteStore {
    async fn append(&self, record: &JournalRecord) -> Result<InsertResult> {
        let record = record.clone();
        let timestamp = epoch_param(record.timestamp)?;

        self.with_conn(move |conn| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT timestamp FROM journal WHERE hash = ?1",
                    params![record.hash.as_bytes()],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing) = existing {
                if existing == timestamp {
                    return Ok(InsertResult::AlreadyExists);
                }
                return Ok(InsertResult::Conflict {
                    existing_timestamp: existing as u64,
                });
            }

            conn.execute(
                "INSERT INTO journal (hash, timestamp, journaled_at) VALUES (?1, ?2, ?3)",
                params![record.hash.as_bytes(), timestamp, now_secs()],
            )?;

            Ok(InsertResult::Inserted)
        })
        .await
    }

    async fn recent(&self, n: usize) -> Result<Vec<JournalRecord>> {
        self.with_conn(move |conn| {
            let mut stmt = conn
                .prepare("SELECT timestamp, hash FROM journal ORDER BY timestamp DESC, hash DESC")
                .map_err(|e| StoreError::CursorUnavailable(e.to_string()))?;

            // Rows are stepped lazily; the statement is finalized when it
            // goes out of scope, including on an early error return.
            let records = stmt
                .query_map([], row_to_record)
                .map_err(|e| StoreError::CursorUnavailable(e.to_string()))?
                .take(n)
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(records)
        })
        .await
    }

    async fn lookup(&self, hash: &ContentHash) -> Result<Option<JournalRecord>> {
        let hash = hash.clone();

        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT timestamp, hash FROM journal WHERE hash = ?1",
                params![hash.as_bytes()],
                row_to_record,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn scan_window(&self, start: Epoch, end: Epoch) -> Result<Vec<JournalRecord>> {
        if start > end {
            return Ok(Vec::new());
        }
        let start = epoch_param(start)?;
        let end = i64::try_from(end).unwrap_or(i64::MAX);

        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT timestamp, hash FROM journal
                 WHERE timestamp >= ?1 AND timestamp <= ?2
                 ORDER BY timestamp, hash",
            )?;

            let records = stmt
                .query_map(params![start, end], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(records)
        })
        .await
    }

    async fn set_timestamp(&self, hash: &ContentHash, timestamp: Epoch) -> Result<bool> {
        let hash = hash.clone();
        let timestamp = epoch_param(timestamp)?;

        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE journal SET timestamp = ?2 WHERE hash = ?1",
                params![hash.as_bytes(), timestamp],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM journal", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }
}

fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ts: Epoch, name: &str) -> JournalRecord {
        JournalRecord::new(ts, ContentHash::digest(name.as_bytes()))
    }

    #[tokio::test]
    async fn test_append_and_lookup() {
        let store = SqliteStore::open_memory().unwrap();
        let record = rec(100, "a");

        assert_eq!(store.append(&record).await.unwrap(), InsertResult::Inserted);

        let found = store.lookup(&record.hash).await.unwrap().unwrap();
        assert_eq!(found, record);
        assert!(store
            .lookup(&ContentHash::digest(b"missing"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_idempotent_append() {
        let store = SqliteStore::open_memory().unwrap();
        let record = rec(100, "a");

        store.append(&record).await.unwrap();
        assert_eq!(
            store.append(&record).await.unwrap(),
            InsertResult::AlreadyExists
        );
        assert_eq!(
            store.append(&rec(101, "a")).await.unwrap(),
            InsertResult::Conflict {
                existing_timestamp: 100
            }
        );
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_recent_walks_backwards() {
        let store = SqliteStore::open_memory().unwrap();
        for (ts, name) in [(100, "a"), (300, "c"), (200, "b")] {
            store.append(&rec(ts, name)).await.unwrap();
        }

        let recent = store.recent(2).await.unwrap();
        let stamps: Vec<_> = recent.iter().map(|r| r.timestamp).collect();
        assert_eq!(stamps, vec![300, 200]);

        assert!(SqliteStore::open_memory()
            .unwrap()
            .recent(10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_scan_window_and_set_timestamp() {
        let store = SqliteStore::open_memory().unwrap();
        for (ts, name) in [(99, "x"), (100, "a"), (200, "b"), (201, "y")] {
            store.append(&rec(ts, name)).await.unwrap();
        }

        let window = store.scan_window(100, 200).await.unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].timestamp, 100);

        let a = ContentHash::digest(b"a");
        assert!(store.set_timestamp(&a, 50).await.unwrap());
        assert_eq!(store.scan_window(100, 200).await.unwrap().len(), 1);
        assert_eq!(store.lookup(&a).await.unwrap().unwrap().timestamp, 50);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.append(&rec(42, "kept")).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent, vec![rec(42, "kept")]);
    }
}
