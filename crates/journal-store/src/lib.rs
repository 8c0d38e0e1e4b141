//! # Journal Store
//!
//! Storage abstraction for journal records. Provides a trait-based interface
//! with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The sync engine reads the journal through the [`JournalStore`] trait and
//! never touches a backend directly. The primary implementation is
//! [`SqliteStore`], with [`MemoryStore`] for testing.
//!
//! ## Key Types
//!
//! - [`JournalStore`] - The async trait for all journal reads and writes
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`JournalCursor`] - Backwards walk over the in-memory journal
//! - [`InsertResult`] - Result of journaling a record
//!
//! ## Usage
//!
//! ```rust,no_run
//! use journal_core::{ContentHash, JournalRecord};
//! use journal_store::{JournalStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("journal.db").unwrap();
//!
//!     let record = JournalRecord::new(1_700_000_000, ContentHash::digest(b"block"));
//!     store.append(&record).await.unwrap();
//!
//!     let recent = store.recent(10).await.unwrap();
//!     assert_eq!(recent[0], record);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent appends**: journaling the same record twice returns `AlreadyExists`
//! - **Conflict detection**: the same hash at a different time returns `Conflict`
//! - **Empty is not an error**: `recent` on an empty journal is `Ok(vec![])`

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::{JournalCursor, MemoryStore};
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, JournalStore};
