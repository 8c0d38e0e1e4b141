//! Reconciliation: diff a remote journal snapshot against local state.
//!
//! [`reconcile`] is pure. The I/O needed to feed it happens up front in
//! [`LocalSnapshot::load`], so the diff itself never touches the store.
//!
//! ## Output order
//!
//! 1. One item per remote entry that differs from local state, in the
//!    order the remote sent them (`EntryNeeded` or `TimeAdjust`).
//! 2. Then one `RemoteNeeds` per local record inside the remote's window
//!    whose hash the remote did not list, in local scan order.

use std::collections::{HashMap, HashSet};

use journal_core::{ContentHash, CoreError, Epoch, JournalEntry, JournalRecord, ToDo};
use journal_store::JournalStore;

type CoreResult<T> = std::result::Result<T, CoreError>;

/// Read access to local journal state, as reconciliation needs it.
pub trait LocalJournal {
    /// The local timestamp for `hash`, if journaled.
    fn lookup(&self, hash: &ContentHash) -> Option<Epoch>;

    /// Local records with `start <= timestamp <= end`, ascending.
    fn scan_window(&self, start: Epoch, end: Epoch) -> Vec<JournalRecord>;
}

/// Local state captured for one reconciliation run.
///
/// Holds the lookups for the remote's hashes and the records inside the
/// remote's window, nothing else.
#[derive(Debug, Default, Clone)]
pub struct LocalSnapshot {
    by_hash: HashMap<ContentHash, Epoch>,
    window: Vec<JournalRecord>,
}

impl LocalSnapshot {
    /// Build a snapshot directly from records. Used by tests and benches.
    pub fn from_records(records: impl IntoIterator<Item = JournalRecord>) -> Self {
        let mut window: Vec<JournalRecord> = records.into_iter().collect();
        window.sort_by(|a, b| (a.timestamp, &a.hash).cmp(&(b.timestamp, &b.hash)));
        let by_hash = window
            .iter()
            .map(|r| (r.hash.clone(), r.timestamp))
            .collect();
        Self { by_hash, window }
    }

    /// Query the store for everything reconciling `entries` will need.
    ///
    /// One point lookup per remote entry plus one window scan. An empty
    /// `entries` slice issues no queries.
    pub async fn load<S: JournalStore + ?Sized>(
        store: &S,
        entries: &[JournalEntry],
        window: Option<(Epoch, Epoch)>,
    ) -> journal_store::Result<Self> {
        let mut snapshot = Self::default();
        if entries.is_empty() {
            return Ok(snapshot);
        }

        for entry in entries {
            if let Some(record) = store.lookup(&entry.hash).await? {
                snapshot.by_hash.insert(record.hash, record.timestamp);
            }
        }

        if let Some((start, end)) = window {
            snapshot.window = store.scan_window(start, end).await?;
        }

        Ok(snapshot)
    }
}

impl LocalJournal for LocalSnapshot {
    fn lookup(&self, hash: &ContentHash) -> Option<Epoch> {
        self.by_hash.get(hash).copied()
    }

    fn scan_window(&self, start: Epoch, end: Epoch) -> Vec<JournalRecord> {
        self.window
            .iter()
            .filter(|r| r.timestamp >= start && r.timestamp <= end)
            .cloned()
            .collect()
    }
}

/// Diff `remote` against `local`.
///
/// `window` is the remote's declared `[start_epoch, end_epoch]`; `None` (or
/// an empty `remote`) skips the `RemoteNeeds` pass. Runs in O(M + K) for M
/// remote entries and K local records in the window.
///
/// Every emitted item owns a fresh copy of its hash. On allocation failure
/// the partial list is dropped and the error returned.
pub fn reconcile<L: LocalJournal + ?Sized>(
    remote: &[JournalEntry],
    local: &L,
    window: Option<(Epoch, Epoch)>,
) -> CoreResult<Vec<ToDo>> {
    let mut todos = Vec::new();
    if remote.is_empty() {
        return Ok(todos);
    }

    for entry in remote {
        let todo = match local.lookup(&entry.hash) {
            None => ToDo::EntryNeeded {
                hash: entry.hash.try_copy()?,
                remote_timestamp: entry.timestamp,
            },
            Some(local_ts) if local_ts == entry.timestamp => continue,
            Some(local_ts) => ToDo::TimeAdjust {
                hash: entry.hash.try_copy()?,
                local_timestamp: local_ts,
                remote_timestamp: entry.timestamp,
            },
        };
        push(&mut todos, todo)?;
    }

    let Some((start, end)) = window else {
        return Ok(todos);
    };

    let listed: HashSet<&ContentHash> = remote.iter().map(|e| &e.hash).collect();
    for record in local.scan_window(start, end) {
        if listed.contains(&record.hash) {
            continue;
        }
        push(
            &mut todos,
            ToDo::RemoteNeeds {
                hash: record.hash,
                local_timestamp: record.timestamp,
            },
        )?;
    }

    Ok(todos)
}

fn push(todos: &mut Vec<ToDo>, todo: ToDo) -> CoreResult<()> {
    todos
        .try_reserve(1)
        .map_err(|_| CoreError::AllocationFailed(std::mem::size_of::<ToDo>()))?;
    todos.push(todo);
    Ok(())
}
