//! Reconciliation properties over generated journal pairs.

use std::collections::HashSet;

use proptest::prelude::*;

use journal::core::{ContentHash, Epoch, JournalEntry, JournalRecord, ToDo};
use journal::store::MemoryStore;
use journal::sync::{reconcile, LocalSnapshot};
use journal_testkit::JournalPair;

fn remote_entries(pair: &JournalPair) -> Vec<JournalEntry> {
    pair.remote
        .iter()
        .map(|r| JournalEntry::new(r.timestamp, true, r.hash.clone()))
        .collect()
}

fn window(entries: &[JournalEntry]) -> Option<(Epoch, Epoch)> {
    let start = entries.iter().map(|e| e.timestamp).min()?;
    let end = entries.iter().map(|e| e.timestamp).max()?;
    Some((start, end))
}

/// What reconciling `remote` against `local` must produce, computed
/// directly from the two record lists.
fn expected(remote: &[JournalEntry], local: &[JournalRecord]) -> Vec<ToDo> {
    let local_time = |hash: &ContentHash| {
        local
            .iter()
            .find(|r| &r.hash == hash)
            .map(|r| r.timestamp)
    };

    let mut todos: Vec<ToDo> = remote
        .iter()
        .filter_map(|e| match local_time(&e.hash) {
            None => Some(ToDo::EntryNeeded {
                hash: e.hash.clone(),
                remote_timestamp: e.timestamp,
            }),
            Some(ts) if ts == e.timestamp => None,
            Some(ts) => Some(ToDo::TimeAdjust {
                hash: e.hash.clone(),
                local_timestamp: ts,
                remote_timestamp: e.timestamp,
            }),
        })
        .collect();

    let Some((start, end)) = window(remote) else {
        return Vec::new();
    };
    let listed: HashSet<&ContentHash> = remote.iter().map(|e| &e.hash).collect();
    let mut unlisted: Vec<&JournalRecord> = local
        .iter()
        .filter(|r| r.timestamp >= start && r.timestamp <= end)
        .filter(|r| !listed.contains(&r.hash))
        .collect();
    unlisted.sort_by(|a, b| (a.timestamp, &a.hash).cmp(&(b.timestamp, &b.hash)));

    todos.extend(unlisted.into_iter().map(|r| ToDo::RemoteNeeds {
        hash: r.hash.clone(),
        local_timestamp: r.timestamp,
    }));
    todos
}

proptest! {
    #[test]
    fn reconcile_matches_model(pair: JournalPair) {
        let remote = remote_entries(&pair);
        let local = LocalSnapshot::from_records(pair.local.clone());

        let todos = reconcile(&remote, &local, window(&remote)).unwrap();
        prop_assert_eq!(todos, expected(&remote, &pair.local));
    }

    #[test]
    fn remote_needs_complete_and_last(pair: JournalPair) {
        let remote = remote_entries(&pair);
        let local = LocalSnapshot::from_records(pair.local.clone());
        let todos = reconcile(&remote, &local, window(&remote)).unwrap();

        let first = todos
            .iter()
            .position(ToDo::is_remote_needs)
            .unwrap_or(todos.len());
        prop_assert!(todos[first..].iter().all(ToDo::is_remote_needs));
        prop_assert!(!todos[..first].iter().any(ToDo::is_remote_needs));

        if let Some((start, end)) = window(&remote) {
            let listed: HashSet<&ContentHash> = remote.iter().map(|e| &e.hash).collect();
            let owed = pair
                .local
                .iter()
                .filter(|r| r.timestamp >= start && r.timestamp <= end)
                .filter(|r| !listed.contains(&r.hash))
                .count();
            prop_assert_eq!(todos.len() - first, owed);

            let needs: Vec<Epoch> = todos[first..]
                .iter()
                .map(|t| match t {
                    ToDo::RemoteNeeds { local_timestamp, .. } => *local_timestamp,
                    _ => unreachable!(),
                })
                .collect();
            prop_assert!(needs.windows(2).all(|w| w[0] <= w[1]));
        } else {
            prop_assert!(todos.is_empty());
        }
    }

    #[test]
    fn snapshot_from_store_reconciles_like_records(pair: JournalPair) {
        let remote = remote_entries(&pair);
        let store = MemoryStore::with_records(pair.local.clone());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let loaded = runtime
            .block_on(LocalSnapshot::load(&store, &remote, window(&remote)))
            .unwrap();

        let from_store = reconcile(&remote, &loaded, window(&remote)).unwrap();
        prop_assert_eq!(from_store, expected(&remote, &pair.local));
    }
}
