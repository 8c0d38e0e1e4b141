//! Handing reconciliation results to whoever acts on them.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use journal_core::{Epoch, ToDo};

use crate::error::Result;
use crate::messages::PeerId;

/// Receives the ToDo list computed for each accepted inbound message.
///
/// The inbound handler only computes; fetching content, moving timestamps,
/// and notifying the remote are the consumer's business. An error means
/// some of the list was not acted on; the handler passes it to the host.
#[async_trait]
pub trait TodoConsumer: Send + Sync {
    async fn consume(&self, peer: &PeerId, todos: Vec<ToDo>) -> Result<()>;
}

/// Discards every list.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreTodos;

#[async_trait]
impl TodoConsumer for IgnoreTodos {
    async fn consume(&self, _peer: &PeerId, _todos: Vec<ToDo>) -> Result<()> {
        Ok(())
    }
}

/// Keeps every list it is handed, per peer, in arrival order.
#[derive(Debug, Default)]
pub struct CollectTodos {
    batches: Mutex<Vec<(PeerId, Vec<ToDo>)>>,
}

impl CollectTodos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything collected so far.
    pub fn take(&self) -> Vec<(PeerId, Vec<ToDo>)> {
        match self.batches.lock() {
            Ok(mut batches) => std::mem::take(&mut *batches),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    /// All collected items, flattened.
    pub fn todos(&self) -> Vec<ToDo> {
        let batches = match self.batches.lock() {
            Ok(batches) => batches,
            Err(poisoned) => poisoned.into_inner(),
        };
        batches.iter().flat_map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl TodoConsumer for CollectTodos {
    async fn consume(&self, peer: &PeerId, todos: Vec<ToDo>) -> Result<()> {
        let mut batches = match self.batches.lock() {
            Ok(batches) => batches,
            Err(poisoned) => poisoned.into_inner(),
        };
        batches.push((*peer, todos));
        Ok(())
    }
}

/// Which timestamp wins when both sides journaled the same content at
/// different times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    /// The older of the two. Converges: both peers settle on the minimum.
    #[default]
    Earliest,
    /// The newer of the two.
    Latest,
    /// Never move a local record.
    KeepLocal,
    /// Always take the remote's time.
    AdoptRemote,
}

impl TimestampPolicy {
    pub fn resolve(self, local: Epoch, remote: Epoch) -> Epoch {
        match self {
            TimestampPolicy::Earliest => local.min(remote),
            TimestampPolicy::Latest => local.max(remote),
            TimestampPolicy::KeepLocal => local,
            TimestampPolicy::AdoptRemote => remote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::ContentHash;

    #[test]
    fn test_policy_resolve() {
        assert_eq!(TimestampPolicy::default(), TimestampPolicy::Earliest);
        assert_eq!(TimestampPolicy::Earliest.resolve(150, 100), 100);
        assert_eq!(TimestampPolicy::Latest.resolve(150, 100), 150);
        assert_eq!(TimestampPolicy::KeepLocal.resolve(150, 100), 150);
        assert_eq!(TimestampPolicy::AdoptRemote.resolve(150, 100), 100);
    }

    #[test]
    fn test_policy_serde_names() {
        let policy: TimestampPolicy = serde_json::from_str("\"adopt_remote\"").unwrap();
        assert_eq!(policy, TimestampPolicy::AdoptRemote);
    }

    #[tokio::test]
    async fn test_collect_todos() {
        let collector = CollectTodos::new();
        let peer = PeerId::from_bytes([7; 32]);
        let todo = ToDo::EntryNeeded {
            hash: ContentHash::digest(b"a"),
            remote_timestamp: 1,
        };

        collector.consume(&peer, vec![todo.clone()]).await.unwrap();
        collector.consume(&peer, vec![]).await.unwrap();

        assert_eq!(collector.todos(), vec![todo]);
        let batches = collector.take();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].0, peer);
        assert!(collector.take().is_empty());
    }

    #[tokio::test]
    async fn test_collect_todos_survives_poisoned_lock() {
        let collector = std::sync::Arc::new(CollectTodos::new());
        let poisoner = collector.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.batches.lock().unwrap();
            panic!("poison the batch lock");
        })
        .join();
        assert!(collector.batches.is_poisoned());

        let peer = PeerId::from_bytes([7; 32]);
        let todo = ToDo::RemoteNeeds {
            hash: ContentHash::digest(b"x"),
            local_timestamp: 5,
        };
        collector.consume(&peer, vec![todo.clone()]).await.unwrap();

        assert_eq!(collector.todos(), vec![todo]);
        assert_eq!(collector.take().len(), 1);
    }
}
