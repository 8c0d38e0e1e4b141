//! Registry of replication peers.
//!
//! Each peer's bookkeeping sits behind its own async mutex. Holding that
//! lock for the length of a sync is what keeps at most one sync per peer
//! in flight.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use journal_sync::{PeerId, ReplicationPeer};

#[derive(Default)]
pub struct ReplicationPeers {
    peers: RwLock<HashMap<PeerId, Arc<Mutex<ReplicationPeer>>>>,
}

impl ReplicationPeers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id`. Returns false if it was already registered.
    pub async fn add(&self, id: PeerId) -> bool {
        let mut peers = self.peers.write().await;
        if peers.contains_key(&id) {
            return false;
        }
        peers.insert(id, Arc::new(Mutex::new(ReplicationPeer::new(id))));
        true
    }

    pub async fn remove(&self, id: &PeerId) -> bool {
        self.peers.write().await.remove(id).is_some()
    }

    /// The lockable bookkeeping for `id`.
    pub async fn entry(&self, id: &PeerId) -> Option<Arc<Mutex<ReplicationPeer>>> {
        self.peers.read().await.get(id).cloned()
    }

    /// A copy of the current bookkeeping for `id`. Waits for any sync in
    /// flight to that peer.
    pub async fn snapshot(&self, id: &PeerId) -> Option<ReplicationPeer> {
        let entry = self.entry(id).await?;
        let peer = entry.lock().await;
        Some(peer.clone())
    }

    /// Registered peer IDs, sorted.
    pub async fn ids(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self.peers.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
