//! Peer transport abstraction.
//!
//! The transport owns connections, handshakes, and the secure channel. The
//! sync engine only asks whether a peer is eligible, connects with a bound,
//! and writes whole frames.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::messages::PeerId;

/// Failures reported by a transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("peer {0} not found")]
    PeerNotFound(PeerId),

    #[error("connection refused by {0}")]
    Refused(PeerId),

    #[error("not connected to {0}")]
    NotConnected(PeerId),

    #[error("stream closed")]
    Closed,
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Transport trait for reaching replication peers.
///
/// Implementations must be thread-safe (Send + Sync). A failed write is a
/// total failure; no partial-write contract is assumed.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Get the local node's identity.
    fn local_peer_id(&self) -> PeerId;

    /// Whether the session with `peer` has an established secure channel.
    async fn is_secure(&self, peer: &PeerId) -> bool;

    /// Check if a specific peer is connected.
    async fn is_connected(&self, peer: &PeerId) -> bool;

    /// Connect to `peer`, giving up after `timeout`.
    async fn connect(&self, peer: &PeerId, timeout: Duration) -> Result<()>;

    /// Write one frame to the peer's stream.
    async fn write(&self, peer: &PeerId, frame: Bytes) -> Result<()>;
}

#[async_trait]
impl<T: PeerTransport + ?Sized> PeerTransport for std::sync::Arc<T> {
    fn local_peer_id(&self) -> PeerId {
        (**self).local_peer_id()
    }

    async fn is_secure(&self, peer: &PeerId) -> bool {
        (**self).is_secure(peer).await
    }

    async fn is_connected(&self, peer: &PeerId) -> bool {
        (**self).is_connected(peer).await
    }

    async fn connect(&self, peer: &PeerId, timeout: Duration) -> Result<()> {
        (**self).connect(peer, timeout).await
    }

    async fn write(&self, peer: &PeerId, frame: Bytes) -> Result<()> {
        (**self).write(peer, frame).await
    }
}

/// A simple in-memory transport for testing.
///
/// Uses channels to simulate streams between nodes. Each transport carries
/// switches for exercising the failure paths of a sync.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex, RwLock};

    /// A frame as seen by the receiving node.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Frame {
        pub from: PeerId,
        pub bytes: Bytes,
    }

    /// Shared state for the memory transport network.
    pub struct MemoryNetwork {
        /// Sender channels for each node.
        senders: RwLock<HashMap<PeerId, mpsc::Sender<Frame>>>,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Create a transport attached to this network.
        pub async fn create_transport(self: &Arc<Self>, peer_id: PeerId) -> MemoryTransport {
            let (tx, rx) = mpsc::channel(1000);

            self.senders.write().await.insert(peer_id, tx);

            MemoryTransport {
                peer_id,
                network: Arc::clone(self),
                receiver: Mutex::new(rx),
                connected: RwLock::new(HashSet::new()),
                secure: AtomicBool::new(true),
                refuse_connect: AtomicBool::new(false),
                hang_connect: AtomicBool::new(false),
                writes_allowed: AtomicUsize::new(usize::MAX),
                writes: AtomicUsize::new(0),
            }
        }

        /// Detach a node; later connects and writes to it fail.
        pub async fn remove(&self, peer_id: &PeerId) {
            self.senders.write().await.remove(peer_id);
        }
    }

    impl Default for MemoryNetwork {
        fn default() -> Self {
            Self {
                senders: RwLock::new(HashMap::new()),
            }
        }
    }

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        peer_id: PeerId,
        network: Arc<MemoryNetwork>,
        receiver: Mutex<mpsc::Receiver<Frame>>,
        connected: RwLock<HashSet<PeerId>>,
        secure: AtomicBool,
        refuse_connect: AtomicBool,
        hang_connect: AtomicBool,
        writes_allowed: AtomicUsize,
        writes: AtomicUsize,
    }

    impl MemoryTransport {
        /// Report every session as secure or not.
        pub fn set_secure(&self, secure: bool) {
            self.secure.store(secure, Ordering::SeqCst);
        }

        /// Make `connect` fail immediately.
        pub fn refuse_connections(&self, refuse: bool) {
            self.refuse_connect.store(refuse, Ordering::SeqCst);
        }

        /// Make `connect` stall for its whole timeout, then fail.
        pub fn hang_connections(&self, hang: bool) {
            self.hang_connect.store(hang, Ordering::SeqCst);
        }

        /// Let `n` more writes succeed, then fail every write.
        pub fn fail_writes_after(&self, n: usize) {
            self.writes.store(0, Ordering::SeqCst);
            self.writes_allowed.store(n, Ordering::SeqCst);
        }

        /// Frames written successfully so far.
        pub fn frames_written(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        /// Drop the connection to `peer`.
        pub async fn disconnect(&self, peer: &PeerId) {
            self.connected.write().await.remove(peer);
        }

        /// Receive the next frame from any peer.
        pub async fn recv(&self) -> Option<Frame> {
            self.receiver.lock().await.recv().await
        }

        /// Receive with timeout. `None` if nothing arrived in time.
        pub async fn recv_timeout(&self, timeout: Duration) -> Option<Frame> {
            let mut rx = self.receiver.lock().await;
            tokio::time::timeout(timeout, rx.recv()).await.ok().flatten()
        }

        /// Take every frame already delivered, without waiting.
        pub async fn drain(&self) -> Vec<Frame> {
            let mut rx = self.receiver.lock().await;
            let mut frames = Vec::new();
            while let Ok(frame) = rx.try_recv() {
                frames.push(frame);
            }
            frames
        }
    }

    #[async_trait]
    impl PeerTransport for MemoryTransport {
        fn local_peer_id(&self) -> PeerId {
            self.peer_id
        }

        async fn is_secure(&self, _peer: &PeerId) -> bool {
            self.secure.load(Ordering::SeqCst)
        }

        async fn is_connected(&self, peer: &PeerId) -> bool {
            self.connected.read().await.contains(peer)
        }

        async fn connect(&self, peer: &PeerId, timeout: Duration) -> Result<()> {
            if self.hang_connect.load(Ordering::SeqCst) {
                tokio::time::sleep(timeout).await;
                return Err(TransportError::Refused(*peer));
            }
            if self.refuse_connect.load(Ordering::SeqCst) {
                return Err(TransportError::Refused(*peer));
            }
            if !self.network.senders.read().await.contains_key(peer) {
                return Err(TransportError::PeerNotFound(*peer));
            }
            self.connected.write().await.insert(*peer);
            Ok(())
        }

        async fn write(&self, peer: &PeerId, frame: Bytes) -> Result<()> {
            if !self.is_connected(peer).await {
                return Err(TransportError::NotConnected(*peer));
            }
            if self.writes.load(Ordering::SeqCst) >= self.writes_allowed.load(Ordering::SeqCst) {
                return Err(TransportError::Closed);
            }

            let senders = self.network.senders.read().await;
            let sender = senders
                .get(peer)
                .ok_or(TransportError::PeerNotFound(*peer))?;
            sender
                .send(Frame {
                    from: self.peer_id,
                    bytes: frame,
                })
                .await
                .map_err(|_| TransportError::Closed)?;

            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
