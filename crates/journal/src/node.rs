//! The journal node: store, transport, clock, and sync wired together.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use journal_core::{Clock, ContentHash, JournalRecord, ToDo, MAX_MESSAGE_ENTRIES};
use journal_store::{InsertResult, JournalStore};
use journal_sync::{
    InboundHandler, JournalProtocol, JournalSync, PeerId, PeerTransport, ProtocolHandler,
    ReplicationPeer, SyncError, SyncReport, TodoConsumer,
};

use crate::apply::{ApplyReport, ContentFetcher, TodoApplier};
use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::peers::ReplicationPeers;

/// What became of an incoming message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// Reconciled and acted on.
    Applied(ApplyReport),
    /// The node is shut down; the host should stop reading the stream.
    Closed,
}

/// A journal-replicating node.
///
/// Owns the outbound engine, the protocol handler handed to the host
/// session layer, and the per-peer bookkeeping.
pub struct JournalNode<S, T> {
    store: Arc<S>,
    transport: Arc<T>,
    clock: Arc<dyn Clock>,
    peers: ReplicationPeers,
    actor: Arc<Actor<S, T>>,
    protocol: Arc<JournalProtocol<Arc<S>>>,
    cancel: CancellationToken,
}

/// The part of the node that reacts to reconciliation results. Shared
/// with the protocol handler as its ToDo consumer.
struct Actor<S, T> {
    sync: JournalSync<Arc<S>, Arc<T>>,
    applier: TodoApplier<Arc<S>>,
    clock: Arc<dyn Clock>,
    notify_remote_needs: bool,
}

impl<S, T> JournalNode<S, T>
where
    S: JournalStore + 'static,
    T: PeerTransport + 'static,
{
    pub fn new(
        store: S,
        transport: T,
        clock: Arc<dyn Clock>,
        fetcher: Arc<dyn ContentFetcher>,
        config: NodeConfig,
    ) -> Self {
        let store = Arc::new(store);
        let transport = Arc::new(transport);
        let cancel = CancellationToken::new();

        let sync = JournalSync::new(
            Arc::clone(&store),
            Arc::clone(&transport),
            Arc::clone(&clock),
            config.sync.clone(),
        )
        .with_cancellation(cancel.child_token());

        let actor = Arc::new(Actor {
            sync,
            applier: TodoApplier::new(Arc::clone(&store), fetcher, config.timestamp_policy),
            clock: Arc::clone(&clock),
            notify_remote_needs: config.notify_remote_needs,
        });

        let inbound = InboundHandler::new(Arc::clone(&store), Arc::clone(&clock), config.sync);
        let protocol = Arc::new(JournalProtocol::new(
            inbound,
            Arc::clone(&actor) as Arc<dyn TodoConsumer>,
        ));

        Self {
            store,
            transport,
            clock,
            peers: ReplicationPeers::new(),
            actor,
            protocol,
            cancel,
        }
    }

    pub fn local_id(&self) -> PeerId {
        self.transport.local_peer_id()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn peers(&self) -> &ReplicationPeers {
        &self.peers
    }

    /// Journal locally stored content at the current time.
    pub async fn record_pin(&self, hash: ContentHash) -> Result<InsertResult> {
        let record = JournalRecord::new(self.clock.now_epoch(), hash);
        Ok(self.store.append(&record).await?)
    }

    /// Register a replication peer. Returns false if already registered.
    pub async fn add_peer(&self, id: PeerId) -> bool {
        self.peers.add(id).await
    }

    pub async fn peer(&self, id: &PeerId) -> Option<ReplicationPeer> {
        self.peers.snapshot(id).await
    }

    /// Sync our recent journal to a registered peer.
    ///
    /// Waits for any sync already in flight to the same peer.
    pub async fn sync_peer(&self, id: &PeerId) -> Result<SyncReport> {
        if self.is_shut_down() {
            return Err(NodeError::ShutDown);
        }
        let entry = self
            .peers
            .entry(id)
            .await
            .ok_or(NodeError::PeerNotFound(*id))?;
        let mut peer = entry.lock().await;
        Ok(self.actor.sync.sync(&mut peer).await?)
    }

    /// Sync to every registered peer, one at a time.
    ///
    /// A failure for one peer does not stop the others.
    pub async fn sync_all(&self) -> Vec<(PeerId, Result<SyncReport>)> {
        let mut results = Vec::new();
        for id in self.peers.ids().await {
            let result = self.sync_peer(&id).await;
            if let Err(e) = &result {
                warn!(peer = %id, error = %e, "sync failed");
            }
            results.push((id, result));
        }
        results
    }

    /// Process a journal message received from `peer`: reconcile it, act
    /// on the result, and report what happened.
    ///
    /// Failures while acting are in the report rather than the error, so
    /// the caller sees what was applied alongside what was not.
    pub async fn handle_incoming(&self, peer: &PeerId, bytes: &[u8]) -> Result<Incoming> {
        if self.protocol.is_shut_down() {
            return Ok(Incoming::Closed);
        }
        let todos = self.protocol.inbound().compute(bytes, peer).await?;
        Ok(Incoming::Applied(self.actor.act(peer, todos).await))
    }

    /// The handler to register with the host session layer.
    pub fn protocol(&self) -> Arc<dyn ProtocolHandler> {
        Arc::clone(&self.protocol) as Arc<dyn ProtocolHandler>
    }

    /// Cancel bounded waits and close the protocol handler. Idempotent.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            info!(node = %self.local_id(), "shutting down journal node");
        }
        self.cancel.cancel();
        self.protocol.shutdown();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<S: JournalStore, T: PeerTransport> Actor<S, T> {
    /// Apply `todos`, then offer the peer whatever it lacks.
    ///
    /// A failed offer is recorded in the report; what was already applied
    /// stays applied.
    async fn act(&self, peer: &PeerId, todos: Vec<ToDo>) -> ApplyReport {
        let mut report = self.applier.apply(peer, todos).await;

        if self.notify_remote_needs && !report.remote_needs.is_empty() {
            if let Err(e) = self.offer(peer, &mut report).await {
                warn!(peer = %peer, error = %e, "offering missing content failed");
                report.offer_error = Some(e.to_string());
            }
            debug!(peer = %peer, offered = report.offered, "offered missing content");
        }

        report
    }

    async fn offer(&self, peer: &PeerId, report: &mut ApplyReport) -> journal_sync::Result<()> {
        for chunk in report.remote_needs.chunks(MAX_MESSAGE_ENTRIES) {
            let message = self
                .sync
                .build_message(chunk, self.clock.now_epoch())?
                .into_offer();
            self.sync.send(peer, &message).await?;
            report.offered += message.len();
        }
        Ok(())
    }
}

#[async_trait]
impl<S: JournalStore, T: PeerTransport> TodoConsumer for Actor<S, T> {
    async fn consume(&self, peer: &PeerId, todos: Vec<ToDo>) -> journal_sync::Result<()> {
        let report = self.act(peer, todos).await;
        if report.is_clean() {
            return Ok(());
        }
        let reason = match (&report.offer_error, report.failures.first()) {
            (Some(offer), _) => format!("offer failed: {}", offer),
            (None, Some(failure)) => format!("{}: {}", failure.hash, failure.reason),
            (None, None) => String::new(),
        };
        Err(SyncError::ActionFailed {
            peer: *peer,
            failed: report.failed(),
            reason,
        })
    }
}

impl<S, T> Drop for JournalNode<S, T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

