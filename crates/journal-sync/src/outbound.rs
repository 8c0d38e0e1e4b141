//! Outbound path: snapshot recent journal activity and ship it to a peer.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use journal_core::{
    CborCodec, Clock, CoreError, Epoch, HashAllocator, HeapAllocator, JournalMessage,
    JournalRecord, MessageBuilder, MessageCodec,
};
use journal_store::JournalStore;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::messages::{PeerId, STREAM_HEADER};
use crate::peer::ReplicationPeer;
use crate::transport::PeerTransport;

/// Result of one outbound sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Entries shipped. Zero means the journal was empty and nothing was sent.
    pub entries_sent: usize,
    /// `[start_epoch, end_epoch]` of the shipped message.
    pub window: Option<(Epoch, Epoch)>,
}

impl SyncReport {
    pub fn sent(&self) -> bool {
        self.entries_sent > 0
    }
}

/// The outbound sync engine.
///
/// Holds no per-peer state: the caller owns each [`ReplicationPeer`] and must
/// not run two syncs for the same peer at once.
pub struct JournalSync<S, T> {
    store: S,
    transport: T,
    clock: Arc<dyn Clock>,
    codec: Arc<dyn MessageCodec>,
    alloc: Arc<dyn HashAllocator>,
    config: SyncConfig,
    cancel: CancellationToken,
}

impl<S: JournalStore, T: PeerTransport> JournalSync<S, T> {
    pub fn new(store: S, transport: T, clock: Arc<dyn Clock>, config: SyncConfig) -> Self {
        Self {
            store,
            transport,
            clock,
            codec: Arc::new(CborCodec),
            alloc: Arc::new(HeapAllocator),
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use a different message codec.
    pub fn with_codec(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Copy hashes through `alloc` when building messages.
    pub fn with_allocator(mut self, alloc: Arc<dyn HashAllocator>) -> Self {
        self.alloc = alloc;
        self
    }

    /// Abort bounded waits when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Sync our recent journal to `peer`.
    ///
    /// `peer` is updated only after the header and body have both been
    /// written. Every failure leaves it untouched.
    pub async fn sync(&self, peer: &mut ReplicationPeer) -> Result<SyncReport> {
        self.check_eligible(&peer.id).await?;

        let records = self.store.recent(self.config.max_entries).await?;
        if records.is_empty() {
            debug!(peer = %peer.id, "journal empty, nothing to sync");
            return Ok(SyncReport::default());
        }

        let message = self.build_message(&records, self.clock.now_epoch())?;
        drop(records);

        self.deliver(&peer.id, &message).await?;

        peer.mark_synced(message.current_epoch, message.end_epoch);
        debug!(
            peer = %peer.id,
            entries = message.len(),
            start = message.start_epoch,
            end = message.end_epoch,
            "journal synced"
        );

        Ok(SyncReport {
            entries_sent: message.len(),
            window: message.window(),
        })
    }

    /// Ship an already-built message to `peer`, without touching peer
    /// bookkeeping.
    pub async fn send(&self, peer: &PeerId, message: &JournalMessage) -> Result<()> {
        self.check_eligible(peer).await?;
        self.deliver(peer, message).await
    }

    /// Connect if needed, encode, then write header and body as two frames.
    async fn deliver(&self, peer: &PeerId, message: &JournalMessage) -> Result<()> {
        self.ensure_connected(peer).await?;

        let body = self.codec.encode(message).map_err(|e| {
            warn!(peer = %peer, error = %e, "failed to encode journal message");
            SyncError::EncodingFailed(e.to_string())
        })?;

        self.write(peer, Bytes::from_static(STREAM_HEADER.as_bytes()))
            .await?;
        self.write(peer, Bytes::from(body)).await
    }

    /// Build a message from `records` using the configured allocator.
    ///
    /// On failure every entry built so far is dropped with the builder.
    pub fn build_message(
        &self,
        records: &[JournalRecord],
        current_epoch: Epoch,
    ) -> Result<JournalMessage> {
        let mut builder = MessageBuilder::with_allocator(self.alloc.as_ref());
        for record in records {
            builder.push_record(record).map_err(|e| match e {
                CoreError::AllocationFailed(_) => SyncError::OutOfMemory(e.to_string()),
                other => SyncError::EncodingFailed(other.to_string()),
            })?;
        }
        Ok(builder.finish(current_epoch))
    }

    async fn check_eligible(&self, peer: &PeerId) -> Result<()> {
        if *peer == self.transport.local_peer_id() {
            return Err(SyncError::PeerNotEligible(format!("{} is the local node", peer)));
        }
        if !self.transport.is_secure(peer).await {
            return Err(SyncError::PeerNotEligible(format!(
                "{} has no secure channel",
                peer
            )));
        }
        Ok(())
    }

    async fn ensure_connected(&self, peer: &PeerId) -> Result<()> {
        if self.transport.is_connected(peer).await {
            return Ok(());
        }

        let limit = self.config.connect_timeout();
        let reason = match self.bounded(limit, self.transport.connect(peer, limit)).await? {
            Some(Ok(())) => None,
            Some(Err(e)) => Some(e.to_string()),
            None => Some(format!("timed out after {}s", limit.as_secs())),
        };

        if let Some(reason) = reason {
            warn!(peer = %peer, %reason, "connect failed");
            return Err(SyncError::ConnectionFailed {
                peer: *peer,
                reason,
            });
        }

        if !self.transport.is_connected(peer).await {
            warn!(peer = %peer, "not connected after connect");
            return Err(SyncError::ConnectionFailed {
                peer: *peer,
                reason: "not connected after connect".into(),
            });
        }
        Ok(())
    }

    async fn write(&self, peer: &PeerId, frame: Bytes) -> Result<()> {
        let limit = self.config.connect_timeout();
        let reason = match self.bounded(limit, self.transport.write(peer, frame)).await? {
            Some(Ok(())) => return Ok(()),
            Some(Err(e)) => e.to_string(),
            None => format!("timed out after {}s", limit.as_secs()),
        };
        warn!(peer = %peer, %reason, "write failed");
        Err(SyncError::WriteFailed {
            peer: *peer,
            reason,
        })
    }

    /// Run `fut` for at most `limit`. `None` on timeout, `Cancelled` if the
    /// token fires first.
    async fn bounded<F: Future>(&self, limit: Duration, fut: F) -> Result<Option<F::Output>> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(SyncError::Cancelled),
            res = tokio::time::timeout(limit, fut) => Ok(res.ok()),
        }
    }
}
