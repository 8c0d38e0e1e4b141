//! Inbound path: decode, clock-skew gate, reconcile.

use std::sync::Arc;

use tracing::{debug, error};

use journal_core::{CborCodec, Clock, Epoch, JournalMessage, MessageCodec, ToDo};
use journal_store::JournalStore;

use crate::actions::TodoConsumer;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::messages::{strip_stream_header, PeerId};
use crate::reconcile::{reconcile, LocalSnapshot};

/// What the host should do with the stream after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// The message was reconciled and `todos` items were handed on.
    Processed { todos: usize },
    /// Stop reading this stream.
    Close,
}

/// Check `remote` against `now`. Returns the measured skew on rejection.
///
/// A skew of exactly `limit` seconds is accepted.
pub fn check_clock_skew(now: Epoch, remote: Epoch, limit: u64) -> std::result::Result<u64, u64> {
    let skew = now.abs_diff(remote);
    if skew > limit {
        Err(skew)
    } else {
        Ok(skew)
    }
}

/// Validates incoming journal snapshots and reconciles them against the
/// local store.
pub struct InboundHandler<S> {
    store: S,
    clock: Arc<dyn Clock>,
    codec: Arc<dyn MessageCodec>,
    config: SyncConfig,
}

impl<S: JournalStore> InboundHandler<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, config: SyncConfig) -> Self {
        Self {
            store,
            clock,
            codec: Arc::new(CborCodec),
            config,
        }
    }

    /// Use a different message codec.
    pub fn with_codec(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decode `raw` as sent by `peer`, gate it on clock skew, reconcile it,
    /// and pass the resulting list to `consumer`.
    pub async fn handle(
        &self,
        raw: &[u8],
        peer: &PeerId,
        consumer: &dyn TodoConsumer,
    ) -> Result<HandleOutcome> {
        let todos = self.compute(raw, peer).await?;
        let count = todos.len();
        consumer.consume(peer, todos).await?;
        Ok(HandleOutcome::Processed { todos: count })
    }

    /// Everything `handle` does except delivery: the ToDo list is returned.
    pub async fn compute(&self, raw: &[u8], peer: &PeerId) -> Result<Vec<ToDo>> {
        let message = self.decode(raw)?;

        let now = self.clock.now_epoch();
        if let Err(skew) = check_clock_skew(now, message.current_epoch, self.config.max_clock_skew_secs)
        {
            error!(
                peer = %peer,
                skew,
                limit = self.config.max_clock_skew_secs,
                "rejecting journal: peer clock out of tolerance"
            );
            return Err(SyncError::ClockSkewExceeded {
                peer: *peer,
                skew,
                limit: self.config.max_clock_skew_secs,
            });
        }

        // An offer answers our own message; scanning its window would
        // offer back what the sender did not list, and so on forever.
        let window = if message.offer { None } else { message.window() };
        let snapshot = LocalSnapshot::load(&self.store, &message.entries, window).await?;
        let todos = reconcile(&message.entries, &snapshot, window)
            .map_err(|e| SyncError::OutOfMemory(e.to_string()))?;

        debug!(
            peer = %peer,
            entries = message.entries.len(),
            todos = todos.len(),
            "reconciled journal"
        );
        Ok(todos)
    }

    fn decode(&self, raw: &[u8]) -> Result<JournalMessage> {
        self.codec
            .decode(strip_stream_header(raw))
            .map_err(|e| SyncError::DecodeFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journal_core::{encode_message, ContentHash, JournalEntry, JournalRecord, ManualClock};
    use journal_store::MemoryStore;

    use crate::actions::CollectTodos;
    use crate::messages::STREAM_HEADER;

    const NOW: Epoch = 1_700_000_000;

    fn h(name: &str) -> ContentHash {
        ContentHash::digest(name.as_bytes())
    }

    fn handler(records: Vec<JournalRecord>) -> InboundHandler<MemoryStore> {
        InboundHandler::new(
            MemoryStore::with_records(records),
            Arc::new(ManualClock::new(NOW)),
            SyncConfig::default(),
        )
    }

    fn message(current_epoch: Epoch, entries: Vec<JournalEntry>) -> Vec<u8> {
        let start_epoch = entries.iter().map(|e| e.timestamp).min().unwrap_or(0);
        let end_epoch = entries.iter().map(|e| e.timestamp).max().unwrap_or(0);
        encode_message(&JournalMessage {
            start_epoch,
            end_epoch,
            current_epoch,
            offer: false,
            entries,
        })
        .unwrap()
    }

    #[test]
    fn test_clock_skew_boundary() {
        assert_eq!(check_clock_skew(NOW, NOW - 300, 300), Ok(300));
        assert_eq!(check_clock_skew(NOW, NOW + 300, 300), Ok(300));
        assert_eq!(check_clock_skew(NOW, NOW - 301, 300), Err(301));
        assert_eq!(check_clock_skew(NOW, NOW + 301, 300), Err(301));
        assert_eq!(check_clock_skew(0, u64::MAX, 300), Err(u64::MAX));
    }

    #[tokio::test]
    async fn test_skew_of_300_accepted() {
        let handler = handler(vec![]);
        let peer = PeerId::from_bytes([1; 32]);
        let raw = message(NOW - 300, vec![JournalEntry::new(100, true, h("a"))]);

        let collector = CollectTodos::new();
        let outcome = handler.handle(&raw, &peer, &collector).await.unwrap();
        assert_eq!(outcome, HandleOutcome::Processed { todos: 1 });
    }

    #[tokio::test]
    async fn test_skew_of_301_rejected_without_reconciling() {
        let handler = handler(vec![]);
        let peer = PeerId::from_bytes([1; 32]);
        let raw = message(NOW + 301, vec![JournalEntry::new(100, true, h("a"))]);

        let collector = CollectTodos::new();
        let err = handler.handle(&raw, &peer, &collector).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::ClockSkewExceeded { skew: 301, limit: 300, .. }
        ));
        assert!(collector.take().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_input_decode_failed() {
        let handler = handler(vec![]);
        let peer = PeerId::from_bytes([1; 32]);
        let collector = CollectTodos::new();

        for raw in [&b""[..], &b"\xff\x00garbage"[..], &[0x80][..]] {
            assert!(matches!(
                handler.handle(raw, &peer, &collector).await,
                Err(SyncError::DecodeFailed(_))
            ));
        }
        assert!(collector.take().is_empty());
    }

    #[tokio::test]
    async fn test_leading_stream_header_is_accepted() {
        let handler = handler(vec![JournalRecord::new(150, h("a"))]);
        let peer = PeerId::from_bytes([1; 32]);

        let mut raw = STREAM_HEADER.as_bytes().to_vec();
        raw.extend(message(NOW, vec![JournalEntry::new(100, true, h("a"))]));

        let todos = handler.compute(&raw, &peer).await.unwrap();
        assert_eq!(
            todos,
            vec![ToDo::TimeAdjust {
                hash: h("a"),
                local_timestamp: 150,
                remote_timestamp: 100
            }]
        );
    }

    #[tokio::test]
    async fn test_offer_skips_remote_needs_pass() {
        let handler = handler(vec![JournalRecord::new(100, h("mine"))]);
        let peer = PeerId::from_bytes([1; 32]);
        let plain = JournalMessage {
            start_epoch: 100,
            end_epoch: 100,
            current_epoch: NOW,
            offer: false,
            entries: vec![JournalEntry::new(100, true, h("theirs"))],
        };

        let todos = handler
            .compute(&encode_message(&plain).unwrap(), &peer)
            .await
            .unwrap();
        assert_eq!(todos.len(), 2);
        assert!(todos[1].is_remote_needs());

        let offer = encode_message(&plain.into_offer()).unwrap();
        let todos = handler.compute(&offer, &peer).await.unwrap();
        assert_eq!(
            todos,
            vec![ToDo::EntryNeeded {
                hash: h("theirs"),
                remote_timestamp: 100
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_message_yields_no_todos() {
        let handler = handler(vec![JournalRecord::new(150, h("a"))]);
        let peer = PeerId::from_bytes([1; 32]);
        let todos = handler.compute(&message(NOW, vec![]), &peer).await.unwrap();
        assert!(todos.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let handler = handler(vec![]);
        handler.store().close();
        let peer = PeerId::from_bytes([1; 32]);
        let raw = message(NOW, vec![JournalEntry::new(100, true, h("a"))]);

        assert!(matches!(
            handler.compute(&raw, &peer).await,
            Err(SyncError::StoreFailed(_))
        ));
    }
}
