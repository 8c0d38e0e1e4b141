//! Protocol dispatch: route raw stream bytes to the handler that owns them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use journal_store::JournalStore;

use crate::actions::TodoConsumer;
use crate::error::Result;
use crate::inbound::{HandleOutcome, InboundHandler};
use crate::messages::{limits, PeerId, PROTOCOL_ID};

/// True iff `bytes` opens with the journal protocol identifier at offset 0.
pub fn can_handle(bytes: &[u8]) -> bool {
    bytes.len() >= limits::MIN_DISPATCH_LEN && bytes.starts_with(PROTOCOL_ID.as_bytes())
}

/// A protocol the host session layer can route streams to.
#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    fn protocol_id(&self) -> &'static str;

    /// Whether this handler owns a stream starting with `bytes`.
    fn can_handle(&self, bytes: &[u8]) -> bool;

    /// Process one message from `peer`.
    async fn handle_message(&self, peer: &PeerId, bytes: &[u8]) -> Result<HandleOutcome>;

    /// Release handler resources. Idempotent.
    fn shutdown(&self);
}

/// The journal protocol handler: an [`InboundHandler`] plus the consumer
/// its ToDo lists go to.
pub struct JournalProtocol<S> {
    inbound: InboundHandler<S>,
    consumer: Arc<dyn TodoConsumer>,
    closed: AtomicBool,
}

impl<S: JournalStore> JournalProtocol<S> {
    pub fn new(inbound: InboundHandler<S>, consumer: Arc<dyn TodoConsumer>) -> Self {
        Self {
            inbound,
            consumer,
            closed: AtomicBool::new(false),
        }
    }

    pub fn inbound(&self) -> &InboundHandler<S> {
        &self.inbound
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: JournalStore> ProtocolHandler for JournalProtocol<S> {
    fn protocol_id(&self) -> &'static str {
        PROTOCOL_ID
    }

    fn can_handle(&self, bytes: &[u8]) -> bool {
        can_handle(bytes)
    }

    async fn handle_message(&self, peer: &PeerId, bytes: &[u8]) -> Result<HandleOutcome> {
        if self.is_shut_down() {
            return Ok(HandleOutcome::Close);
        }
        self.inbound
            .handle(bytes, peer, self.consumer.as_ref())
            .await
    }

    fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(protocol = PROTOCOL_ID, "protocol handler shut down");
        }
    }
}

/// Routes negotiation bytes to the first registered handler that claims them.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<Arc<dyn ProtocolHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn ProtocolHandler>) {
        debug!(protocol = handler.protocol_id(), "registered protocol handler");
        self.handlers.push(handler);
    }

    /// The handler owning a stream that opens with `negotiation`.
    pub fn route(&self, negotiation: &[u8]) -> Option<Arc<dyn ProtocolHandler>> {
        self.handlers
            .iter()
            .find(|h| h.can_handle(negotiation))
            .cloned()
    }

    pub fn shutdown(&self) {
        for handler in &self.handlers {
            handler.shutdown();
        }
    }
}
