//! # Journal Sync
//!
//! Anti-entropy for journals: keeps a node's record of stored content
//! loosely consistent with its peers without transferring full datasets.
//!
//! ## Overview
//!
//! A node periodically ships a snapshot of its most recent journal records
//! to each replication peer. The receiving node checks the sender's clock,
//! diffs the snapshot against its own journal, and hands the resulting
//! [`ToDo`](journal_core::ToDo) list to a consumer.
//!
//! ## Components
//!
//! - [`JournalSync`] - outbound: snapshot, build, connect, write
//! - [`InboundHandler`] - inbound: decode, clock-skew gate, reconcile
//! - [`reconcile()`] - the pure diff
//! - [`JournalProtocol`] / [`Dispatcher`] - wiring into the host session layer
//! - [`PeerTransport`] - what the engine needs from the network
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use journal_core::SystemClock;
//! use journal_store::MemoryStore;
//! use journal_sync::{JournalSync, MemoryNetwork, PeerId, ReplicationPeer, SyncConfig};
//!
//! async fn example() {
//!     let network = MemoryNetwork::new();
//!     let transport = network.create_transport(PeerId::random()).await;
//!     let sync = JournalSync::new(
//!         MemoryStore::new(),
//!         transport,
//!         Arc::new(SystemClock),
//!         SyncConfig::default(),
//!     );
//!
//!     let mut peer = ReplicationPeer::new(PeerId::random());
//!     let report = sync.sync(&mut peer).await.unwrap();
//!     println!("sent {} entries", report.entries_sent);
//! }
//! ```
//!
//! ## Message Flow
//!
//! ```text
//! Node A                                   Node B
//!   |-- "/ipfs/journalio/1.0.0/n" ------->|
//!   |-- JournalMessage (CBOR) ----------->|  skew check, reconcile
//!   |                                     |  -> EntryNeeded / TimeAdjust / RemoteNeeds
//! ```

pub mod actions;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod inbound;
pub mod messages;
pub mod outbound;
pub mod peer;
pub mod reconcile;
pub mod transport;

pub use actions::{CollectTodos, IgnoreTodos, TimestampPolicy, TodoConsumer};
pub use config::SyncConfig;
pub use dispatcher::{can_handle, Dispatcher, JournalProtocol, ProtocolHandler};
pub use error::{Result, SyncError};
pub use inbound::{check_clock_skew, HandleOutcome, InboundHandler};
pub use messages::{limits, strip_stream_header, PeerId, PROTOCOL_ID, STREAM_HEADER};
pub use outbound::{JournalSync, SyncReport};
pub use peer::ReplicationPeer;
pub use reconcile::{reconcile, LocalJournal, LocalSnapshot};
pub use transport::{
    memory::Frame, memory::MemoryNetwork, memory::MemoryTransport, PeerTransport,
    TransportError,
};
