//! # Journal
//!
//! A journal-replicating node for a content-addressed store.
//!
//! ## Overview
//!
//! Every node keeps a journal: an append-only, timestamp-ordered record of
//! the content hashes it stores. [`JournalNode`] keeps that journal loosely
//! consistent with a set of replication peers:
//!
//! - **Outbound**: [`JournalNode::sync_peer`] ships the newest records to a peer
//! - **Inbound**: [`JournalNode::handle_incoming`] reconciles a peer's snapshot
//! - **Acting**: missing content is fetched, divergent timestamps settled by a
//!   [`TimestampPolicy`], and content the peer lacks offered back
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use journal::{ContentFetcher, JournalNode, NodeConfig};
//! use journal::core::{ContentHash, SystemClock};
//! use journal::store::SqliteStore;
//! use journal::sync::{MemoryNetwork, PeerId};
//!
//! struct Bitswap;
//!
//! #[async_trait]
//! impl ContentFetcher for Bitswap {
//!     async fn fetch(&self, _peer: &PeerId, _hash: &ContentHash) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! async fn example() {
//!     let store = SqliteStore::open("journal.db").unwrap();
//!     let network = MemoryNetwork::new();
//!     let transport = network.create_transport(PeerId::random()).await;
//!
//!     let node = JournalNode::new(
//!         store,
//!         transport,
//!         Arc::new(SystemClock),
//!         Arc::new(Bitswap),
//!         NodeConfig::default(),
//!     );
//!
//!     node.record_pin(ContentHash::digest(b"block")).await.unwrap();
//!
//!     let peer = PeerId::random();
//!     node.add_peer(peer).await;
//!     node.sync_peer(&peer).await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `journal::core` - Records, entries, messages, codec, clock
//! - `journal::store` - Storage abstraction and SQLite
//! - `journal::sync` - Sync engine, reconciliation, protocol handler

pub mod apply;
pub mod config;
pub mod error;
pub mod node;
pub mod peers;

// Re-export component crates
pub use journal_core as core;
pub use journal_store as store;
pub use journal_sync as sync;

// Re-export main types for convenience
pub use apply::{ApplyFailure, ApplyReport, ContentFetcher, TodoApplier};
pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use node::{Incoming, JournalNode};
pub use peers::ReplicationPeers;

pub use journal_sync::{PeerId, ReplicationPeer, SyncReport, TimestampPolicy};
