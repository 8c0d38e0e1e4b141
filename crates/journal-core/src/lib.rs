//! # Journal Core
//!
//! Pure primitives for journal synchronization: records, wire entries,
//! messages, reconciliation actions, and the message codec.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`ContentHash`] - Owned content address (multihash bytes)
//! - [`JournalRecord`] - A persisted `(timestamp, hash)` pair
//! - [`JournalEntry`] - The wire form of a record, with a pin flag
//! - [`JournalMessage`] - A windowed snapshot of recent journal activity
//! - [`ToDo`] - One action computed by reconciliation
//! - [`Clock`] - Injected wall clock
//!
//! ## Encoding
//!
//! Messages are encoded as deterministic CBOR. See the [`codec`] module.

pub mod clock;
pub mod codec;
pub mod error;
pub mod journal;
pub mod todo;
pub mod types;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{decode_message, encode_message, CborCodec, MessageCodec};
pub use error::CoreError;
pub use journal::{
    HashAllocator, HeapAllocator, JournalEntry, JournalMessage, JournalRecord, MessageBuilder,
    MAX_MESSAGE_ENTRIES,
};
pub use todo::ToDo;
pub use types::{ContentHash, Epoch};
pub use validation::validate_message;
