//! # Journal Testkit
//!
//! Testing utilities for journal sync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: exact wire bytes for known messages
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helpers for setting up stores, networks, and clocks
//!
//! ## Golden Vectors
//!
//! ```rust
//! use journal_testkit::vectors::{all_vectors, verify_vector};
//!
//! for vector in all_vectors() {
//!     verify_vector(&vector).unwrap();
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use journal_testkit::generators::JournalPair;
//!
//! proptest! {
//!     #[test]
//!     fn reconcile_never_panics(pair: JournalPair) {
//!         // ...
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use journal_testkit::fixtures::{message, TestFixture};
//!
//! let fixture = TestFixture::new();
//! let store = fixture.store(&[("a", 100), ("b", 200)]);
//! let msg = message(fixture.now(), &[("b", 200), ("a", 100)]);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{hash, init_tracing, message, peer_id, record, records, TestFixture};
pub use generators::JournalPair;
pub use vectors::{all_vectors, verify_all_vectors, verify_vector, GoldenVector};
