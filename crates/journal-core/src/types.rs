//! Strong type definitions for journal content.
//!
//! Hashes are owned byte buffers. Nothing in the journal model borrows
//! into a record, a decoded frame, or a store page.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Seconds since the Unix epoch, UTC.
pub type Epoch = u64;

/// The content address of a stored or pinned block.
///
/// Journals carry multihash bytes, so the length is not fixed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(Vec<u8>);

impl ContentHash {
    /// Take ownership of raw hash bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Hash a block of content with Blake3.
    pub fn digest(data: &[u8]) -> Self {
        Self(blake3::hash(data).as_bytes().to_vec())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the hash.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length hash, which is never valid on the wire.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Deep copy that reports allocation failure instead of aborting.
    pub fn try_copy(&self) -> Result<Self, CoreError> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(self.0.len())
            .map_err(|_| CoreError::AllocationFailed(self.0.len()))?;
        buf.extend_from_slice(&self.0);
        Ok(Self(buf))
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        Ok(Self(hex::decode(s)?))
    }

    fn short_hex(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(16);
        hex
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_hex())
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ContentHash {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ContentHash {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}
