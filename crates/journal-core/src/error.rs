//! Error types for the journal core.

use thiserror::Error;

/// Errors raised while building, encoding, or decoding journal messages.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("decoding error: {0}")]
    Decoding(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("allocation of {0} bytes failed")]
    AllocationFailed(usize),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
