//! Error types for the block store.
//!
//! Mirrors the four error kinds a caller can observe: a failed syscall, a
//! malformed on-disk structure, a violated cross-store invariant, and a
//! misuse of the API by the caller itself.

use thiserror::Error;

use crate::codec::CodecError;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("format error: {0}")]
    Format(String),

    #[error("corrupt store: {0}")]
    Corrupt(String),

    #[error("precondition violated: {0}")]
    Precondition(String),
}

impl From<CodecError> for StoreError {
    fn from(e: CodecError) -> Self {
        // From the store's perspective a codec failure means the bytes on
        // disk did not decode to a valid block, which is a format violation.
        StoreError::Format(e.to_string())
    }
}
