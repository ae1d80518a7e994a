//! Error types for the record store.

use thiserror::Error;
use crate::types::Key;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in the record store
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error from the operation log or a bulk-load file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key is absent from the leaf its descent reaches
    #[error("Key {0} not found")]
    KeyNotFound(Key),

    /// Tree order is too small to split nodes into two non-empty halves
    #[error("Invalid order: {order} (min: {min})")]
    InvalidOrder { order: usize, min: usize },

    /// Bulk-load line could not be parsed
    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// A structural invariant of the tree does not hold
    #[error("Corruption detected: {0}")]
    Corruption(String),
}

impl StoreError {
    /// Create a corruption error with a message
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }

    /// Create a malformed record error
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    /// Whether this is the not-found outcome of a lookup, update or delete
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }
}
