//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror.
//!
//! The store layer keeps two failure families apart: soft failures
//! (connectivity problems that callers degrade around) and hard failures
//! (malformed requests or broken payloads). The cache manager collapses
//! soft failures to `None`/`false` at its boundary so a backend outage
//! never becomes an unhandled error for request-handling code.

use thiserror::Error;

// == Store Error Enum ==
/// Unified error type for remote store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Store unreachable or connection not yet established
    #[error("store not connected")]
    NotConnected,

    /// Transport or command failure reported by the backend
    #[error("backend error: {0}")]
    Backend(String),

    /// Value could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed request (empty or oversized key)
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl StoreError {
    // == Soft Failure Check ==
    /// Returns true for failures callers should degrade around rather
    /// than surface: the store being down is an operational condition,
    /// not a caller mistake.
    pub fn is_soft(&self) -> bool {
        matches!(self, StoreError::NotConnected | StoreError::Backend(_))
    }
}

// == Result Type Alias ==
/// Convenience Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
