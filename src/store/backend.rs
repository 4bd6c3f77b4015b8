//! Store Backend Trait
//!
//! Abstracts the remote key-value wire protocol behind four primitives.
//! Any backend offering GET, SET-with-expiry, DEL, and pattern SCAN with
//! native per-key TTL satisfies the contract, so the concrete protocol
//! stays swappable.

use async_trait::async_trait;

use crate::error::StoreResult;

// == Store Backend ==
/// Wire-protocol seam for the remote cache store.
///
/// Implementations own network I/O only; entry encoding and expiry
/// interpretation live above this trait.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Establishes the backend connection.
    async fn connect(&self) -> StoreResult<()>;

    /// Fetches raw bytes for a key, `None` on absence.
    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Stores raw bytes with a backend-native expiry in seconds.
    async fn set_ex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> StoreResult<()>;

    /// Deletes a key, returning the number of keys removed.
    async fn del(&self, key: &str) -> StoreResult<u64>;

    /// Deletes every key matching a glob pattern, returning the count.
    ///
    /// Implementations over shared connections must walk the keyspace
    /// incrementally; a single blocking enumerate-all call would stall
    /// every other user of the connection.
    async fn scan_del(&self, pattern: &str) -> StoreResult<u64>;
}
