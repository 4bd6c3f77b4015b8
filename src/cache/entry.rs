//! Cache Envelope Module
//!
//! Defines the wrapper stored around every remote cache value.
//!
//! The envelope carries its own expiry timestamp alongside the backend's
//! native TTL. Both layers enforce expiry: the backend evicts on its own
//! clock, and readers check `expires_at` to defend against backends whose
//! TTL precision differs from ours.

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

// == Envelope ==
/// Wrapper serialized around a cached value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// The stored value, opaque to the cache layer
    pub value: T,
    /// Write timestamp (Unix milliseconds), surfaced as the
    /// "last updated" marker on stale fallback reads
    pub stored_at: i64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: i64,
}

impl<T> Envelope<T> {
    // == Constructor ==
    /// Wraps a value with an expiry of `now + ttl_seconds`.
    pub fn new(value: T, ttl_seconds: u64) -> Self {
        let now = current_timestamp_ms();
        Self {
            value,
            stored_at: now,
            expires_at: now + (ttl_seconds as i64) * 1000,
        }
    }

    // == Is Expired ==
    /// Checks if the envelope has expired.
    ///
    /// Boundary condition: an envelope is expired when the current time is
    /// greater than or equal to the expiration time, so once the TTL has
    /// fully elapsed the entry is immediately invalid.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }
}

impl<T: Serialize> Envelope<T> {
    // == Encode ==
    /// Serializes the envelope to JSON bytes for the wire.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    // == Decode ==
    /// Deserializes an envelope from raw store bytes.
    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
