//! In-Memory Backend
//!
//! A process-local [`StoreBackend`] with lazy native expiry. Used by the
//! test suites and by single-node deployments running without a remote
//! store, where the platform keeps serving uncached rather than failing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::entry::current_timestamp_ms;
use crate::error::StoreResult;
use crate::store::StoreBackend;

// == Stored Value ==
#[derive(Debug, Clone)]
struct StoredValue {
    data: Vec<u8>,
    /// Native expiry (Unix milliseconds), None = no expiration
    expires_at: Option<i64>,
}

impl StoredValue {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }
}

// == Memory Backend ==
/// In-process key-value store with per-key TTL.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, StoredValue>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys, counting entries the lazy
    /// expiry has not reaped yet.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Checks if a glob pattern matches a key. Supports a single `*`
    /// wildcard in prefix, suffix, or catch-all position.
    fn pattern_matches(pattern: &str, key: &str) -> bool {
        if pattern == "*" {
            return true;
        }
        if let Some(prefix) = pattern.strip_suffix('*') {
            return key.starts_with(prefix);
        }
        if let Some(suffix) = pattern.strip_prefix('*') {
            return key.ends_with(suffix);
        }
        pattern == key
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn connect(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(stored) if stored.is_expired() => {
                entries.remove(key);
                Ok(None)
            }
            Some(stored) => Ok(Some(stored.data.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> StoreResult<()> {
        let expires_at = if ttl_seconds > 0 {
            Some(current_timestamp_ms() + (ttl_seconds as i64) * 1000)
        } else {
            None
        };
        let stored = StoredValue {
            data: value.to_vec(),
            expires_at,
        };
        self.entries.write().await.insert(key.to_string(), stored);
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<u64> {
        let removed = self.entries.write().await.remove(key).is_some();
        Ok(u64::from(removed))
    }

    async fn scan_del(&self, pattern: &str) -> StoreResult<u64> {
        let mut entries = self.entries.write().await;
        let matching: Vec<String> = entries
            .keys()
            .filter(|k| Self::pattern_matches(pattern, k))
            .cloned()
            .collect();

        let count = matching.len() as u64;
        for key in matching {
            entries.remove(&key);
        }
        Ok(count)
    }
}
