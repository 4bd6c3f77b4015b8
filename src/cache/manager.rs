//! Cache Manager Module
//!
//! The public caching API layered over the remote store. Adds envelope
//! metadata, defensive re-validation of expiry on read, and logging gated
//! by the configured verbosity.
//!
//! Every I/O-facing method has a degraded-but-valid return value; a
//! backend outage is never surfaced to callers as an error. Only producer
//! failures (genuine business-logic errors) propagate, and only through
//! [`CacheManager::get_or_set`].

use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use crate::cache::entry::Envelope;
use crate::cache::keys;
use crate::config::{CacheConfig, LogLevel};
use crate::store::RemoteStore;

// == Cache Status ==
/// Read-only introspection of the shared connection.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    /// True when the store connection is established
    pub connected: bool,
    /// Connection state name
    pub status: String,
}

// == Cache Manager ==
/// Distributed TTL cache over the shared remote store.
pub struct CacheManager {
    store: Arc<RemoteStore>,
    prefix: String,
    default_ttl: u64,
    verbosity: LogLevel,
}

impl CacheManager {
    // == Constructor ==
    /// Creates a manager over the process-wide store.
    ///
    /// The store is injected rather than reached through a global so
    /// lifecycle and tests stay explicit; all managers in a process are
    /// expected to share one instance.
    pub fn new(store: Arc<RemoteStore>, config: &CacheConfig) -> Self {
        Self {
            store,
            prefix: config.prefix.clone(),
            default_ttl: config.default_ttl,
            verbosity: config.log_level,
        }
    }

    // == Set ==
    /// Stores a value under a logical key with optional TTL.
    ///
    /// The envelope records its own expiry and the backend enforces the
    /// same TTL natively, so either layer alone is enough to invalidate
    /// the entry.
    ///
    /// Returns `false` (never errors) if the store is unavailable or the
    /// value cannot be serialized.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<u64>) -> bool {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let envelope = Envelope::new(value, ttl);

        let bytes = match envelope.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                if self.verbosity.allows(LogLevel::Error) {
                    error!(key, error = %e, "failed to serialize cache value");
                }
                return false;
            }
        };

        let full_key = keys::qualify(&self.prefix, key);
        match self.store.raw_set(&full_key, &bytes, ttl).await {
            Ok(()) => {
                if self.verbosity.allows(LogLevel::Debug) {
                    debug!(key, ttl, "cache set");
                }
                true
            }
            Err(e) if e.is_soft() => {
                if self.verbosity.allows(LogLevel::Warn) {
                    warn!(key, error = %e, "cache set skipped, store unavailable");
                }
                false
            }
            Err(e) => {
                if self.verbosity.allows(LogLevel::Error) {
                    error!(key, error = %e, "cache set rejected");
                }
                false
            }
        }
    }

    // == Get ==
    /// Retrieves a value by logical key.
    ///
    /// An envelope whose expiry has passed is treated as absent even when
    /// the backend has not evicted it yet; the key is deleted on the spot
    /// so backend TTL precision skew cannot resurrect it. Misses, decode
    /// failures, and store outages all return `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = keys::qualify(&self.prefix, key);

        let bytes = match self.store.raw_get(&full_key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                if self.verbosity.allows(LogLevel::Debug) {
                    debug!(key, "cache miss");
                }
                return None;
            }
            Err(e) => {
                if self.verbosity.allows(LogLevel::Warn) {
                    warn!(key, error = %e, "cache get failed");
                }
                return None;
            }
        };

        let envelope: Envelope<T> = match Envelope::from_bytes(&bytes) {
            Ok(envelope) => envelope,
            Err(e) => {
                if self.verbosity.allows(LogLevel::Error) {
                    error!(key, error = %e, "failed to deserialize cache entry");
                }
                return None;
            }
        };

        if envelope.is_expired() {
            let _ = self.store.raw_delete(&full_key).await;
            if self.verbosity.allows(LogLevel::Debug) {
                debug!(key, "expired cache entry removed");
            }
            return None;
        }

        if self.verbosity.allows(LogLevel::Debug) {
            debug!(key, "cache hit");
        }
        Some(envelope.value)
    }

    // == Get Or Set ==
    /// Returns the cached value, or computes and caches it.
    ///
    /// On a hit the producer is never invoked. On a miss the producer
    /// runs, its result is stored (store failures are logged, never
    /// surfaced), and the fresh value is returned. Producer errors
    /// propagate to the caller.
    ///
    /// No cross-request de-duplication: concurrent callers for the same
    /// key may each invoke the producer, and the last write wins.
    pub async fn get_or_set<T, F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<u64>,
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Some(value) = self.get::<T>(key).await {
            return Ok(value);
        }

        let value = producer().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }

    // == Get Stale ==
    /// Reads the last stored envelope for a key ignoring its expiry,
    /// returning the value and its write timestamp.
    ///
    /// This bypasses the expiry check [`CacheManager::get`] enforces and
    /// exists solely for the degraded-fallback path; the entry may still
    /// be gone if the backend's native TTL already evicted it.
    pub async fn get_stale<T: DeserializeOwned>(&self, key: &str) -> Option<(T, i64)> {
        let full_key = keys::qualify(&self.prefix, key);
        let bytes = self.store.raw_get(&full_key).await.ok().flatten()?;
        let envelope: Envelope<T> = Envelope::from_bytes(&bytes).ok()?;

        if self.verbosity.allows(LogLevel::Debug) {
            debug!(key, stored_at = envelope.stored_at, "stale cache read");
        }
        Some((envelope.value, envelope.stored_at))
    }

    // == Delete ==
    /// Removes a single key. Returns true if the key existed.
    pub async fn delete(&self, key: &str) -> bool {
        let full_key = keys::qualify(&self.prefix, key);
        match self.store.raw_delete(&full_key).await {
            Ok(count) => {
                if self.verbosity.allows(LogLevel::Debug) {
                    debug!(key, "cache delete");
                }
                count > 0
            }
            Err(e) => {
                if self.verbosity.allows(LogLevel::Warn) {
                    warn!(key, error = %e, "cache delete failed");
                }
                false
            }
        }
    }

    // == Clear ==
    /// Bulk invalidation under the configured prefix.
    ///
    /// With a pattern, removes the matching keys; without one, removes
    /// every key the prefix owns. Returns the number of keys removed.
    pub async fn clear(&self, pattern: Option<&str>) -> u64 {
        let scan = keys::scan_pattern(&self.prefix, pattern);
        match self.store.scan_delete(&scan).await {
            Ok(count) => {
                if self.verbosity.allows(LogLevel::Info) {
                    info!(pattern = %scan, count, "cache cleared");
                }
                count
            }
            Err(e) => {
                if self.verbosity.allows(LogLevel::Warn) {
                    warn!(pattern = %scan, error = %e, "cache clear failed");
                }
                0
            }
        }
    }

    // == Status ==
    /// Connection state of the shared store.
    pub fn status(&self) -> CacheStatus {
        let state = self.store.state();
        CacheStatus {
            connected: self.store.is_connected(),
            status: state.as_str().to_string(),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::{current_timestamp_ms, Envelope};
    use crate::store::{MemoryBackend, StoreBackend};
    use serde::Deserialize;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Score {
        gar: u32,
    }

    async fn connected_manager() -> (CacheManager, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let config = CacheConfig::default();
        let store = Arc::new(RemoteStore::new(backend.clone(), &config));
        store.connect().await.unwrap();
        (CacheManager::new(store, &config), backend)
    }

    #[tokio::test]
    async fn test_set_and_get_roundtrip() {
        let (manager, _) = connected_manager().await;

        assert!(manager.set("score:42", &Score { gar: 87 }, Some(300)).await);
        let value: Option<Score> = manager.get("score:42").await;

        assert_eq!(value, Some(Score { gar: 87 }));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (manager, _) = connected_manager().await;

        let value: Option<Score> = manager.get("never_set").await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_set_fails_soft_when_disconnected() {
        let backend = Arc::new(MemoryBackend::new());
        let config = CacheConfig::default();
        let store = Arc::new(RemoteStore::new(backend, &config));
        // No connect() call
        let manager = CacheManager::new(store, &config);

        assert!(!manager.set("key", &Score { gar: 1 }, None).await);
        let value: Option<Score> = manager.get("key").await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_envelope_expiry_honored() {
        let (manager, _) = connected_manager().await;

        manager.set("short", &Score { gar: 1 }, Some(1)).await;
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let value: Option<Score> = manager.get("short").await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_expired_envelope_self_heals() {
        let (manager, backend) = connected_manager().await;

        // Simulate backend TTL precision skew: the envelope is already
        // expired but the backend would keep the key for another 5 minutes.
        let envelope = Envelope {
            value: Score { gar: 87 },
            stored_at: current_timestamp_ms() - 10_000,
            expires_at: current_timestamp_ms() - 5_000,
        };
        let bytes = envelope.to_bytes().unwrap();
        backend.set_ex("app:cache:skewed", &bytes, 300).await.unwrap();

        let value: Option<Score> = manager.get("skewed").await;
        assert_eq!(value, None);

        // The read deleted the key out from under the backend
        assert_eq!(backend.get("app:cache:skewed").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_or_set_computes_on_miss() {
        let (manager, _) = connected_manager().await;
        let calls = AtomicU32::new(0);

        let value: Score = manager
            .get_or_set(
                "score:42",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Score { gar: 90 })
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(value, Score { gar: 90 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // The computed value was stored
        let cached: Option<Score> = manager.get("score:42").await;
        assert_eq!(cached, Some(Score { gar: 90 }));
    }

    #[tokio::test]
    async fn test_get_or_set_skips_producer_on_hit() {
        let (manager, _) = connected_manager().await;
        let calls = AtomicU32::new(0);

        manager.set("present", &Score { gar: 87 }, Some(300)).await;

        let value: Score = manager
            .get_or_set(
                "present",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Score { gar: 99 })
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(value, Score { gar: 87 });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_get_or_set_propagates_producer_error() {
        let (manager, _) = connected_manager().await;

        let result: anyhow::Result<Score> = manager
            .get_or_set("failing", || async { anyhow::bail!("upstream down") }, None)
            .await;

        assert!(result.is_err());
        // Nothing was cached for the failed computation
        let cached: Option<Score> = manager.get("failing").await;
        assert_eq!(cached, None);
    }

    #[tokio::test]
    async fn test_get_stale_ignores_expiry() {
        let (manager, backend) = connected_manager().await;

        let envelope = Envelope {
            value: Score { gar: 87 },
            stored_at: current_timestamp_ms() - 10_000,
            expires_at: current_timestamp_ms() - 5_000,
        };
        let bytes = envelope.to_bytes().unwrap();
        backend.set_ex("app:cache:old", &bytes, 300).await.unwrap();

        let stale: Option<(Score, i64)> = manager.get_stale("old").await;
        let (value, stored_at) = stale.unwrap();

        assert_eq!(value, Score { gar: 87 });
        assert_eq!(stored_at, envelope.stored_at);
    }

    #[tokio::test]
    async fn test_delete() {
        let (manager, _) = connected_manager().await;

        manager.set("score:42", &Score { gar: 87 }, Some(300)).await;
        assert!(manager.delete("score:42").await);

        let value: Option<Score> = manager.get("score:42").await;
        assert_eq!(value, None);

        assert!(!manager.delete("score:42").await);
    }

    #[tokio::test]
    async fn test_clear_with_pattern_is_scoped() {
        let (manager, _) = connected_manager().await;

        manager.set("score:1", &Score { gar: 1 }, None).await;
        manager.set("score:2", &Score { gar: 2 }, None).await;
        manager.set("profile:1", &Score { gar: 3 }, None).await;

        let removed = manager.clear(Some("score:*")).await;

        assert_eq!(removed, 2);
        assert_eq!(manager.get::<Score>("score:1").await, None);
        assert_eq!(manager.get::<Score>("profile:1").await, Some(Score { gar: 3 }));
    }

    #[tokio::test]
    async fn test_clear_without_pattern_removes_prefix_only() {
        let (manager, backend) = connected_manager().await;

        manager.set("score:1", &Score { gar: 1 }, None).await;
        manager.set("profile:1", &Score { gar: 2 }, None).await;
        // A foreign key outside the configured prefix
        backend.set_ex("other:system:key", b"untouched", 300).await.unwrap();

        let removed = manager.clear(None).await;

        assert_eq!(removed, 2);
        assert!(backend.get("other:system:key").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_status_reflects_connection() {
        let backend = Arc::new(MemoryBackend::new());
        let config = CacheConfig::default();
        let store = Arc::new(RemoteStore::new(backend, &config));
        let manager = CacheManager::new(store.clone(), &config);

        let status = manager.status();
        assert!(!status.connected);
        assert_eq!(status.status, "disconnected");

        store.connect().await.unwrap();

        let status = manager.status();
        assert!(status.connected);
        assert_eq!(status.status, "connected");
    }
}
