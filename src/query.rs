//! Local Query Cache Module
//!
//! Process-local memoization for expensive computations where no remote
//! round-trip is justified. Follows the same TTL contract as the remote
//! tier but shares nothing with it; the two are never assumed to agree.
//!
//! Entries are invalidated lazily on read and reaped by a periodic sweep
//! (see the tasks module). Key growth between sweeps is unbounded.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::entry::current_timestamp_ms;

/// Default lifetime for memoized query results.
pub const DEFAULT_QUERY_TTL: Duration = Duration::from_secs(300);

// == Local Entry ==
#[derive(Debug, Clone)]
struct LocalEntry {
    data: serde_json::Value,
    /// Write timestamp (Unix milliseconds)
    timestamp: i64,
    ttl_ms: i64,
}

impl LocalEntry {
    fn is_expired(&self) -> bool {
        current_timestamp_ms() - self.timestamp >= self.ttl_ms
    }
}

// == Query Stats ==
/// Hit/miss accounting for the local tier.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryStats {
    /// Reads served from the map
    pub hits: u64,
    /// Reads that ran the producer
    pub misses: u64,
    /// Current number of memoized entries
    pub entries: usize,
}

impl QueryStats {
    /// Calculates the hit rate, 0.0 if nothing has been read yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Inner State ==
#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, LocalEntry>,
    stats: QueryStats,
}

// == Query Cache ==
/// In-process TTL cache for short-lived memoization.
#[derive(Debug)]
pub struct QueryCache {
    inner: RwLock<Inner>,
    default_ttl: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_TTL)
    }
}

impl QueryCache {
    // == Constructor ==
    /// Creates a cache with the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            default_ttl,
        }
    }

    // == Cached Query ==
    /// Returns the memoized result for a key, or runs the producer and
    /// memoizes its result.
    ///
    /// A fresh entry (younger than its TTL) is returned without invoking
    /// the producer. The lock is released while the producer runs, so two
    /// concurrent misses for the same key may both compute; the last
    /// write wins.
    pub async fn cached_query<T, F, Fut>(
        &self,
        key: &str,
        producer: F,
        ttl: Option<Duration>,
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let ttl = ttl.unwrap_or(self.default_ttl);

        {
            let mut inner = self.inner.write().await;
            let fresh = match inner.entries.get(key) {
                Some(entry) if !entry.is_expired() => Some(entry.data.clone()),
                _ => None,
            };
            match fresh.map(serde_json::from_value::<T>) {
                Some(Ok(value)) => {
                    inner.stats.hits += 1;
                    debug!(key, "query cache hit");
                    return Ok(value);
                }
                // A decode failure means the key now holds a different
                // shape; recompute and overwrite it.
                Some(Err(_)) | None => inner.stats.misses += 1,
            }
        }

        let value = producer().await?;
        let data = serde_json::to_value(&value)?;

        let mut inner = self.inner.write().await;
        inner.entries.insert(
            key.to_string(),
            LocalEntry {
                data,
                timestamp: current_timestamp_ms(),
                ttl_ms: ttl.as_millis() as i64,
            },
        );
        inner.stats.entries = inner.entries.len();
        debug!(key, "query cache stored");
        Ok(value)
    }

    // == Invalidate ==
    /// Drops a single memoized entry. Returns true if it existed.
    pub async fn invalidate(&self, key: &str) -> bool {
        let mut inner = self.inner.write().await;
        let existed = inner.entries.remove(key).is_some();
        inner.stats.entries = inner.entries.len();
        existed
    }

    // == Clear Expired ==
    /// Removes every entry older than its TTL.
    ///
    /// Intended for the periodic sweep, not for every read; reads only
    /// age-check the one entry they touch.
    pub async fn clear_expired(&self) -> usize {
        let mut inner = self.inner.write().await;
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired());
        let removed = before - inner.entries.len();
        inner.stats.entries = inner.entries.len();
        removed
    }

    // == Length ==
    /// Number of memoized entries, expired or not.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Returns true if nothing is memoized.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }

    // == Stats ==
    /// Current hit/miss accounting.
    pub async fn stats(&self) -> QueryStats {
        self.inner.read().await.stats.clone()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_cached_query_memoizes() {
        let cache = QueryCache::default();
        let calls = AtomicU32::new(0);

        let producer = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(42u32)
        };

        let first: u32 = cache.cached_query("answer", producer, None).await.unwrap();
        assert_eq!(first, 42);

        let second: u32 = cache
            .cached_query("answer", || async { Ok(99u32) }, None)
            .await
            .unwrap();

        assert_eq!(second, 42, "fresh entry must be served without recompute");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cached_query_recomputes_after_ttl() {
        let cache = QueryCache::default();

        let first: u32 = cache
            .cached_query("counter", || async { Ok(1u32) }, Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert_eq!(first, 1);

        tokio::time::sleep(Duration::from_millis(80)).await;

        let second: u32 = cache
            .cached_query("counter", || async { Ok(2u32) }, Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn test_producer_error_propagates_and_is_not_cached() {
        let cache = QueryCache::default();

        let result: anyhow::Result<u32> = cache
            .cached_query("broken", || async { anyhow::bail!("query failed") }, None)
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty().await);

        // A later successful run fills the entry
        let value: u32 = cache
            .cached_query("broken", || async { Ok(7u32) }, None)
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = QueryCache::default();

        let _: u32 = cache.cached_query("key", || async { Ok(1u32) }, None).await.unwrap();
        assert!(cache.invalidate("key").await);
        assert!(!cache.invalidate("key").await);

        let recomputed: u32 = cache
            .cached_query("key", || async { Ok(2u32) }, None)
            .await
            .unwrap();
        assert_eq!(recomputed, 2);
    }

    #[tokio::test]
    async fn test_clear_expired_removes_only_stale_entries() {
        let cache = QueryCache::default();

        let _: u32 = cache
            .cached_query("stale", || async { Ok(1u32) }, Some(Duration::from_millis(30)))
            .await
            .unwrap();
        let _: u32 = cache
            .cached_query("live", || async { Ok(2u32) }, Some(Duration::from_secs(60)))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        let removed = cache.clear_expired().await;
        assert_eq!(removed, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_stats_accounting() {
        let cache = QueryCache::default();

        let _: u32 = cache.cached_query("a", || async { Ok(1u32) }, None).await.unwrap();
        let _: u32 = cache.cached_query("a", || async { Ok(1u32) }, None).await.unwrap();
        let _: u32 = cache.cached_query("b", || async { Ok(2u32) }, None).await.unwrap();

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 2);
        assert!((stats.hit_rate() - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_rate_empty() {
        assert_eq!(QueryStats::default().hit_rate(), 0.0);
    }
}
