//! Resilience Wrapper Module
//!
//! Call pattern for expensive or unreliable producers: race the fresh
//! computation against a deadline and, when either fails, degrade to the
//! last cached value instead of propagating the failure.
//!
//! This is the one place in the crate where returning logically-expired
//! data is deliberate policy; results are tagged so callers can render a
//! "last updated" marker. Contrast with [`CacheManager::get`], which
//! always treats expired entries as absent.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::cache::CacheManager;

// == Resilient Result ==
/// A value obtained fresh or recovered from cache.
#[derive(Debug, Clone, Serialize)]
pub struct Resilient<T> {
    /// The payload
    pub value: T,
    /// True when the producer failed and this value came from cache
    pub from_cache: bool,
    /// Write timestamp of the cached value (Unix milliseconds), set only
    /// on fallback reads
    pub cache_timestamp: Option<i64>,
}

// == Degraded Payload ==
/// Structured error payload returned when neither the producer nor the
/// cache could supply a value.
///
/// Serializable so request handlers can send it as a degraded response
/// body instead of crashing the call.
#[derive(Debug, Clone, Serialize)]
pub struct Degraded {
    /// Always true; lets serialized payloads carry an explicit flag
    pub error: bool,
    /// Human-readable description
    pub message: String,
}

impl Degraded {
    fn new(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
        }
    }
}

impl fmt::Display for Degraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Degraded {}

// == Fetch With Fallback ==
/// Attempts a producer under a hard deadline, caching and returning its
/// result on success.
///
/// If the producer errors or exceeds the deadline, the last cached value
/// for the key is returned even when logically expired, tagged
/// `from_cache` with its write timestamp. Only when no cached value
/// exists does the call return a [`Degraded`] payload.
pub async fn fetch_with_fallback<T, F, Fut>(
    cache: &CacheManager,
    key: &str,
    ttl: Option<u64>,
    deadline: Duration,
    producer: F,
) -> Result<Resilient<T>, Degraded>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(deadline, producer()).await {
        Ok(Ok(value)) => {
            cache.set(key, &value, ttl).await;
            return Ok(Resilient {
                value,
                from_cache: false,
                cache_timestamp: None,
            });
        }
        Ok(Err(e)) => {
            warn!(key, error = %e, "producer failed, falling back to cache");
        }
        Err(_) => {
            warn!(
                key,
                deadline_ms = deadline.as_millis() as u64,
                "producer timed out, falling back to cache"
            );
        }
    }

    match cache.get_stale::<T>(key).await {
        Some((value, stored_at)) => Ok(Resilient {
            value,
            from_cache: true,
            cache_timestamp: Some(stored_at),
        }),
        None => Err(Degraded::new(format!(
            "data for '{key}' is temporarily unavailable"
        ))),
    }
}
