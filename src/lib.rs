//! Cachegate - distributed TTL caching and request-quota layer
//!
//! Provides a remote TTL cache with stale-on-error fallback, a local
//! query cache, and a fixed-window rate limiter, consumed as a library
//! by request-handling code.

pub mod cache;
pub mod config;
pub mod error;
pub mod middleware;
pub mod query;
pub mod ratelimit;
pub mod resilient;
pub mod store;
pub mod tasks;

pub use cache::{CacheManager, CacheStatus};
pub use config::{CacheConfig, LogLevel};
pub use error::{StoreError, StoreResult};
pub use query::{QueryCache, QueryStats};
pub use ratelimit::{RateLimitDecision, RateLimiter};
pub use resilient::{fetch_with_fallback, Degraded, Resilient};
pub use store::{ConnectionState, MemoryBackend, RedisBackend, RemoteStore, StoreBackend};
pub use tasks::{spawn_limiter_sweep_task, spawn_query_sweep_task};
