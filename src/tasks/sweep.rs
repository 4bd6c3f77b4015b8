//! Periodic Sweep Tasks
//!
//! Background tasks that bound the growth of the in-process maps. Both
//! the local query cache and the rate limiter accumulate entries between
//! reads; only these sweeps reclaim them. The interval typically comes
//! from `CacheConfig::sweep_interval`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::query::QueryCache;
use crate::ratelimit::RateLimiter;

// == Query Cache Sweep ==
/// Spawns a task that periodically removes expired local query entries.
///
/// The task runs in an infinite loop, sleeping for the specified
/// interval between sweeps. The returned handle can be used to abort the
/// task during shutdown.
pub fn spawn_query_sweep_task(cache: Arc<QueryCache>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(interval_secs, "starting query cache sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.clear_expired().await;
            if removed > 0 {
                info!(removed, "query cache sweep removed expired entries");
            } else {
                debug!("query cache sweep found nothing to remove");
            }
        }
    })
}

// == Rate Limiter Sweep ==
/// Spawns a task that periodically drops lapsed rate-limit windows.
pub fn spawn_limiter_sweep_task(limiter: Arc<RateLimiter>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(interval_secs, "starting rate limiter sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = limiter.sweep();
            if removed > 0 {
                info!(removed, "rate limiter sweep removed lapsed windows");
            } else {
                debug!("rate limiter sweep found nothing to remove");
            }
        }
    })
}
