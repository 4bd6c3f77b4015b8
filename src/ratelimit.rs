//! Rate Limiter Module
//!
//! Fixed-window request counting per identifier. Shares the expiring
//! map-entry pattern with the cache tiers but is otherwise independent
//! of them.
//!
//! Fixed windows admit up to twice the quota across a window boundary in
//! the worst case. That tradeoff buys O(1) memory and update cost per
//! identifier and is kept deliberately; this is not a sliding-window or
//! token-bucket limiter.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

use crate::cache::entry::current_timestamp_ms;

// == Decision ==
/// Outcome of a single quota check.
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitDecision {
    /// False once the window's quota is exhausted
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the current window ends (Unix milliseconds)
    pub reset_time: i64,
}

// == Window Record ==
#[derive(Debug, Clone)]
struct WindowRecord {
    count: u32,
    #[allow(dead_code)]
    window_start: i64,
    window_end: i64,
    blocked: bool,
    block_expiry: Option<i64>,
}

impl WindowRecord {
    /// Opens an empty window; the admitting check increments the count.
    fn open(now: i64, window_ms: i64) -> Self {
        Self {
            count: 0,
            window_start: now,
            window_end: now + window_ms,
            blocked: false,
            block_expiry: None,
        }
    }

    /// A record whose window has passed is treated as if it never
    /// existed; the next request opens a fresh window.
    fn is_expired(&self, now: i64) -> bool {
        now > self.window_end
    }
}

// == Rate Limiter ==
/// Per-identifier fixed-window request counter.
///
/// One instance serves the whole process. State lives only in memory;
/// restarts reset every window.
#[derive(Debug)]
pub struct RateLimiter {
    window_ms: i64,
    max: u32,
    records: Mutex<HashMap<String, WindowRecord>>,
}

impl RateLimiter {
    // == Constructor ==
    /// Creates a limiter admitting `max` requests per `window_ms`
    /// milliseconds per identifier.
    pub fn new(window_ms: u64, max: u32) -> Self {
        Self {
            window_ms: window_ms as i64,
            max,
            records: Mutex::new(HashMap::new()),
        }
    }

    // == Check ==
    /// Counts a request against an identifier's window and decides
    /// whether it is admitted.
    ///
    /// Synchronous and lock-guarded: callable from sync and async
    /// request paths alike, nothing is awaited while the map is held.
    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        let now = current_timestamp_ms();
        let mut records = self.records.lock().unwrap();

        let record = records
            .entry(identifier.to_string())
            .or_insert_with(|| WindowRecord::open(now, self.window_ms));

        // A lapsed window is indistinguishable from no record at all
        if record.is_expired(now) {
            *record = WindowRecord::open(now, self.window_ms);
        }

        record.count += 1;

        if record.count > self.max {
            record.blocked = true;
            record.block_expiry = Some(record.window_end);
            RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_time: record.window_end,
            }
        } else {
            RateLimitDecision {
                allowed: true,
                remaining: self.max - record.count,
                reset_time: record.window_end,
            }
        }
    }

    // == Blocked Check ==
    /// True while an identifier's current window has exhausted its quota.
    /// Lapses with the window.
    pub fn is_blocked(&self, identifier: &str) -> bool {
        let now = current_timestamp_ms();
        let records = self.records.lock().unwrap();
        records
            .get(identifier)
            .is_some_and(|r| r.blocked && r.block_expiry.is_some_and(|expiry| now <= expiry))
    }

    // == Quota ==
    /// Configured per-window maximum.
    pub fn max(&self) -> u32 {
        self.max
    }

    // == Sweep ==
    /// Removes records whose windows have passed. Scheduled periodically
    /// to bound map growth; correctness never depends on it, since
    /// checks ignore lapsed records anyway.
    pub fn sweep(&self) -> usize {
        let now = current_timestamp_ms();
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        before - records.len()
    }

    // == Length ==
    /// Number of tracked identifiers, lapsed windows included.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Returns true when no identifiers are tracked.
    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}
