//! Redis Backend
//!
//! [`StoreBackend`] implementation over a multiplexed Redis connection.
//! The connection manager re-dials on transient failures, so a single
//! client instance serves every cache consumer in the process.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::store::StoreBackend;

/// Keys fetched per SCAN round-trip during pattern deletes.
const SCAN_BATCH: usize = 100;

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            StoreError::NotConnected
        } else {
            StoreError::Backend(err.to_string())
        }
    }
}

// == Redis Backend ==
/// Redis-backed remote store.
pub struct RedisBackend {
    client: redis::Client,
    conn: RwLock<Option<ConnectionManager>>,
}

impl RedisBackend {
    /// Creates a backend for the given connection URL.
    ///
    /// No network I/O happens here; the connection is established by
    /// [`StoreBackend::connect`].
    pub fn new(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Self {
            client,
            conn: RwLock::new(None),
        })
    }

    /// Clones the live connection handle, or fails soft when connect()
    /// has not succeeded yet.
    async fn connection(&self) -> StoreResult<ConnectionManager> {
        self.conn
            .read()
            .await
            .clone()
            .ok_or(StoreError::NotConnected)
    }
}

#[async_trait]
impl StoreBackend for RedisBackend {
    async fn connect(&self) -> StoreResult<()> {
        let manager = self.client.get_connection_manager().await?;
        *self.conn.write().await = Some(manager);
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let mut conn = self.connection().await?;
        let bytes: Option<Vec<u8>> = conn.get(key).await?;
        Ok(bytes)
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl_seconds: u64) -> StoreResult<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.set_ex(key, value, ttl_seconds).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn.del(key).await?;
        Ok(removed)
    }

    /// Cursor-based SCAN + DEL.
    ///
    /// The connection is shared by every cache consumer in the process,
    /// so the keyspace is walked in bounded batches; a blocking KEYS call
    /// would stall all of them for the duration of the enumeration.
    async fn scan_del(&self, pattern: &str) -> StoreResult<u64> {
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut removed: u64 = 0;

        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let count: u64 = conn.del(keys).await?;
                removed += count;
            }

            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        Ok(removed)
    }
}
