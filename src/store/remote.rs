//! Remote Cache Store
//!
//! Owns the connection lifecycle for the shared remote store: the state
//! machine, the bounded-backoff retry loop, and the soft-fail raw
//! operations every cache manager in the process goes through.
//!
//! One instance exists per process, constructed at startup and handed to
//! consumers explicitly.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::cache::keys;
use crate::config::CacheConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::StoreBackend;

/// Base delay for connection retries, in milliseconds.
const RETRY_BASE_MS: u64 = 500;

/// Ceiling for the retry delay, in milliseconds.
const RETRY_CAP_MS: u64 = 10_000;

// == Connection State ==
/// Lifecycle of the shared backend connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and none in progress
    Disconnected,
    /// Initial connection attempt running
    Connecting,
    /// Connection established
    Connected,
    /// Connection lost mid-operation, backend re-dialing
    Reconnecting,
}

impl ConnectionState {
    /// Human-readable state name for status introspection.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        }
    }
}

// == Remote Store ==
/// Shared, TTL-aware key-value access across process instances.
pub struct RemoteStore {
    backend: Arc<dyn StoreBackend>,
    state: RwLock<ConnectionState>,
    connect_timeout: Duration,
}

impl RemoteStore {
    // == Constructor ==
    /// Creates a store over the given backend. No I/O happens until
    /// [`RemoteStore::connect`] is called.
    pub fn new(backend: Arc<dyn StoreBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            state: RwLock::new(ConnectionState::Disconnected),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
        }
    }

    // == Connect ==
    /// Initiates the connection in the background. Idempotent: while an
    /// attempt is running or a connection is live, further calls return a
    /// task that exits immediately.
    ///
    /// Failed attempts are retried with a bounded backoff of
    /// `min(attempt * base, cap)` until one succeeds.
    pub fn connect(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);

        tokio::spawn(async move {
            {
                let mut state = store.state.write().unwrap();
                match *state {
                    ConnectionState::Disconnected => *state = ConnectionState::Connecting,
                    _ => return,
                }
            }

            let mut attempt: u64 = 0;
            loop {
                attempt += 1;
                match timeout(store.connect_timeout, store.backend.connect()).await {
                    Ok(Ok(())) => {
                        store.set_state(ConnectionState::Connected);
                        info!("cache store connected");
                        return;
                    }
                    Ok(Err(e)) => {
                        warn!(error = %e, attempt, "cache store connection failed");
                    }
                    Err(_) => {
                        warn!(attempt, "cache store connection attempt timed out");
                    }
                }

                store.set_state(ConnectionState::Reconnecting);
                let delay = (attempt * RETRY_BASE_MS).min(RETRY_CAP_MS);
                sleep(Duration::from_millis(delay)).await;
            }
        })
    }

    // == Disconnect ==
    /// Marks the store as torn down; subsequent operations fail soft.
    /// The backend connection itself is released on drop.
    pub fn disconnect(&self) {
        self.set_state(ConnectionState::Disconnected);
        info!("cache store connection closed");
    }

    // == Raw Get ==
    /// Fetches raw bytes for a key.
    ///
    /// Fails soft with [`StoreError::NotConnected`] when no connection is
    /// available; only malformed keys fail hard.
    pub async fn raw_get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        keys::validate(key)?;
        self.require_connection()?;
        match self.backend.get(key).await {
            Ok(value) => {
                self.note_success();
                Ok(value)
            }
            Err(e) => Err(self.note_failure(e)),
        }
    }

    // == Raw Set ==
    /// Stores raw bytes with a backend-native expiry.
    pub async fn raw_set(&self, key: &str, value: &[u8], ttl_seconds: u64) -> StoreResult<()> {
        keys::validate(key)?;
        self.require_connection()?;
        match self.backend.set_ex(key, value, ttl_seconds).await {
            Ok(()) => {
                self.note_success();
                Ok(())
            }
            Err(e) => Err(self.note_failure(e)),
        }
    }

    // == Raw Delete ==
    /// Deletes a key, returning the number of keys removed.
    pub async fn raw_delete(&self, key: &str) -> StoreResult<u64> {
        keys::validate(key)?;
        self.require_connection()?;
        match self.backend.del(key).await {
            Ok(count) => {
                self.note_success();
                Ok(count)
            }
            Err(e) => Err(self.note_failure(e)),
        }
    }

    // == Scan Delete ==
    /// Deletes every key matching a glob pattern, returning the count.
    pub async fn scan_delete(&self, pattern: &str) -> StoreResult<u64> {
        self.require_connection()?;
        match self.backend.scan_del(pattern).await {
            Ok(count) => {
                self.note_success();
                Ok(count)
            }
            Err(e) => Err(self.note_failure(e)),
        }
    }

    // == State Introspection ==
    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read().unwrap()
    }

    /// Returns true once the initial connection has been established and
    /// has not been torn down.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    // == Internal ==
    fn set_state(&self, next: ConnectionState) {
        *self.state.write().unwrap() = next;
    }

    /// Operations run while Connected or Reconnecting (the backend
    /// re-dials underneath and a success flips the state back); they
    /// fail soft before the initial connection or after teardown.
    fn require_connection(&self) -> StoreResult<()> {
        match self.state() {
            ConnectionState::Connected | ConnectionState::Reconnecting => Ok(()),
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                Err(StoreError::NotConnected)
            }
        }
    }

    fn note_success(&self) {
        if self.state() == ConnectionState::Reconnecting {
            self.set_state(ConnectionState::Connected);
            info!("cache store connection restored");
        }
    }

    fn note_failure(&self, err: StoreError) -> StoreError {
        if err.is_soft() && self.state() == ConnectionState::Connected {
            self.set_state(ConnectionState::Reconnecting);
            warn!(error = %err, "cache store operation failed, reconnecting");
        }
        err
    }
}
