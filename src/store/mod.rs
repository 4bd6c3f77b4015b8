//! Remote Store Module
//!
//! Provides shared, TTL-aware key-value access: the wire-protocol seam,
//! the concrete backends, and the connection-owning store wrapper.

mod backend;
mod memory;
mod redis;
mod remote;

// Re-export public types
pub use backend::StoreBackend;
pub use memory::MemoryBackend;
pub use redis::RedisBackend;
pub use remote::{ConnectionState, RemoteStore};
