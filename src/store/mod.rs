/// TTL key-value store
///
/// The revocation state lives in an external store shared by every node of
/// the service. The protocol only needs four primitives, so the store is an
/// injected capability rather than a process-wide client.

mod memory;
mod redis_store;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::InMemoryTokenStore;
pub use self::redis_store::RedisTokenStore;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store connection failed: {0}")]
    Connection(String),
    #[error("store command failed: {0}")]
    Command(String),
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set `key` to `value`, expiring after `ttl_seconds` (must be positive).
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError>;

    /// Idempotent; deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
