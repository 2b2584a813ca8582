use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use tokio::sync::OnceCell;

use super::{StoreError, TokenStore};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);
/// After a failed connect, operations fail immediately for this long.
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

/// Redis-backed store shared by all nodes.
///
/// The connection is established once, on first use, so an unreachable Redis
/// at startup surfaces as a per-operation error that the tracker's fail-open
/// policy can absorb. A failed attempt leaves the cell empty; the next attempt
/// is made only after the backoff window, and operations inside the window
/// fail without touching the network.
pub struct RedisTokenStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    reconnect_backoff: Duration,
    last_connect_failure: Mutex<Option<Instant>>,
}

impl RedisTokenStore {
    /// Parse the URL without connecting.
    pub fn new(redis_url: &str) -> Result<Self, StoreError> {
        Self::with_reconnect_backoff(redis_url, RECONNECT_BACKOFF)
    }

    pub fn with_reconnect_backoff(
        redis_url: &str,
        reconnect_backoff: Duration,
    ) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
            reconnect_backoff,
            last_connect_failure: Mutex::new(None),
        })
    }

    fn in_backoff(&self) -> bool {
        match self.last_connect_failure.lock() {
            Ok(last) => last.map_or(false, |at| at.elapsed() < self.reconnect_backoff),
            Err(_) => false,
        }
    }

    fn record_connect_result(&self, failed: bool) {
        if let Ok(mut last) = self.last_connect_failure.lock() {
            *last = if failed { Some(Instant::now()) } else { None };
        }
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        if let Some(conn) = self.conn.get() {
            return Ok(conn.clone());
        }
        if self.in_backoff() {
            return Err(StoreError::Connection(
                "redis unreachable, waiting before reconnecting".to_string(),
            ));
        }

        let conn = self
            .conn
            .get_or_try_init(|| async {
                // No internal retries: the backoff window above paces reconnects.
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(0)
                    .set_connection_timeout(CONNECT_TIMEOUT)
                    .set_response_timeout(RESPONSE_TIMEOUT);
                let connect = ConnectionManager::new_with_config(self.client.clone(), config);
                let result = match tokio::time::timeout(CONNECT_TIMEOUT * 2, connect).await {
                    Ok(Ok(conn)) => {
                        tracing::info!("Connected to Redis token store");
                        Ok(conn)
                    }
                    Ok(Err(e)) => Err(StoreError::Connection(e.to_string())),
                    Err(_) => Err(StoreError::Connection("connect timed out".to_string())),
                };
                self.record_connect_result(result.is_err());
                result
            })
            .await?;
        Ok(conn.clone())
    }
}

fn command_error(e: redis::RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
        StoreError::Connection(e.to_string())
    } else {
        StoreError::Command(e.to_string())
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        conn.exists::<_, bool>(key).await.map_err(command_error)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        conn.get::<_, Option<String>>(key).await.map_err(command_error)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds)
            .await
            .map_err(command_error)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(key).await.map_err(command_error)
    }
}
