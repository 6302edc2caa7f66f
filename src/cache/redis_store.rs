//! Redis-backed cache store.

use super::CacheStore;
use crate::error::BotError;
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::info;

/// Cache store talking to a Redis server through a multiplexed
/// [`ConnectionManager`].
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connects to `url` and verifies the server answers `PING`.
    ///
    /// Both the connection attempt and every later command are bounded by
    /// `timeout`, and the manager does not retry on its own.
    ///
    /// # Errors
    ///
    /// Returns [`BotError::CacheDegraded`] if the URL is invalid or the server
    /// is unreachable.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, BotError> {
        let client = redis::Client::open(url).map_err(degraded)?;
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(timeout)
            .set_response_timeout(timeout);

        let mut conn = tokio::time::timeout(
            timeout,
            ConnectionManager::new_with_config(client, config),
        )
        .await
        .map_err(|_| BotError::CacheDegraded(format!("connection timed out after {timeout:?}")))?
        .map_err(degraded)?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(degraded)?;
        info!("Connected to Redis cache.");

        Ok(Self { conn })
    }
}

fn degraded(err: redis::RedisError) -> BotError {
    BotError::CacheDegraded(err.to_string())
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>, BotError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(degraded)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), BotError> {
        let mut conn = self.conn.clone();
        // SET EX rejects 0
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(degraded)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
