//! Redis-backed key-value store
//!
//! Uses a [`ConnectionManager`] so that a dropped connection is re-established
//! transparently. Every key is written with the configured prefix.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::config::StoreConfig;
use crate::error::StoreError;

use super::KeyValueStore;

/// Configuration for the Redis store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL
    pub url: String,
    /// Key prefix for all entries
    pub prefix: String,
    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            prefix: String::new(),
            connection_timeout_secs: 5,
        }
    }
}

impl From<&StoreConfig> for RedisStoreConfig {
    fn from(config: &StoreConfig) -> Self {
        Self {
            url: config.redis_url.clone(),
            prefix: config.key_prefix.clone(),
            connection_timeout_secs: config.connection_timeout_secs,
        }
    }
}

/// Redis key-value store
pub struct RedisStore {
    config: RedisStoreConfig,
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects to Redis, failing if the connection is not up within the timeout
    pub async fn connect(config: RedisStoreConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| StoreError::Connection(format!("invalid redis url: {}", e)))?;

        let timeout = Duration::from_secs(config.connection_timeout_secs);
        let conn = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                StoreError::Connection(format!("timed out connecting to {}", config.url))
            })?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, prefix = %config.prefix, "Connected to Redis");

        Ok(Self { config, conn })
    }

    /// Returns the key prefix
    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.config.prefix, key)
    }
}

/// Redis expiry has whole-second resolution; never let a TTL round down to zero
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn command_error(op: &str, err: redis::RedisError) -> StoreError {
    if err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout() {
        StoreError::Connection(format!("redis {}: {}", op, err))
    } else {
        StoreError::Command(format!("redis {}: {}", op, err))
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    fn name(&self) -> &str {
        "redis"
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(self.make_key(key), value, ttl_secs(ttl))
            .await
            .map_err(|e| command_error("set", e))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(self.make_key(key))
            .await
            .map_err(|e| command_error("get", e))
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let prefixed: Vec<String> = keys.iter().map(|k| self.make_key(k)).collect();
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(prefixed)
            .await
            .map_err(|e| command_error("del", e))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(self.make_key(key))
            .await
            .map_err(|e| command_error("exists", e))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| command_error("ping", e))
    }
}
