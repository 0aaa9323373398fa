//! Key-value store backends for session state
//!
//! The session registry and the revocation ledger only need a handful of
//! single-key atomic operations with native TTL. [`KeyValueStore`] captures
//! those; Redis is the production backend and [`MemoryStore`] serves
//! development setups and tests.

mod memory;
mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::StoreError;

pub use self::memory::MemoryStore;
pub use self::redis::{RedisStore, RedisStoreConfig};

/// Trait for key-value stores with per-key expiry
///
/// Every method maps to one store command; callers never hold a lock across
/// calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the name of this backend
    fn name(&self) -> &str;

    /// Sets `key` to `value`, expiring after `ttl`; overwrites any existing value
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Returns the value of `key`, or `None` if missing or expired
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Deletes all `keys` in one command; missing keys are ignored
    async fn delete(&self, keys: &[String]) -> Result<(), StoreError>;

    /// Returns whether `key` exists
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Checks that the store is reachable
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Build the store selected by the configuration
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    match config.backend {
        StoreBackend::Redis => {
            let store = RedisStore::connect(RedisStoreConfig::from(config)).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => {
            let store = MemoryStore::new();
            store.spawn_sweeper(Duration::from_secs(config.sweep_interval_secs.max(1)));
            Ok(Arc::new(store))
        }
    }
}
