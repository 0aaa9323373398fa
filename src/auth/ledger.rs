//! Revocation ledger
//!
//! Explicitly invalidated tokens are recorded under `blacklist:<token>` until
//! they would have expired anyway. Entries are never deleted; they age out.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::store::KeyValueStore;

/// Shortest time a revocation entry is kept
pub const MIN_REVOCATION_TTL: Duration = Duration::from_secs(60);

const KEY_PREFIX: &str = "blacklist:";
const SENTINEL: &str = "blacklisted";

/// Ledger of revoked tokens
#[derive(Clone)]
pub struct RevocationLedger {
    store: Arc<dyn KeyValueStore>,
}

impl RevocationLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn key(token: &str) -> String {
        format!("{}{}", KEY_PREFIX, token)
    }

    /// Revoke `token` for `ttl`, kept for at least [`MIN_REVOCATION_TTL`]
    pub async fn revoke(&self, token: &str, ttl: Duration) -> Result<(), StoreError> {
        let ttl = ttl.max(MIN_REVOCATION_TTL);
        self.store.set_ex(&Self::key(token), SENTINEL, ttl).await
    }

    /// Revoke `token` until it expires
    pub async fn revoke_until(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.revoke(token, remaining(expires_at, Utc::now())).await
    }

    /// Whether `token` has been revoked; a store failure is an error, never "no"
    pub async fn is_revoked(&self, token: &str) -> Result<bool, StoreError> {
        self.store.exists(&Self::key(token)).await
    }
}

/// Time left until `expires_at`, zero once passed
pub fn remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (expires_at - now).to_std().unwrap_or(Duration::ZERO)
}
