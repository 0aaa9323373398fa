//! Session registry
//!
//! Tracks the single authoritative token per `(subject_id, kind)`. An entry is
//! overwritten by every login or refresh and removed on logout, so any token
//! that is no longer the registered one is stale even if its signature and
//! expiry still check out.

use std::sync::Arc;
use std::time::Duration;

use crate::error::StoreError;
use crate::models::TokenKind;
use crate::store::KeyValueStore;

/// Registry of current session tokens
#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Store key for a subject's token of `kind`
    pub fn key(subject_id: i64, kind: TokenKind) -> String {
        format!("{}{}", kind.registry_prefix(), subject_id)
    }

    /// Record `token` as the current one, replacing any previous entry
    pub async fn put(
        &self,
        subject_id: i64,
        kind: TokenKind,
        token: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        self.store
            .set_ex(&Self::key(subject_id, kind), token, ttl)
            .await
    }

    /// Current token, if any
    pub async fn get(&self, subject_id: i64, kind: TokenKind) -> Result<Option<String>, StoreError> {
        self.store.get(&Self::key(subject_id, kind)).await
    }

    /// Whether `candidate` is exactly the current token
    pub async fn matches(
        &self,
        subject_id: i64,
        kind: TokenKind,
        candidate: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.get(subject_id, kind).await?.as_deref() == Some(candidate))
    }

    pub async fn delete(&self, subject_id: i64, kind: TokenKind) -> Result<(), StoreError> {
        self.store.delete(&[Self::key(subject_id, kind)]).await
    }

    /// Remove both entries of a subject in one store call
    pub async fn delete_all(&self, subject_id: i64) -> Result<(), StoreError> {
        let keys: Vec<String> = TokenKind::ALL
            .iter()
            .map(|kind| Self::key(subject_id, *kind))
            .collect();
        self.store.delete(&keys).await
    }
}
