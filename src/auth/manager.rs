//! Authentication manager
//!
//! This module drives the session protocol on top of the gate: login issues
//! a token pair and registers it, refresh rotates the pair, logout revokes the
//! presented token and clears the subject's sessions. Account administration
//! (registration, status changes) lives here too because disabling an account
//! must invalidate its sessions.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::config;
use crate::database::Database;
use crate::error::{AuthError, DbError, StoreError};
use crate::models::{AccountStatus, Identity, NewUser, TokenKind, TokenPair, User, DEFAULT_ROLE};
use crate::store::KeyValueStore;

use super::codec::TokenCodec;
use super::gate::AuthGate;
use super::ledger::{remaining, RevocationLedger};
use super::password::{hash_password, reject_password, verify_password};
use super::registry::SessionRegistry;

/// Lifetimes used by the session protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Access token lifetime
    pub access_ttl: Duration,

    /// Refresh token lifetime
    pub refresh_ttl: Duration,

    /// Registry TTL margin for access tokens
    pub access_margin: Duration,

    /// Registry TTL margin for refresh tokens
    pub refresh_margin: Duration,

    /// Revocation window for a logout token whose expiry cannot be read
    pub logout_fallback: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_ttl: Duration::from_secs(15 * 60),
            refresh_ttl: Duration::from_secs(7 * 24 * 3600),
            access_margin: Duration::from_secs(5 * 60),
            refresh_margin: Duration::from_secs(3600),
            logout_fallback: Duration::from_secs(15 * 60),
        }
    }
}

impl From<&config::AuthConfig> for AuthConfig {
    fn from(config: &config::AuthConfig) -> Self {
        Self {
            access_ttl: Duration::from_secs(config.access_token_ttl_secs),
            refresh_ttl: Duration::from_secs(config.refresh_token_ttl_secs),
            access_margin: Duration::from_secs(config.access_session_margin_secs),
            refresh_margin: Duration::from_secs(config.refresh_session_margin_secs),
            logout_fallback: Duration::from_secs(config.logout_fallback_secs),
        }
    }
}

impl AuthConfig {
    /// Token lifetime of `kind`
    pub fn lifetime(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Registry entry TTL of `kind`: lifetime plus margin
    pub fn session_ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl.saturating_add(self.access_margin),
            TokenKind::Refresh => self.refresh_ttl.saturating_add(self.refresh_margin),
        }
    }
}

/// Authentication manager
///
/// Provides the login/refresh/logout protocol and account administration.
pub struct AuthManager<D: Database> {
    db: Arc<D>,
    gate: AuthGate,
    config: AuthConfig,
}

impl<D: Database> AuthManager<D> {
    /// Create a new authentication manager
    pub fn new(
        db: Arc<D>,
        store: Arc<dyn KeyValueStore>,
        codec: TokenCodec,
        config: AuthConfig,
    ) -> Self {
        let gate = AuthGate::new(
            Arc::new(codec),
            SessionRegistry::new(store.clone()),
            RevocationLedger::new(store),
        );
        Self { db, gate, config }
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Authenticate an `Authorization` header carrying an access token
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Identity, AuthError> {
        self.gate.authenticate(authorization).await
    }

    /// Authenticate and require the admin role
    pub async fn authenticate_admin(
        &self,
        authorization: Option<&str>,
    ) -> Result<Identity, AuthError> {
        self.gate.authenticate_admin(authorization).await
    }

    /// Verify a password and open a new session
    ///
    /// Any session the user already had is superseded.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let user = self
            .db
            .get_user_by_username(username)
            .await
            .map_err(identity_store_error)?;

        let verified = match &user {
            Some(user) => verify_password(password, &user.password_hash),
            None => reject_password(password),
        };
        let user = match user {
            Some(user) if verified => user,
            _ => {
                tracing::info!(username = %username, "Login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !user.account_status.is_active() {
            tracing::info!(subject_id = user.id, status = %user.account_status, "Login for disabled account");
            return Err(AuthError::IdentityDisabled);
        }

        let pair = self.open_session(&user.identity()).await?;

        if let Err(e) = self.db.update_last_login(user.id).await {
            tracing::warn!(subject_id = user.id, error = %e, "Failed to record last login");
        }

        tracing::info!(subject_id = user.id, username = %user.username, "User logged in");
        Ok(pair)
    }

    /// Exchange a current refresh token for a new pair
    ///
    /// The old refresh token is revoked; the old access token is superseded in
    /// the registry but not revoked.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.gate.verify(refresh_token, TokenKind::Refresh).await?;

        let user = self
            .db
            .get_user_by_id(claims.subject_id)
            .await
            .map_err(identity_store_error)?
            .ok_or_else(|| {
                tracing::info!(subject_id = claims.subject_id, "Refresh for deleted user");
                AuthError::StaleCredential
            })?;

        if !user.account_status.is_active() {
            tracing::info!(subject_id = user.id, status = %user.account_status, "Refresh for disabled account");
            return Err(AuthError::IdentityDisabled);
        }

        self.gate
            .ledger()
            .revoke_until(refresh_token, claims.expires_at)
            .await
            .map_err(|e| session_store_error("revoke refresh token", e))?;

        let pair = self.open_session(&user.identity()).await?;

        tracing::info!(subject_id = user.id, "Session refreshed");
        Ok(pair)
    }

    /// Revoke the presented token and drop all sessions of `identity`
    ///
    /// Failing to revoke the presented token is logged and tolerated; failing
    /// to clear the registry is not.
    pub async fn logout(&self, identity: &Identity, presented_token: &str) -> Result<(), AuthError> {
        let ttl = match self.gate.codec().peek_expiry(presented_token) {
            Some(expires_at) => remaining(expires_at, Utc::now()),
            None => {
                tracing::debug!(
                    subject_id = identity.subject_id,
                    "Token expiry unreadable, revoking for fallback window"
                );
                self.config.logout_fallback
            }
        };

        if let Err(e) = self.gate.ledger().revoke(presented_token, ttl).await {
            tracing::warn!(subject_id = identity.subject_id, error = %e, "Failed to revoke logout token");
        }

        self.invalidate_user_tokens(identity.subject_id).await?;

        tracing::info!(subject_id = identity.subject_id, "User logged out");
        Ok(())
    }

    /// Revoke whatever tokens the registry holds for `subject_id`, then clear it
    pub async fn invalidate_user_tokens(&self, subject_id: i64) -> Result<(), AuthError> {
        let registry = self.gate.registry();
        let now = Utc::now();

        for kind in TokenKind::ALL {
            match registry.get(subject_id, kind).await {
                Ok(Some(token)) => {
                    let ttl = match self.gate.codec().peek_expiry(&token) {
                        Some(expires_at) => remaining(expires_at, now),
                        None => self.config.lifetime(kind),
                    };
                    if let Err(e) = self.gate.ledger().revoke(&token, ttl).await {
                        tracing::warn!(subject_id, kind = %kind, error = %e, "Failed to revoke session token");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(subject_id, kind = %kind, error = %e, "Failed to read session token");
                }
            }
        }

        registry
            .delete_all(subject_id)
            .await
            .map_err(|e| session_store_error("clear sessions", e))
    }

    /// Create a regular user
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        self.register_with_role(username, email, password, DEFAULT_ROLE)
            .await
    }

    /// Create a user with `role`
    pub async fn register_with_role(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<User, AuthError> {
        let taken = self
            .db
            .username_or_email_exists(username, email)
            .await
            .map_err(identity_store_error)?;
        if taken {
            return Err(AuthError::Conflict(
                "username or email already registered".to_string(),
            ));
        }

        let password_hash =
            hash_password(password).map_err(|e| AuthError::Internal(e.to_string()))?;

        let new_user = NewUser::new(username, email, password_hash).with_role(role);
        let user = self.db.create_user(&new_user).await.map_err(|e| match e {
            DbError::ConstraintViolation(_) => {
                AuthError::Conflict("username or email already registered".to_string())
            }
            other => identity_store_error(other),
        })?;

        tracing::info!(subject_id = user.id, username = %user.username, role = %user.role, "User registered");
        Ok(user)
    }

    /// Change an account's status; any non-active status ends its sessions
    pub async fn set_account_status(
        &self,
        subject_id: i64,
        status: AccountStatus,
    ) -> Result<(), AuthError> {
        self.db
            .set_account_status(subject_id, status)
            .await
            .map_err(|e| match e {
                DbError::NotFound => AuthError::UnknownUser(subject_id),
                other => identity_store_error(other),
            })?;

        if !status.is_active() {
            self.invalidate_user_tokens(subject_id).await?;
        }

        tracing::info!(subject_id, status = %status, "Account status changed");
        Ok(())
    }

    /// Issue both tokens, then register both
    async fn open_session(&self, identity: &Identity) -> Result<TokenPair, AuthError> {
        let codec = self.gate.codec();

        let (access_token, _) = codec
            .issue_for(identity, TokenKind::Access, self.chrono_lifetime(TokenKind::Access)?)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let (refresh_token, _) = codec
            .issue_for(identity, TokenKind::Refresh, self.chrono_lifetime(TokenKind::Refresh)?)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let registry = self.gate.registry();
        registry
            .put(
                identity.subject_id,
                TokenKind::Access,
                &access_token,
                self.config.session_ttl(TokenKind::Access),
            )
            .await
            .map_err(|e| session_store_error("register access token", e))?;
        registry
            .put(
                identity.subject_id,
                TokenKind::Refresh,
                &refresh_token,
                self.config.session_ttl(TokenKind::Refresh),
            )
            .await
            .map_err(|e| session_store_error("register refresh token", e))?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: i64::try_from(self.config.access_ttl.as_secs()).unwrap_or(i64::MAX),
        })
    }

    fn chrono_lifetime(&self, kind: TokenKind) -> Result<chrono::Duration, AuthError> {
        chrono::Duration::from_std(self.config.lifetime(kind))
            .map_err(|e| AuthError::Internal(format!("{} lifetime out of range: {}", kind, e)))
    }
}

fn identity_store_error(err: DbError) -> AuthError {
    tracing::error!(error = %err, "Identity store failure");
    AuthError::Internal(err.to_string())
}

fn session_store_error(op: &str, err: StoreError) -> AuthError {
    tracing::error!(error = %err, "Session store failure: {}", op);
    AuthError::SessionStore(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MockDatabase, SqliteDatabase};
    use crate::models::ADMIN_ROLE;
    use crate::store::{MemoryStore, MockKeyValueStore};

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET, "test-issuer")
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {}", token)
    }

    async fn setup() -> AuthManager<SqliteDatabase> {
        let db = SqliteDatabase::in_memory().await.unwrap();
        let manager = AuthManager::new(
            Arc::new(db),
            Arc::new(MemoryStore::new()),
            codec(),
            AuthConfig::default(),
        );
        manager
            .register("alice", "alice@example.com", "wonderland")
            .await
            .unwrap();
        manager
    }

    fn stored_user(id: i64, password: &str, status: AccountStatus) -> User {
        User {
            id,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: hash_password(password).unwrap(),
            role: DEFAULT_ROLE.to_string(),
            account_status: status,
            last_login: None,
            created_at: Utc::now(),
        }
    }

    // Test 1: AuthConfig defaults and session TTLs
    #[test]
    fn test_auth_config_ttls() {
        let config = AuthConfig::default();
        assert_eq!(config.lifetime(TokenKind::Access), Duration::from_secs(900));
        assert_eq!(config.session_ttl(TokenKind::Access), Duration::from_secs(1200));
        assert_eq!(
            config.session_ttl(TokenKind::Refresh),
            Duration::from_secs(7 * 24 * 3600 + 3600)
        );
    }

    // Test 2: AuthConfig from file configuration
    #[test]
    fn test_auth_config_from_config() {
        let file = config::AuthConfig {
            access_token_ttl_secs: 60,
            refresh_token_ttl_secs: 600,
            ..config::AuthConfig::default()
        };
        let config = AuthConfig::from(&file);
        assert_eq!(config.access_ttl, Duration::from_secs(60));
        assert_eq!(config.refresh_ttl, Duration::from_secs(600));
        assert_eq!(config.access_margin, Duration::from_secs(300));
    }

    // Test 3: Login issues a pair that authenticates
    #[tokio::test]
    async fn test_login_success() {
        let manager = setup().await;

        let pair = manager.login("alice", "wonderland").await.unwrap();
        assert_eq!(pair.expires_in, 900);
        assert_ne!(pair.access_token, pair.refresh_token);

        let identity = manager
            .authenticate(Some(&bearer(&pair.access_token)))
            .await
            .unwrap();
        assert_eq!(identity.subject_name, "alice");
        assert_eq!(identity.role, DEFAULT_ROLE);

        let registry = manager.gate().registry();
        assert!(registry
            .matches(identity.subject_id, TokenKind::Refresh, &pair.refresh_token)
            .await
            .unwrap());
    }

    // Test 4: Unknown user and wrong password are indistinguishable
    #[tokio::test]
    async fn test_login_invalid_credentials() {
        let manager = setup().await;

        assert_eq!(
            manager.login("alice", "wrong").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            manager.login("mallory", "wonderland").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    // Test 5: Password is checked before account status
    #[tokio::test]
    async fn test_login_disabled_account() {
        let mut db = MockDatabase::new();
        let user = stored_user(7, "secret", AccountStatus::Suspended);
        db.expect_get_user_by_username()
            .returning(move |_| Ok(Some(user.clone())));

        let manager = AuthManager::new(
            Arc::new(db),
            Arc::new(MemoryStore::new()),
            codec(),
            AuthConfig::default(),
        );

        assert_eq!(
            manager.login("alice", "nope").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            manager.login("alice", "secret").await,
            Err(AuthError::IdentityDisabled)
        );
    }

    // Test 6: Registry write failure fails the login
    #[tokio::test]
    async fn test_login_store_failure() {
        let mut db = MockDatabase::new();
        let user = stored_user(7, "secret", AccountStatus::Active);
        db.expect_get_user_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        db.expect_update_last_login().never();

        let mut store = MockKeyValueStore::new();
        store
            .expect_set_ex()
            .returning(|_, _, _| Err(StoreError::Connection("down".to_string())));

        let manager = AuthManager::new(Arc::new(db), Arc::new(store), codec(), AuthConfig::default());

        assert!(matches!(
            manager.login("alice", "secret").await,
            Err(AuthError::SessionStore(_))
        ));
    }

    // Test 7: Failing to record last login does not fail the login
    #[tokio::test]
    async fn test_login_last_login_best_effort() {
        let mut db = MockDatabase::new();
        let user = stored_user(7, "secret", AccountStatus::Active);
        db.expect_get_user_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        db.expect_update_last_login()
            .returning(|_| Err(DbError::NotFound));

        let manager = AuthManager::new(
            Arc::new(db),
            Arc::new(MemoryStore::new()),
            codec(),
            AuthConfig::default(),
        );

        assert!(manager.login("alice", "secret").await.is_ok());
    }

    // Test 8: A second login supersedes the first without revoking it
    #[tokio::test]
    async fn test_second_login_supersedes_first() {
        let manager = setup().await;

        let first = manager.login("alice", "wonderland").await.unwrap();
        let second = manager.login("alice", "wonderland").await.unwrap();

        assert_eq!(
            manager.authenticate(Some(&bearer(&first.access_token))).await,
            Err(AuthError::StaleCredential)
        );
        assert!(manager
            .authenticate(Some(&bearer(&second.access_token)))
            .await
            .is_ok());
        assert!(!manager
            .gate()
            .ledger()
            .is_revoked(&first.access_token)
            .await
            .unwrap());
    }

    // Test 9: Refresh rotates the pair
    #[tokio::test]
    async fn test_refresh_rotates() {
        let manager = setup().await;
        let first = manager.login("alice", "wonderland").await.unwrap();

        let second = manager.refresh(&first.refresh_token).await.unwrap();

        assert!(manager
            .authenticate(Some(&bearer(&second.access_token)))
            .await
            .is_ok());

        // The old access token is superseded, not revoked
        assert_eq!(
            manager.authenticate(Some(&bearer(&first.access_token))).await,
            Err(AuthError::StaleCredential)
        );

        // The old refresh token is revoked
        assert_eq!(
            manager.refresh(&first.refresh_token).await,
            Err(AuthError::RevokedCredential)
        );

        // The new refresh token still works
        assert!(manager.refresh(&second.refresh_token).await.is_ok());
    }

    // Test 10: Access token cannot be used to refresh
    #[tokio::test]
    async fn test_refresh_with_access_token() {
        let manager = setup().await;
        let pair = manager.login("alice", "wonderland").await.unwrap();

        assert_eq!(
            manager.refresh(&pair.access_token).await,
            Err(AuthError::WrongTokenKind {
                expected: TokenKind::Refresh,
                found: TokenKind::Access
            })
        );
    }

    // Test 11: Refresh for a disabled account is refused
    #[tokio::test]
    async fn test_refresh_disabled_account() {
        let manager = setup().await;
        let pair = manager.login("alice", "wonderland").await.unwrap();
        let user = manager.db.get_user_by_username("alice").await.unwrap().unwrap();

        // Status change without going through the manager keeps the session alive
        manager
            .db
            .set_account_status(user.id, AccountStatus::Inactive)
            .await
            .unwrap();

        assert_eq!(
            manager.refresh(&pair.refresh_token).await,
            Err(AuthError::IdentityDisabled)
        );
    }

    // Test 12: Refresh for a deleted user is stale
    #[tokio::test]
    async fn test_refresh_deleted_user() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let mut db = MockDatabase::new();
        let user = stored_user(7, "secret", AccountStatus::Active);
        db.expect_get_user_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        db.expect_update_last_login().returning(|_| Ok(()));
        db.expect_get_user_by_id().returning(|_| Ok(None));

        let manager = AuthManager::new(Arc::new(db), store, codec(), AuthConfig::default());
        let pair = manager.login("alice", "secret").await.unwrap();

        assert_eq!(
            manager.refresh(&pair.refresh_token).await,
            Err(AuthError::StaleCredential)
        );
    }

    // Test 13: Logout revokes the presented token and clears both sessions
    #[tokio::test]
    async fn test_logout() {
        let manager = setup().await;
        let pair = manager.login("alice", "wonderland").await.unwrap();
        let identity = manager
            .authenticate(Some(&bearer(&pair.access_token)))
            .await
            .unwrap();

        manager.logout(&identity, &pair.access_token).await.unwrap();

        assert_eq!(
            manager.authenticate(Some(&bearer(&pair.access_token))).await,
            Err(AuthError::RevokedCredential)
        );
        assert_eq!(
            manager.refresh(&pair.refresh_token).await,
            Err(AuthError::RevokedCredential)
        );

        let registry = manager.gate().registry();
        assert_eq!(
            registry.get(identity.subject_id, TokenKind::Access).await.unwrap(),
            None
        );
        assert_eq!(
            registry.get(identity.subject_id, TokenKind::Refresh).await.unwrap(),
            None
        );
    }

    // Test 14: Logout with an unreadable token falls back to the default window
    #[tokio::test]
    async fn test_logout_unreadable_token() {
        let manager = setup().await;
        manager.login("alice", "wonderland").await.unwrap();
        let identity = Identity::new(1, "alice", DEFAULT_ROLE);

        manager.logout(&identity, "not-a-token").await.unwrap();

        assert!(manager
            .gate()
            .ledger()
            .is_revoked("not-a-token")
            .await
            .unwrap());
        assert_eq!(
            manager.gate().registry().get(1, TokenKind::Access).await.unwrap(),
            None
        );
    }

    // Test 15: Logout tolerates a failed revocation write
    #[tokio::test]
    async fn test_logout_revoke_failure_tolerated() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_set_ex()
            .returning(|_, _, _| Err(StoreError::Command("readonly".to_string())));
        store.expect_get().returning(|_| Ok(None));
        store.expect_delete().times(1).returning(|_| Ok(()));

        let manager = AuthManager::new(
            Arc::new(MockDatabase::new()),
            Arc::new(store),
            codec(),
            AuthConfig::default(),
        );
        let identity = Identity::new(7, "alice", DEFAULT_ROLE);

        assert!(manager.logout(&identity, "token").await.is_ok());
    }

    // Test 16: Logout reports failure when the registry cannot be cleared
    #[tokio::test]
    async fn test_logout_registry_failure() {
        let mut store = MockKeyValueStore::new();
        store.expect_set_ex().returning(|_, _, _| Ok(()));
        store.expect_get().returning(|_| Ok(None));
        store
            .expect_delete()
            .returning(|_| Err(StoreError::Connection("down".to_string())));

        let manager = AuthManager::new(
            Arc::new(MockDatabase::new()),
            Arc::new(store),
            codec(),
            AuthConfig::default(),
        );
        let identity = Identity::new(7, "alice", DEFAULT_ROLE);

        assert!(matches!(
            manager.logout(&identity, "token").await,
            Err(AuthError::SessionStore(_))
        ));
    }

    // Test 17: Registration rejects duplicates
    #[tokio::test]
    async fn test_register_conflict() {
        let manager = setup().await;

        assert!(matches!(
            manager.register("alice", "other@example.com", "pw").await,
            Err(AuthError::Conflict(_))
        ));
        assert!(matches!(
            manager.register("bob", "alice@example.com", "pw").await,
            Err(AuthError::Conflict(_))
        ));

        let bob = manager
            .register("bob", "bob@example.com", "builder")
            .await
            .unwrap();
        assert_eq!(bob.role, DEFAULT_ROLE);
        assert!(manager.login("bob", "builder").await.is_ok());
    }

    // Test 18: Registration race surfaces as a conflict
    #[tokio::test]
    async fn test_register_constraint_race() {
        let mut db = MockDatabase::new();
        db.expect_username_or_email_exists()
            .returning(|_, _| Ok(false));
        db.expect_create_user()
            .returning(|_| Err(DbError::ConstraintViolation("UNIQUE".to_string())));

        let manager = AuthManager::new(
            Arc::new(db),
            Arc::new(MemoryStore::new()),
            codec(),
            AuthConfig::default(),
        );

        assert!(matches!(
            manager.register("alice", "a@example.com", "pw").await,
            Err(AuthError::Conflict(_))
        ));
    }

    // Test 19: Disabling an account ends its sessions
    #[tokio::test]
    async fn test_set_account_status_invalidates() {
        let manager = setup().await;
        let pair = manager.login("alice", "wonderland").await.unwrap();
        let user = manager.db.get_user_by_username("alice").await.unwrap().unwrap();

        manager
            .set_account_status(user.id, AccountStatus::Suspended)
            .await
            .unwrap();

        assert_eq!(
            manager.authenticate(Some(&bearer(&pair.access_token))).await,
            Err(AuthError::RevokedCredential)
        );
        assert_eq!(
            manager.refresh(&pair.refresh_token).await,
            Err(AuthError::RevokedCredential)
        );
        assert_eq!(
            manager.login("alice", "wonderland").await,
            Err(AuthError::IdentityDisabled)
        );

        manager
            .set_account_status(user.id, AccountStatus::Active)
            .await
            .unwrap();
        assert!(manager.login("alice", "wonderland").await.is_ok());
    }

    // Test 20: Unknown account status target
    #[tokio::test]
    async fn test_set_account_status_unknown_user() {
        let manager = setup().await;
        assert_eq!(
            manager
                .set_account_status(999, AccountStatus::Suspended)
                .await,
            Err(AuthError::UnknownUser(999))
        );
    }

    // Test 21: Admin users pass the admin gate
    #[tokio::test]
    async fn test_admin_login() {
        let manager = setup().await;
        manager
            .register_with_role("root", "root@example.com", "toor", ADMIN_ROLE)
            .await
            .unwrap();

        let admin = manager.login("root", "toor").await.unwrap();
        let user = manager.login("alice", "wonderland").await.unwrap();

        assert!(manager
            .authenticate_admin(Some(&bearer(&admin.access_token)))
            .await
            .unwrap()
            .is_admin());
        assert_eq!(
            manager
                .authenticate_admin(Some(&bearer(&user.access_token)))
                .await,
            Err(AuthError::PermissionDenied)
        );
    }

    // Test 22: Access entry written but refresh entry not fails the login
    #[tokio::test]
    async fn test_login_partial_registry_write() {
        let mut db = MockDatabase::new();
        let user = stored_user(7, "secret", AccountStatus::Active);
        db.expect_get_user_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        db.expect_update_last_login().never();

        let mut store = MockKeyValueStore::new();
        store
            .expect_set_ex()
            .withf(|key, _, _| key.starts_with("access_token:"))
            .times(1)
            .returning(|_, _, _| Ok(()));
        store
            .expect_set_ex()
            .withf(|key, _, _| key.starts_with("refresh_token:"))
            .times(1)
            .returning(|_, _, _| Err(StoreError::Connection("down".to_string())));

        let manager = AuthManager::new(Arc::new(db), Arc::new(store), codec(), AuthConfig::default());

        assert!(matches!(
            manager.login("alice", "secret").await,
            Err(AuthError::SessionStore(_))
        ));
    }

    // Test 23: Unknown usernames cost a password hash like wrong passwords do
    #[tokio::test]
    async fn test_login_unknown_user_not_faster() {
        let manager = setup().await;

        let start = std::time::Instant::now();
        let wrong = manager.login("alice", "wrong").await;
        let wrong_password = start.elapsed();

        let start = std::time::Instant::now();
        let unknown = manager.login("mallory", "wrong").await;
        let unknown_user = start.elapsed();

        assert_eq!(wrong, Err(AuthError::InvalidCredentials));
        assert_eq!(unknown, Err(AuthError::InvalidCredentials));
        assert!(
            unknown_user * 4 >= wrong_password,
            "unknown user rejected in {:?}, wrong password in {:?}",
            unknown_user,
            wrong_password
        );
    }

    // Test 24: An out-of-range lifetime fails the login instead of panicking
    #[tokio::test]
    async fn test_login_lifetime_overflow() {
        let mut db = MockDatabase::new();
        let user = stored_user(7, "secret", AccountStatus::Active);
        db.expect_get_user_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        db.expect_update_last_login().never();

        let config = AuthConfig {
            access_ttl: Duration::from_secs(10_000_000_000_000),
            ..AuthConfig::default()
        };
        let manager = AuthManager::new(
            Arc::new(db),
            Arc::new(MemoryStore::new()),
            codec(),
            config,
        );

        assert!(matches!(
            manager.login("alice", "secret").await,
            Err(AuthError::Internal(_))
        ));
    }
}
