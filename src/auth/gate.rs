//! Per-request authentication gate
//!
//! A presented token must pass, in order: the revocation ledger, the codec
//! (signature, issuer, expiry), the kind check and the session registry. The
//! first failing step decides the error. The gate only reads store state.

use std::sync::Arc;

use crate::error::AuthError;
use crate::models::{Claims, Identity, TokenKind};

use super::codec::TokenCodec;
use super::ledger::RevocationLedger;
use super::registry::SessionRegistry;

const BEARER_SCHEME: &str = "Bearer";

/// Extract the token from an `Authorization` header value
///
/// The scheme must be exactly `Bearer`, separated from the token by one space.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = match header {
        Some(h) if !h.is_empty() => h,
        _ => return Err(AuthError::MissingCredential),
    };

    match header.split_once(' ') {
        Some((BEARER_SCHEME, token)) if !token.is_empty() => Ok(token),
        Some((BEARER_SCHEME, _)) => Err(AuthError::MalformedCredential(
            "empty bearer token".to_string(),
        )),
        _ => Err(AuthError::MalformedCredential(
            "authorization scheme must be Bearer".to_string(),
        )),
    }
}

/// Decides whether a request carries a valid, current token
#[derive(Clone)]
pub struct AuthGate {
    codec: Arc<TokenCodec>,
    registry: SessionRegistry,
    ledger: RevocationLedger,
}

impl AuthGate {
    pub fn new(codec: Arc<TokenCodec>, registry: SessionRegistry, ledger: RevocationLedger) -> Self {
        Self {
            codec,
            registry,
            ledger,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &RevocationLedger {
        &self.ledger
    }

    /// Authenticate an `Authorization` header carrying an access token
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Identity, AuthError> {
        let token = bearer_token(authorization)?;
        let claims = self.verify(token, TokenKind::Access).await?;
        Ok(claims.identity())
    }

    /// Like [`authenticate`](Self::authenticate), additionally requiring the admin role
    pub async fn authenticate_admin(
        &self,
        authorization: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let identity = self.authenticate(authorization).await?;
        if !identity.is_admin() {
            tracing::debug!(subject_id = identity.subject_id, role = %identity.role, "Admin role required");
            return Err(AuthError::PermissionDenied);
        }
        Ok(identity)
    }

    /// Check a bare token of the `expected` kind and return its claims
    pub async fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, AuthError> {
        match self.ledger.is_revoked(token).await {
            Ok(false) => {}
            Ok(true) => {
                tracing::debug!(kind = %expected, "Rejected revoked token");
                return Err(AuthError::RevokedCredential);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Revocation check failed");
                return Err(AuthError::VerificationError(e.to_string()));
            }
        }

        let claims = self.codec.decode(token).map_err(|e| {
            tracing::debug!(error = %e, kind = %expected, "Token failed to decode");
            AuthError::from(e)
        })?;

        if claims.token_kind != expected {
            tracing::debug!(
                subject_id = claims.subject_id,
                expected = %expected,
                found = %claims.token_kind,
                "Wrong token kind"
            );
            return Err(AuthError::WrongTokenKind {
                expected,
                found: claims.token_kind,
            });
        }

        match self.registry.matches(claims.subject_id, expected, token).await {
            Ok(true) => Ok(claims),
            Ok(false) => {
                tracing::debug!(subject_id = claims.subject_id, kind = %expected, "Token superseded");
                Err(AuthError::StaleCredential)
            }
            Err(e) => {
                tracing::warn!(subject_id = claims.subject_id, error = %e, "Registry lookup failed");
                Err(AuthError::StaleCredential)
            }
        }
    }
}
