//! Token-related domain models
//!
//! This module defines the claims embedded in every session token, the token
//! kinds, the identity exposed to request handlers and the token pair handed
//! back to clients.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Role name that grants access to admin-only operations
pub const ADMIN_ROLE: &str = "admin";

/// Role assigned to newly registered users
pub const DEFAULT_ROLE: &str = "user";

/// Length of the random token id in bytes
const TOKEN_ID_BYTES: usize = 16;

/// Kind of session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived credential for ordinary requests
    Access,
    /// Long-lived credential used only to obtain a new pair
    Refresh,
}

impl TokenKind {
    /// Both kinds, in registry order
    pub const ALL: [TokenKind; 2] = [TokenKind::Access, TokenKind::Refresh];

    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }

    /// Key prefix of the session registry entry for this kind
    pub fn registry_prefix(&self) -> &'static str {
        match self {
            TokenKind::Access => "access_token:",
            TokenKind::Refresh => "refresh_token:",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TokenKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            _ => Err(format!("Invalid token kind: {}", s)),
        }
    }
}

/// Identity claims carried by every token
///
/// Timestamps are whole seconds so that a decoded token compares equal to
/// the claims it was issued from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "user_id")]
    pub subject_id: i64,

    #[serde(rename = "username")]
    pub subject_name: String,

    pub role: String,

    #[serde(rename = "token_type")]
    pub token_kind: TokenKind,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "nbf", with = "chrono::serde::ts_seconds")]
    pub not_before: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,

    #[serde(rename = "iss")]
    pub issuer: String,

    /// Random token id; keeps tokens issued within the same second distinct
    #[serde(rename = "jti")]
    pub token_id: String,
}

impl Claims {
    /// Build claims for `identity` valid from now for `lifetime`
    pub fn new(
        identity: &Identity,
        kind: TokenKind,
        issuer: impl Into<String>,
        lifetime: Duration,
    ) -> Result<Self, CodecError> {
        Self::new_at(identity, kind, issuer, lifetime, Utc::now())
    }

    /// Build claims issued at `now`
    ///
    /// Fails if `now + lifetime` is outside the representable range.
    pub fn new_at(
        identity: &Identity,
        kind: TokenKind,
        issuer: impl Into<String>,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, CodecError> {
        let now = now.trunc_subsecs(0);
        let expires_at = now.checked_add_signed(lifetime).ok_or_else(|| {
            CodecError::InvalidClaims(format!("lifetime of {}s overflows", lifetime.num_seconds()))
        })?;
        Ok(Self {
            subject_id: identity.subject_id,
            subject_name: identity.subject_name.clone(),
            role: identity.role.clone(),
            token_kind: kind,
            issued_at: now,
            not_before: now,
            expires_at,
            issuer: issuer.into(),
            token_id: new_token_id(),
        })
    }

    /// Check `not_before <= issued_at < expires_at`
    pub fn is_well_formed(&self) -> bool {
        self.not_before <= self.issued_at && self.issued_at < self.expires_at
    }

    /// Identity described by these claims
    pub fn identity(&self) -> Identity {
        Identity::from(self)
    }
}

/// Authenticated identity attached to a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: i64,
    pub subject_name: String,
    pub role: String,
}

impl Identity {
    pub fn new(subject_id: i64, subject_name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject_id,
            subject_name: subject_name.into(),
            role: role.into(),
        }
    }

    /// Whether this identity holds the admin role
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

impl From<&Claims> for Identity {
    fn from(claims: &Claims) -> Self {
        Self {
            subject_id: claims.subject_id,
            subject_name: claims.subject_name.clone(),
            role: claims.role.clone(),
        }
    }
}

/// Access and refresh token issued together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,

    /// Seconds until the access token expires
    pub expires_in: i64,
}

fn new_token_id() -> String {
    let mut bytes = [0u8; TOKEN_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
