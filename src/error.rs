//! Application error types for session-gate
//!
//! This module defines the error types used throughout the crate.
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

use crate::models::TokenKind;

/// Authentication errors surfaced by the gate and the login/refresh/logout protocol
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AuthError {
    /// No bearer credential was presented
    #[error("Missing authorization credential")]
    MissingCredential,

    /// The credential is structurally invalid (wrong scheme, bad encoding, bad claims)
    #[error("Malformed credential: {0}")]
    MalformedCredential(String),

    /// The token signature does not verify
    #[error("Token signature is invalid")]
    SignatureInvalid,

    /// The token is past its expiry
    #[error("Token has expired")]
    Expired,

    /// The token is not valid yet
    #[error("Token is not yet valid")]
    NotYetValid,

    /// An access token was presented where a refresh token was expected, or vice versa
    #[error("Wrong token kind: expected {expected}, found {found}")]
    WrongTokenKind { expected: TokenKind, found: TokenKind },

    /// The token has been explicitly revoked
    #[error("Token has been revoked")]
    RevokedCredential,

    /// The token is no longer the current session token for its subject
    #[error("Session is no longer valid, please log in again")]
    StaleCredential,

    /// The revocation state could not be checked
    #[error("Could not verify credential: {0}")]
    VerificationError(String),

    /// The account is not active
    #[error("Account is disabled")]
    IdentityDisabled,

    /// The identity lacks the role required for the operation
    #[error("Permission denied")]
    PermissionDenied,

    /// Login failed; deliberately does not say which part was wrong
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// A username or email is already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No user with this id
    #[error("User {0} not found")]
    UnknownUser(i64),

    /// Writing session state failed
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Unexpected failure in a collaborator
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DecodeError> for AuthError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Malformed(msg) => AuthError::MalformedCredential(msg),
            DecodeError::SignatureInvalid => AuthError::SignatureInvalid,
            DecodeError::Expired => AuthError::Expired,
            DecodeError::NotYetValid => AuthError::NotYetValid,
        }
    }
}

/// Token decoding errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Structurally invalid token
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Tampered token, wrong secret or unexpected algorithm
    #[error("Signature invalid")]
    SignatureInvalid,

    /// `exp` is in the past
    #[error("Token expired")]
    Expired,

    /// `nbf` is in the future
    #[error("Token not yet valid")]
    NotYetValid,
}

/// Token issuing errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Claims violate `nbf <= iat < exp`
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),

    /// Signing failed
    #[error("Encoding failed: {0}")]
    Encoding(String),
}

/// Key-value store errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Could not connect to the store
    #[error("Store connection error: {0}")]
    Connection(String),

    /// A command failed
    #[error("Store command error: {0}")]
    Command(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DbError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection-level error from the async SQLite wrapper
    #[error("Database connection error: {0}")]
    Connection(#[from] tokio_rusqlite::Error),

    /// Record not found
    #[error("Record not found")]
    NotFound,

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Password hashing errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HashError {
    /// Hashing failed
    #[error("Hash failed: {0}")]
    HashFailed(String),
}

/// Application-level error type
///
/// Aggregates the domain-specific error types for the binary and server setup.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
