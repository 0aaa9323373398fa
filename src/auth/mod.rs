//! Authentication system for session-gate
//!
//! This module provides the token-based authentication core:
//! - Signed token issuing and verification
//! - Session registry and revocation ledger on a key-value store
//! - The per-request authentication gate
//! - The login/refresh/logout protocol

pub mod codec;
pub mod gate;
pub mod ledger;
pub mod manager;
pub mod password;
pub mod registry;

pub use codec::TokenCodec;
pub use gate::{bearer_token, AuthGate};
pub use ledger::{RevocationLedger, MIN_REVOCATION_TTL};
pub use manager::{AuthConfig, AuthManager};
pub use password::{hash_password, reject_password, verify_password};
pub use registry::SessionRegistry;
