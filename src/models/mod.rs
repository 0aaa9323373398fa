//! Domain models for session-gate
//!
//! This module contains the core domain models used throughout the application.

pub mod token;
pub mod user;

// Re-export commonly used types
pub use token::{Claims, Identity, TokenKind, TokenPair, ADMIN_ROLE, DEFAULT_ROLE};
pub use user::{
    AccountStatus, LoginRequest, NewUser, RefreshRequest, RegisterRequest, UpdateStatusRequest,
    User,
};
