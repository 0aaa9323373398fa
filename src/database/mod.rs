//! Identity store for session-gate
//!
//! This module defines the database trait over the user directory and its
//! SQLite implementation.

pub mod migrations;
pub mod sqlite;

pub use sqlite::SqliteDatabase;

use async_trait::async_trait;

use crate::error::DbError;
use crate::models::{AccountStatus, NewUser, User};

/// Database trait for user persistence
///
/// It uses `async_trait` for async methods and `mockall::automock` for testing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Database: Send + Sync {
    /// Create a user and return the stored record
    ///
    /// Fails with `DbError::ConstraintViolation` if the username or email is taken.
    async fn create_user(&self, user: &NewUser) -> Result<User, DbError>;

    /// Get a user by username
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DbError>;

    /// Get a user by ID
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError>;

    /// Check whether a username or email is already registered
    async fn username_or_email_exists(&self, username: &str, email: &str)
        -> Result<bool, DbError>;

    /// Set the user's last login timestamp to now
    async fn update_last_login(&self, id: i64) -> Result<(), DbError>;

    /// Change a user's account status
    ///
    /// Fails with `DbError::NotFound` if the user does not exist.
    async fn set_account_status(&self, id: i64, status: AccountStatus) -> Result<(), DbError>;
}
