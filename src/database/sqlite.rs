//! SQLite implementation of the Database trait
//!
//! This module provides a SQLite-based implementation of the Database trait
//! using rusqlite and tokio-rusqlite for async operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{ErrorCode, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use super::migrations::CREATE_SCHEMA;
use super::Database;
use crate::error::DbError;
use crate::models::{AccountStatus, NewUser, User};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, account_status, last_login, created_at";

/// SQLite database implementation
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Create a new SQLite database connection
    ///
    /// Use `:memory:` for in-memory database or a file path for persistent storage.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let conn = Connection::open(path).await?;

        conn.call(|conn| {
            conn.execute_batch(CREATE_SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Create a new in-memory database (useful for testing)
    pub async fn in_memory() -> Result<Self, DbError> {
        Self::new(":memory:").await
    }

    async fn query_user(
        &self,
        column: &'static str,
        value: rusqlite::types::Value,
    ) -> Result<Option<User>, DbError> {
        self.conn
            .call(move |conn| {
                let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
                let user = conn.query_row(&sql, [value], row_to_user).optional()?;
                Ok(user)
            })
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn create_user(&self, user: &NewUser) -> Result<User, DbError> {
        let username = user.username.clone();
        let email = user.email.clone();
        let password_hash = user.password_hash.clone();
        let role = user.role.clone();
        let created_at = Utc::now().to_rfc3339();

        let result = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO users (username, email, password_hash, role, account_status, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                    "#,
                    rusqlite::params![
                        username,
                        email,
                        password_hash,
                        role,
                        AccountStatus::Active.as_str(),
                        created_at
                    ],
                )?;

                let id = conn.last_insert_rowid();
                let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
                let user = conn.query_row(&sql, [id], row_to_user)?;
                Ok(user)
            })
            .await;

        result.map_err(|e| match e {
            tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(err, msg))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                DbError::ConstraintViolation(msg.unwrap_or_else(|| err.to_string()))
            }
            other => other.into(),
        })
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, DbError> {
        self.query_user("username", username.to_string().into()).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        self.query_user("id", id.into()).await
    }

    async fn username_or_email_exists(
        &self,
        username: &str,
        email: &str,
    ) -> Result<bool, DbError> {
        let username = username.to_string();
        let email = email.to_string();

        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2",
                    rusqlite::params![username, email],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Into::into)
    }

    async fn update_last_login(&self, id: i64) -> Result<(), DbError> {
        let now = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE users SET last_login = ?1 WHERE id = ?2",
                    rusqlite::params![now, id],
                )?;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn set_account_status(&self, id: i64, status: AccountStatus) -> Result<(), DbError> {
        let rows_affected = self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    "UPDATE users SET account_status = ?1 WHERE id = ?2",
                    rusqlite::params![status.as_str(), id],
                )?;
                Ok(count)
            })
            .await?;

        if rows_affected == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: row.get(4)?,
        // An unreadable status must not grant access
        account_status: row
            .get::<_, String>(5)?
            .parse()
            .unwrap_or(AccountStatus::Inactive),
        last_login: parse_datetime(row.get::<_, Option<String>>(6)?),
        created_at: parse_datetime(row.get::<_, Option<String>>(7)?).unwrap_or_else(Utc::now),
    })
}

/// Parse a datetime string to DateTime<Utc>
fn parse_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                // SQLite CURRENT_TIMESTAMP format
                chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|dt| dt.and_utc())
            })
    })
}
