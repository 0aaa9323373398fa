//! session-gate - Token authentication core for web applications
//!
//! This crate issues HS256 access/refresh token pairs, keeps one current
//! session per token kind and subject in a key-value store, revokes tokens
//! through a TTL-bound blacklist and gates every request on those records.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod server;
pub mod store;
pub mod telemetry;
