//! Common test utilities and helpers for integration tests

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use session_gate::auth::{AuthConfig, AuthManager, TokenCodec};
use session_gate::config::ServerConfig;
use session_gate::database::SqliteDatabase;
use session_gate::models::{TokenPair, ADMIN_ROLE, DEFAULT_ROLE};
use session_gate::server::{AppState, Server};
use session_gate::store::{KeyValueStore, MemoryStore};

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const TEST_ISSUER: &str = "session-gate-test";
pub const TEST_PASSWORD: &str = "correct horse battery staple";

/// Create an in-memory database for testing
pub async fn create_test_database() -> Arc<SqliteDatabase> {
    Arc::new(
        SqliteDatabase::in_memory()
            .await
            .expect("Failed to create test database"),
    )
}

/// Create the codec used by every test server
pub fn create_test_codec() -> TokenCodec {
    TokenCodec::new(TEST_SECRET.as_bytes(), TEST_ISSUER)
}

/// Create a test authentication manager over `store`
pub fn create_test_auth_manager(
    db: Arc<SqliteDatabase>,
    store: Arc<dyn KeyValueStore>,
) -> Arc<AuthManager<SqliteDatabase>> {
    Arc::new(AuthManager::new(
        db,
        store,
        create_test_codec(),
        AuthConfig::default(),
    ))
}

/// Create a test application state with one regular user and one admin
///
/// Returns the state together with the memory store backing it so tests can
/// inspect the raw session records.
pub async fn create_test_state() -> (AppState<SqliteDatabase>, Arc<MemoryStore>) {
    let memory = Arc::new(MemoryStore::new());
    let store: Arc<dyn KeyValueStore> = memory.clone();
    let auth_manager = create_test_auth_manager(create_test_database().await, Arc::clone(&store));

    auth_manager
        .register_with_role("alice", "alice@example.com", TEST_PASSWORD, DEFAULT_ROLE)
        .await
        .expect("Failed to create alice");
    auth_manager
        .register_with_role("root", "root@example.com", TEST_PASSWORD, ADMIN_ROLE)
        .await
        .expect("Failed to create root");

    let state = AppState {
        auth_manager,
        store,
        cookie_secure: false,
    };
    (state, memory)
}

/// Create a test server configuration with a random port
pub fn create_test_server_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0, // Let OS assign a free port
    }
}

/// Create a test server
pub async fn create_test_server() -> (Server<SqliteDatabase>, AppState<SqliteDatabase>) {
    let (state, _) = create_test_state().await;
    let server = Server::new(create_test_server_config(), state.clone());
    (server, state)
}

/// Run a test server in the background and return the address
/// The server will be shut down when the returned shutdown sender is dropped or sent
pub async fn run_test_server(
    state: AppState<SqliteDatabase>,
) -> (SocketAddr, tokio::sync::oneshot::Sender<()>) {
    let bound = Server::new(create_test_server_config(), state)
        .bind()
        .await
        .expect("Failed to bind test server");
    let addr = bound.local_addr();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        bound
            .serve(async move {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("Server error");
    });

    (addr, shutdown_tx)
}

/// Log in over HTTP and return the issued pair
pub async fn login(client: &reqwest::Client, addr: SocketAddr, username: &str) -> TokenPair {
    let response = client
        .post(format!("http://{}/api/auth/login", addr))
        .json(&serde_json::json!({"username": username, "password": TEST_PASSWORD}))
        .send()
        .await
        .expect("Login request failed");
    assert_eq!(response.status(), 200, "login as {} failed", username);
    response.json().await.expect("Invalid login response")
}

/// GET /api/auth/me with `token`, returning the status and JSON body
pub async fn me(
    client: &reqwest::Client,
    addr: SocketAddr,
    token: &str,
) -> (reqwest::StatusCode, serde_json::Value) {
    let response = client
        .get(format!("http://{}/api/auth/me", addr))
        .bearer_auth(token)
        .send()
        .await
        .expect("Me request failed");
    let status = response.status();
    let body = response.json().await.unwrap_or(serde_json::Value::Null);
    (status, body)
}
