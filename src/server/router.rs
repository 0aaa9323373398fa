//! HTTP router for session-gate
//!
//! This module defines the axum router that handles all HTTP requests.
//! It provides routes for:
//! - Health checks
//! - Registration, login, refresh and logout
//! - Account status administration

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    middleware,
    response::{AppendHeaders, IntoResponse, Json},
    routing::{get, post, put},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::AuthManager;
use crate::database::Database;
use crate::models::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair, UpdateStatusRequest};
use crate::store::KeyValueStore;

use super::middleware::{
    admin_middleware, auth_middleware, logging_middleware, AuthResponse, AuthenticatedUser,
};

const ACCESS_COOKIE: &str = "access_token";
const REFRESH_COOKIE: &str = "refresh_token";

/// Shared application state
pub struct AppState<D: Database> {
    /// Authentication manager
    pub auth_manager: Arc<AuthManager<D>>,

    /// Session store, pinged by the health check
    pub store: Arc<dyn KeyValueStore>,

    /// Mark session cookies `Secure`
    pub cookie_secure: bool,
}

impl<D: Database> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            auth_manager: Arc::clone(&self.auth_manager),
            store: Arc::clone(&self.store),
            cookie_secure: self.cookie_secure,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: String,
}

/// Build the main application router
///
/// # Arguments
///
/// * `state` - Application state containing the auth manager and session store
///
/// # Returns
///
/// An axum Router configured with all endpoints
pub fn build_router<D: Database + 'static>(state: AppState<D>) -> Router {
    let authenticated = Router::new()
        .route("/api/auth/logout", post(logout_handler::<D>))
        .route("/api/auth/me", get(me_handler))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.auth_manager),
            auth_middleware::<D>,
        ));

    let admin = Router::new()
        .route(
            "/api/admin/users/:id/status",
            put(update_status_handler::<D>),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state.auth_manager),
            admin_middleware::<D>,
        ));

    Router::new()
        // Public endpoints
        .route("/health", get(health_handler::<D>))
        .route("/api/auth/register", post(register_handler::<D>))
        .route("/api/auth/login", post(login_handler::<D>))
        .route("/api/auth/refresh", post(refresh_handler::<D>))
        .merge(authenticated)
        .merge(admin)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// `Set-Cookie` value mirroring a session token
fn session_cookie(name: &str, value: &str, max_age: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name,
        value,
        max_age.as_secs()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Cookie pair for a freshly issued session
fn session_cookies<D: Database>(
    state: &AppState<D>,
    pair: &TokenPair,
) -> AppendHeaders<[(header::HeaderName, String); 2]> {
    let config = state.auth_manager.config();
    AppendHeaders([
        (
            header::SET_COOKIE,
            session_cookie(
                ACCESS_COOKIE,
                &pair.access_token,
                config.access_ttl,
                state.cookie_secure,
            ),
        ),
        (
            header::SET_COOKIE,
            session_cookie(
                REFRESH_COOKIE,
                &pair.refresh_token,
                config.refresh_ttl,
                state.cookie_secure,
            ),
        ),
    ])
}

// =============================================================================
// Health Handler
// =============================================================================

async fn health_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
) -> impl IntoResponse {
    let (code, status, store) = match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "healthy", "ok"),
        Err(e) => {
            tracing::warn!(backend = %state.store.name(), error = %e, "Session store ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            store: store.to_string(),
        }),
    )
}

// =============================================================================
// Session Handlers
// =============================================================================

async fn register_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthResponse> {
    if body.username.is_empty() || body.email.is_empty() || body.password.is_empty() {
        return Err(AuthResponse {
            status: StatusCode::BAD_REQUEST,
            message: "username, email and password are required".to_string(),
        });
    }

    let user = state
        .auth_manager
        .register(&body.username, &body.email, &body.password)
        .await
        .map_err(AuthResponse::from_error)?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn login_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthResponse> {
    let pair = state
        .auth_manager
        .login(&body.username, &body.password)
        .await
        .map_err(AuthResponse::from_error)?;

    Ok((session_cookies(&state, &pair), Json(pair)))
}

async fn refresh_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Json(body): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AuthResponse> {
    let pair = state
        .auth_manager
        .refresh(&body.refresh_token)
        .await
        .map_err(AuthResponse::from_error)?;

    Ok((session_cookies(&state, &pair), Json(pair)))
}

async fn logout_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AuthResponse> {
    state
        .auth_manager
        .logout(&user.identity, &user.token)
        .await
        .map_err(AuthResponse::from_error)?;

    let cleared = AppendHeaders([
        (
            header::SET_COOKIE,
            session_cookie(ACCESS_COOKIE, "", Duration::ZERO, state.cookie_secure),
        ),
        (
            header::SET_COOKIE,
            session_cookie(REFRESH_COOKIE, "", Duration::ZERO, state.cookie_secure),
        ),
    ]);

    Ok((
        StatusCode::OK,
        cleared,
        Json(serde_json::json!({ "message": "Logged out" })),
    ))
}

async fn me_handler(Extension(user): Extension<AuthenticatedUser>) -> impl IntoResponse {
    Json(user.identity)
}

// =============================================================================
// Admin Handlers
// =============================================================================

async fn update_status_handler<D: Database + 'static>(
    State(state): State<AppState<D>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AuthResponse> {
    state
        .auth_manager
        .set_account_status(id, body.account_status)
        .await
        .map_err(AuthResponse::from_error)?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "id": id,
            "account_status": body.account_status,
        })),
    ))
}
