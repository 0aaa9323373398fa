//! HTTP middleware for session-gate
//!
//! This module provides middleware layers for:
//! - Bearer authentication (any active session, or admin only)
//! - Request/response logging

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::{bearer_token, AuthManager};
use crate::database::Database;
use crate::error::AuthError;
use crate::models::Identity;

/// Authenticated user extension for requests
///
/// Carries the presented access token too, since logout revokes it.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub identity: Identity,
    pub token: String,
}

/// Authentication middleware function
///
/// Rejects the request unless the `Authorization` header carries a current
/// access token, then adds the authenticated user to the request extensions.
pub async fn auth_middleware<D: Database + 'static>(
    State(auth_manager): State<Arc<AuthManager<D>>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthResponse> {
    let authorization = authorization_header(&request).map(str::to_owned);
    let identity = auth_manager
        .authenticate(authorization.as_deref())
        .await
        .map_err(AuthResponse::from_error)?;

    Ok(next.run(attach(request, identity, authorization.as_deref())?).await)
}

/// Admin middleware function
///
/// Same as [`auth_middleware`] but also requires the admin role.
pub async fn admin_middleware<D: Database + 'static>(
    State(auth_manager): State<Arc<AuthManager<D>>>,
    request: Request,
    next: Next,
) -> Result<Response, AuthResponse> {
    let authorization = authorization_header(&request).map(str::to_owned);
    let identity = auth_manager
        .authenticate_admin(authorization.as_deref())
        .await
        .map_err(AuthResponse::from_error)?;

    Ok(next.run(attach(request, identity, authorization.as_deref())?).await)
}

fn authorization_header(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

fn attach(
    mut request: Request,
    identity: Identity,
    authorization: Option<&str>,
) -> Result<Request, AuthResponse> {
    let token = bearer_token(authorization)
        .map_err(AuthResponse::from_error)?
        .to_string();
    request
        .extensions_mut()
        .insert(AuthenticatedUser { identity, token });
    Ok(request)
}

/// Authentication error response
#[derive(Debug)]
pub struct AuthResponse {
    pub status: StatusCode,
    pub message: String,
}

impl AuthResponse {
    /// Map an authentication error onto an HTTP status and message
    pub fn from_error(error: AuthError) -> Self {
        let status = match &error {
            AuthError::MissingCredential
            | AuthError::MalformedCredential(_)
            | AuthError::SignatureInvalid
            | AuthError::Expired
            | AuthError::NotYetValid
            | AuthError::WrongTokenKind { .. }
            | AuthError::RevokedCredential
            | AuthError::StaleCredential
            | AuthError::VerificationError(_)
            | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthError::IdentityDisabled | AuthError::PermissionDenied => StatusCode::FORBIDDEN,
            AuthError::UnknownUser(_) => StatusCode::NOT_FOUND,
            AuthError::Conflict(_) => StatusCode::CONFLICT,
            AuthError::SessionStore(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Server-side details stay in the logs
        let message = match &error {
            AuthError::SessionStore(_) | AuthError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        Self { status, message }
    }
}

impl IntoResponse for AuthResponse {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });
        (self.status, Json(body)).into_response()
    }
}

/// Logging middleware function
///
/// Logs request and response details including:
/// - Method and path
/// - Status code
/// - Response time
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status();

    tracing::info!(
        method = %method,
        path = %uri.path(),
        status = %status.as_u16(),
        duration_ms = %elapsed.as_millis(),
        "Request completed"
    );

    response
}
