//! Password authentication handlers.
//!
//! Thin adapters: extract transport details (client IP, user agent), call
//! the services, translate `AuthError` into HTTP responses. All policy lives
//! in the services layer.

use axum::{
    Json,
    extract::{ConnectInfo, State},
    http::HeaderMap,
};
use std::net::SocketAddr;
use validator::Validate;

use crate::AppState;
use crate::dtos::auth::{LoginRequest, RefreshRequest};
use crate::middleware::AuthContext;
use crate::models::UserResponse;
use crate::services::{AuthError, TokenPair, metrics};
use platform_core::error::AppError;

/// Authenticate with username-or-email and password.
///
/// POST /auth/login
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authentication successful", body = TokenPair),
        (status = 401, description = "Invalid credentials or account locked", body = crate::dtos::ErrorResponse),
        (status = 403, description = "Account deactivated", body = crate::dtos::ErrorResponse),
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    req.validate()?;

    let ip = client_ip(&headers, connect_info.as_ref());
    let agent = user_agent(&headers);

    let user = match state
        .authenticator
        .authenticate(&req.identifier, &req.password, &ip, agent.as_deref())
        .await
    {
        Ok(user) => {
            metrics::track_auth_attempt("password", "success");
            user
        }
        Err(e) => {
            metrics::track_auth_attempt("password", failure_label(&e));
            return Err(e.into());
        }
    };

    let scopes = vec!["user".to_string()];
    let pair = state
        .tokens
        .issue(user.id, &scopes, req.remember_me)
        .map_err(AppError::from)?;

    Ok(Json(pair))
}

/// Exchange a refresh token for a fresh token pair.
///
/// POST /auth/refresh
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token invalid or expired", body = crate::dtos::ErrorResponse),
        (status = 403, description = "Account deactivated", body = crate::dtos::ErrorResponse),
    ),
    tag = "Authentication"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    req.validate()?;

    let claims = state
        .tokens
        .decode(&req.refresh_token)
        .map_err(AppError::from)?;

    if !claims.is_refresh() {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Not a refresh token"
        )));
    }

    let user_id = claims.subject_id().map_err(AppError::from)?;

    // The subject must still exist and be active; the token alone is not
    // enough once the account is gone or deactivated.
    let user = state
        .users
        .find_by_id(user_id)
        .await
        .map_err(|e| AppError::from(AuthError::from(e)))?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Unknown subject")))?;

    if !user.is_active {
        return Err(AuthError::AccountInactive.into());
    }

    let pair = state
        .tokens
        .issue(user.id, &claims.scopes, false)
        .map_err(AppError::from)?;

    Ok(Json(pair))
}

/// Profile of the authenticated user.
///
/// GET /users/me
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = crate::dtos::ErrorResponse),
    ),
    security(("bearer_auth" = [])),
    tag = "User"
)]
pub async fn me(
    State(state): State<AppState>,
    axum::Extension(ctx): axum::Extension<AuthContext>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .users
        .find_by_id(ctx.user_id)
        .await
        .map_err(|e| AppError::from(AuthError::from(e)))?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("User no longer exists")))?;

    Ok(Json(user.sanitized()))
}

/// Best-effort client IP: first `x-forwarded-for` hop, else the socket peer.
pub fn client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

fn failure_label(err: &AuthError) -> &'static str {
    match err {
        AuthError::AccountLocked { .. } => "account_locked",
        AuthError::AccountInactive => "account_inactive",
        AuthError::InvalidCredentials => "invalid_credentials",
        _ => "error",
    }
}
