use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::AppState;
use platform_core::error::AppError;

/// Verified claims of the bearer token, inserted into request extensions for
/// downstream handlers. Mapping the `admin` scope to an administrator
/// identity is the consuming layer's decision; this middleware only exposes
/// what the token says.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub scopes: Vec<String>,
}

impl AuthContext {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

/// Middleware to require a valid bearer token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state.tokens.decode(token).map_err(AppError::from)?;

    // Refresh tokens only buy new tokens, never direct access.
    if claims.is_refresh() {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Refresh token cannot be used as an access token"
        )));
    }

    let user_id = claims.subject_id().map_err(AppError::from)?;

    req.extensions_mut().insert(AuthContext {
        user_id,
        scopes: claims.scopes,
    });

    Ok(next.run(req).await)
}
