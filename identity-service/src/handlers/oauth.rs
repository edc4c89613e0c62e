//! Multi-provider OAuth2 handlers.
//!
//! The authorize redirect plants a CSRF state cookie carrying a hash of the
//! nonce embedded in the provider URL; the callback checks the round-tripped
//! state against that hash in constant time before touching the provider.

use axum::{
    Json,
    extract::{ConnectInfo, Path, Query, State},
    http::HeaderMap,
    response::Redirect,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sha2::{Digest, Sha256};
use std::net::SocketAddr;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::AppState;
use crate::dtos::auth::{OAuthCallbackQuery, ProviderListResponse};
use crate::handlers::auth::{client_ip, user_agent};
use crate::services::{TokenPair, metrics};
use platform_core::error::AppError;

const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// List the configured OAuth2 providers.
///
/// GET /auth/oauth/providers
#[utoipa::path(
    get,
    path = "/auth/oauth/providers",
    responses(
        (status = 200, description = "Active provider names", body = ProviderListResponse),
    ),
    tag = "OAuth"
)]
pub async fn providers(State(state): State<AppState>) -> Json<ProviderListResponse> {
    Json(ProviderListResponse {
        providers: state.registry.names(),
    })
}

/// Start the authorization-code flow for a provider.
///
/// GET /auth/oauth/{provider}/authorize
#[utoipa::path(
    get,
    path = "/auth/oauth/{provider}/authorize",
    params(("provider" = String, Path, description = "Provider name")),
    responses(
        (status = 303, description = "Redirect to the provider authorize URL"),
        (status = 400, description = "Provider unknown or disabled", body = crate::dtos::ErrorResponse),
    ),
    tag = "OAuth"
)]
pub async fn authorize(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let nonce = Uuid::new_v4().to_string();
    let url = state
        .registry
        .authorization_url(&provider, Some(&nonce))
        .map_err(AppError::from)?;

    let mut cookie = Cookie::new(OAUTH_STATE_COOKIE, hash_state(&nonce));
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(time::Duration::seconds(state.config.oauth.state_ttl_seconds));

    Ok((jar.add(cookie), Redirect::to(&url)))
}

/// Complete the authorization-code flow.
///
/// GET /auth/oauth/{provider}/callback
#[utoipa::path(
    get,
    path = "/auth/oauth/{provider}/callback",
    params(
        ("provider" = String, Path, description = "Provider name"),
        OAuthCallbackQuery,
    ),
    responses(
        (status = 200, description = "Authentication successful", body = TokenPair),
        (status = 400, description = "Bad callback (missing code, bad state, user denied)", body = crate::dtos::ErrorResponse),
        (status = 502, description = "Provider exchange failed", body = crate::dtos::ErrorResponse),
    ),
    tag = "OAuth"
)]
pub async fn callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<OAuthCallbackQuery>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<TokenPair>), AppError> {
    if let Some(error) = query.error {
        tracing::warn!(provider = %provider, error = %error, "OAuth provider returned an error");
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Provider returned error: {}",
            error
        )));
    }

    let code = query
        .code
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing authorization code")))?;
    let state_param = query
        .state
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing state parameter")))?;

    let expected = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing OAuth state cookie")))?;

    if !state_matches(&expected, &state_param) {
        tracing::warn!(provider = %provider, "OAuth state mismatch");
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Invalid state parameter"
        )));
    }

    // The state cookie is single-use.
    let mut removal = Cookie::from(OAUTH_STATE_COOKIE);
    removal.set_path("/");
    let jar = jar.remove(removal);

    let ip = client_ip(&headers, connect_info.as_ref());
    let agent = user_agent(&headers);

    let result = async {
        let tokens = state.exchanger.exchange_code(&provider, &code).await?;
        let info = state.exchanger.fetch_user_info(&provider, &tokens).await?;
        state.linker.resolve(&info, &ip, agent.as_deref()).await
    }
    .await;

    let user = match result {
        Ok(user) => {
            metrics::track_auth_attempt(&provider, "success");
            user
        }
        Err(e) => {
            metrics::track_auth_attempt(&provider, "failure");
            return Err(e.into());
        }
    };

    let pair = state
        .tokens
        .issue(user.id, &["user".to_string()], false)
        .map_err(AppError::from)?;

    Ok((jar, Json(pair)))
}

fn hash_state(nonce: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare the round-tripped state against the cookie hash without leaking
/// position information through timing.
fn state_matches(cookie_value: &str, state_param: &str) -> bool {
    let expected = hash_state(state_param);
    expected.as_bytes().ct_eq(cookie_value.as_bytes()).into()
}
