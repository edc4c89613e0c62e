pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod stores;
pub mod utils;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    Modify, OpenApi,
    openapi::security::SecurityScheme,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AuthConfig;
use crate::services::{
    CredentialAuthenticator, IdentityLinker, OAuth2Exchanger, ProviderRegistry, TokenIssuer,
};
use crate::stores::UserStore;
use platform_core::error::AppError;
use platform_core::middleware::rate_limit::{IpRateLimiter, ip_rate_limit_middleware};
use platform_core::middleware::security_headers::security_headers_middleware;
use platform_core::middleware::tracing::request_id_middleware;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::me,
        handlers::oauth::providers,
        handlers::oauth::authorize,
        handlers::oauth::callback,
    ),
    components(
        schemas(
            dtos::auth::LoginRequest,
            dtos::auth::RefreshRequest,
            dtos::auth::ProviderListResponse,
            dtos::ErrorResponse,
            services::TokenPair,
            models::UserResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Password authentication and token management"),
        (name = "OAuth", description = "Multi-provider OAuth2 sign-in"),
        (name = "User", description = "Authenticated user profile"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AuthConfig,
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenIssuer,
    pub authenticator: CredentialAuthenticator,
    pub linker: IdentityLinker,
    pub registry: Arc<ProviderRegistry>,
    pub exchanger: OAuth2Exchanger,
    pub login_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Login gets its own, tighter per-IP limiter on top of the lockout logic
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    let ip_limiter = state.ip_rate_limiter.clone();

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    // Swagger UI is a dev convenience; production only serves the OpenAPI JSON.
    if state.config.environment == config::Environment::Dev {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        );
    }

    let app = app
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/oauth/providers", get(handlers::oauth::providers))
        .route(
            "/auth/oauth/:provider/authorize",
            get(handlers::oauth::authorize),
        )
        .route(
            "/auth/oauth/:provider/callback",
            get(handlers::oauth::callback),
        )
        .merge(login_route)
        .merge(
            Router::new()
                .route("/users/me", get(handlers::auth::me))
                .layer(from_fn_with_state(
                    state.clone(),
                    middleware::auth_middleware,
                )),
        )
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        // Request metrics
        .layer(from_fn(middleware::metrics_middleware))
        // Tracing span per request
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        // Request-id propagation
        .layer(from_fn(request_id_middleware))
        // Security headers
        .layer(from_fn(security_headers_middleware))
        // CORS
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<axum::http::HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                axum::http::HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "oauth_providers": state.registry.names(),
    }))
}
