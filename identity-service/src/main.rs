use identity_service::{
    AppState, build_router,
    config::AuthConfig,
    services::{
        AuditLogger, CredentialAuthenticator, IdentityLinker, MemoryLockoutStore, OAuth2Exchanger,
        ProviderRegistry, TokenIssuer, TracingAuditSink,
    },
    stores::{MemoryIdentityLinkStore, MemoryUserStore},
    utils::{Argon2Hasher, SystemClock},
};
use platform_core::middleware::rate_limit::create_ip_rate_limiter;
use platform_core::observability::logging::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), platform_core::error::AppError> {
    // Load configuration - fail fast if invalid
    let config = AuthConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    // Initialize metrics
    identity_service::services::metrics::init_metrics();

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting identity service"
    );

    let clock = Arc::new(SystemClock);
    let hasher = Arc::new(Argon2Hasher);
    let audit = AuditLogger::new(Arc::new(TracingAuditSink));

    // In-memory stores: single-process only, nothing survives a restart.
    // Swap in durable UserStore/IdentityLinkStore implementations for
    // multi-instance deployments.
    let users = Arc::new(MemoryUserStore::new());
    let links = Arc::new(MemoryIdentityLinkStore::new());
    tracing::warn!("Using in-memory user and identity-link stores");

    let lockout = Arc::new(MemoryLockoutStore::new(
        config.lockout.max_attempts,
        config.lockout.duration_minutes,
        clock.clone(),
    ));

    let tokens = TokenIssuer::new(&config.jwt, clock.clone());

    let registry = Arc::new(ProviderRegistry::from_env(&config.oauth.api_url));
    let exchanger = OAuth2Exchanger::new(registry.clone())?;

    let authenticator = CredentialAuthenticator::new(
        users.clone(),
        lockout,
        hasher.clone(),
        clock.clone(),
        audit.clone(),
    );
    let linker = IdentityLinker::new(users.clone(), links, hasher, clock, audit);

    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );

    let state = AppState {
        config: config.clone(),
        users,
        tokens,
        authenticator,
        linker,
        registry,
        exchanger,
        login_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
