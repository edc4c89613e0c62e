//! Shared test harness: an app wired to in-memory stores, a recording audit
//! sink and a manually advanced clock.
#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

use identity_service::{
    AppState, build_router,
    config::{
        AuthConfig, Environment, JwtConfig, LockoutConfig, OAuthSettings, RateLimitConfig,
        SecurityConfig,
    },
    models::{OAuth2Provider, User},
    services::{
        AuditLogger, CredentialAuthenticator, IdentityLinker, MemoryLockoutStore, OAuth2Exchanger,
        ProviderRegistry, RecordingAuditSink, TokenIssuer,
    },
    stores::{MemoryIdentityLinkStore, MemoryUserStore},
    utils::{Argon2Hasher, Clock, Password, PasswordHasher},
};
use platform_core::middleware::rate_limit::create_ip_rate_limiter;

pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()),
        }
    }

    pub fn advance_minutes(&self, minutes: i64) {
        let mut now = self.now.lock().unwrap();
        *now += Duration::minutes(minutes);
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub struct TestHarness {
    pub app: Router,
    pub users: Arc<MemoryUserStore>,
    pub links: Arc<MemoryIdentityLinkStore>,
    pub clock: Arc<TestClock>,
    pub audit: Arc<RecordingAuditSink>,
    pub hasher: Arc<Argon2Hasher>,
}

pub fn test_config() -> AuthConfig {
    AuthConfig {
        common: platform_core::config::Config { port: 0 },
        environment: Environment::Prod,
        service_name: "identity-service-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "error".to_string(),
        jwt: JwtConfig {
            secret: "integration-test-secret-32-bytes-long!!".to_string(),
            access_token_ttl_minutes: 30,
            refresh_token_ttl_minutes: 10080,
            extended_access_ttl_minutes: 1440,
            extended_refresh_ttl_minutes: 43200,
        },
        lockout: LockoutConfig {
            max_attempts: 5,
            duration_minutes: 15,
        },
        oauth: OAuthSettings {
            api_url: "http://localhost:8080".to_string(),
            state_ttl_seconds: 600,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        rate_limit: RateLimitConfig {
            login_attempts: 10_000,
            login_window_seconds: 60,
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
        },
    }
}

pub fn test_provider() -> OAuth2Provider {
    OAuth2Provider {
        name: "testprov".to_string(),
        client_id: "test-client-id".to_string(),
        client_secret: "test-client-secret".to_string(),
        authorize_url: "https://testprov.example/authorize".to_string(),
        token_url: "https://testprov.example/token".to_string(),
        userinfo_url: "https://testprov.example/userinfo".to_string(),
        emails_url: None,
        redirect_uri: "http://localhost:8080/auth/oauth/testprov/callback".to_string(),
        scope: "openid email profile".to_string(),
        id_field: "sub".to_string(),
        email_field: "email".to_string(),
        name_field: "name".to_string(),
        active: true,
    }
}

pub async fn spawn_app() -> TestHarness {
    let config = test_config();
    let clock = Arc::new(TestClock::new());
    let hasher = Arc::new(Argon2Hasher);
    let audit = Arc::new(RecordingAuditSink::new());
    let audit_logger = AuditLogger::new(audit.clone());

    let users = Arc::new(MemoryUserStore::new());
    let links = Arc::new(MemoryIdentityLinkStore::new());
    let lockout = Arc::new(MemoryLockoutStore::new(
        config.lockout.max_attempts,
        config.lockout.duration_minutes,
        clock.clone(),
    ));

    let tokens = TokenIssuer::new(&config.jwt, clock.clone());

    let mut registry = ProviderRegistry::empty();
    registry.insert(test_provider());
    let registry = Arc::new(registry);
    let exchanger = OAuth2Exchanger::new(registry.clone()).expect("http client");

    let authenticator = CredentialAuthenticator::new(
        users.clone(),
        lockout,
        hasher.clone(),
        clock.clone(),
        audit_logger.clone(),
    );
    let linker = IdentityLinker::new(
        users.clone(),
        links.clone(),
        hasher.clone(),
        clock.clone(),
        audit_logger,
    );

    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );

    let state = AppState {
        config,
        users: users.clone(),
        tokens,
        authenticator,
        linker,
        registry,
        exchanger,
        login_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state).await.expect("Failed to build router");

    TestHarness {
        app,
        users,
        links,
        clock,
        audit,
        hasher,
    }
}

impl TestHarness {
    /// Seed a user with a real argon2 hash for `password`.
    pub fn seed_user(&self, username: &str, email: &str, password: &str, is_active: bool) -> User {
        let hash = self
            .hasher
            .hash(&Password::new(password.to_string()))
            .expect("hash");
        let user = User {
            id: uuid::Uuid::new_v4(),
            username: username.to_string(),
            email: Some(email.to_lowercase()),
            password_hash: hash.into_string(),
            full_name: None,
            avatar_url: None,
            is_active,
            is_oauth_user: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            registration_ip: None,
        };
        self.users.insert_raw(user.clone());
        user
    }

    pub async fn request(&self, req: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(req).await.expect("request failed")
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    json_request_from_ip(method, uri, body, "127.0.0.1")
}

pub fn json_request_from_ip(
    method: &str,
    uri: &str,
    body: serde_json::Value,
    ip: &str,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .header("x-forwarded-for", ip)
        .extension(axum::extract::ConnectInfo(SocketAddr::from((
            [127, 0, 0, 1],
            8080,
        ))))
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .extension(axum::extract::ConnectInfo(SocketAddr::from((
            [127, 0, 0, 1],
            8080,
        ))))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("body is not JSON")
}
