//! Authentication audit events.
//!
//! Sinks are best-effort: a failing sink is logged and swallowed, never
//! surfaced to the login or OAuth flow that produced the event.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Why an authentication attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailureKind {
    AccountLocked,
    UserNotFound,
    AccountInactive,
    InvalidPassword,
    OauthExchangeFailed,
}

impl AuthFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailureKind::AccountLocked => "account_locked",
            AuthFailureKind::UserNotFound => "user_not_found",
            AuthFailureKind::AccountInactive => "account_inactive",
            AuthFailureKind::InvalidPassword => "invalid_password",
            AuthFailureKind::OauthExchangeFailed => "oauth_exchange_failed",
        }
    }
}

/// Successful authentication event.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSuccess {
    pub user_id: Uuid,
    pub ip: String,
    pub user_agent: Option<String>,
    /// OAuth provider name, or `None` for password logins.
    pub provider: Option<String>,
    /// What happened: "login", "oauth_login", "oauth_link", "oauth_register".
    pub action: &'static str,
    pub at: DateTime<Utc>,
}

/// Failed authentication event. Carries the submitted identifier (never the
/// password) and, where resolution got that far, the user id.
#[derive(Debug, Clone, Serialize)]
pub struct AuthFailure {
    pub identifier: String,
    pub kind: AuthFailureKind,
    pub user_id: Option<Uuid>,
    pub ip: String,
    pub user_agent: Option<String>,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_auth_success(&self, event: AuthSuccess) -> Result<(), anyhow::Error>;
    async fn record_auth_failure(&self, event: AuthFailure) -> Result<(), anyhow::Error>;
}

/// Fire-and-forget dispatcher over an [`AuditSink`].
///
/// Events are written on a spawned task so a slow sink never sits on the
/// login path; sink errors are logged locally and dropped.
#[derive(Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl AuditLogger {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub fn success(&self, event: AuthSuccess) {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.record_auth_success(event).await {
                tracing::error!(error = %e, "Failed to write auth success audit event");
            }
        });
    }

    pub fn failure(&self, event: AuthFailure) {
        let sink = self.sink.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.record_auth_failure(event).await {
                tracing::error!(error = %e, "Failed to write auth failure audit event");
            }
        });
    }
}

/// Default sink: structured log lines only.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record_auth_success(&self, event: AuthSuccess) -> Result<(), anyhow::Error> {
        tracing::info!(
            user_id = %event.user_id,
            ip = %event.ip,
            provider = event.provider.as_deref().unwrap_or("password"),
            action = event.action,
            "Authentication succeeded"
        );
        Ok(())
    }

    async fn record_auth_failure(&self, event: AuthFailure) -> Result<(), anyhow::Error> {
        tracing::warn!(
            identifier = %event.identifier,
            reason = event.kind.as_str(),
            ip = %event.ip,
            "Authentication failed"
        );
        Ok(())
    }
}

/// Sink that captures events in memory, for tests.
#[derive(Default)]
pub struct RecordingAuditSink {
    pub successes: std::sync::Mutex<Vec<AuthSuccess>>,
    pub failures: std::sync::Mutex<Vec<AuthFailure>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_kinds(&self) -> Vec<AuthFailureKind> {
        self.failures
            .lock()
            .map(|events| events.iter().map(|e| e.kind).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record_auth_success(&self, event: AuthSuccess) -> Result<(), anyhow::Error> {
        self.successes
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .push(event);
        Ok(())
    }

    async fn record_auth_failure(&self, event: AuthFailure) -> Result<(), anyhow::Error> {
        self.failures
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .push(event);
        Ok(())
    }
}
