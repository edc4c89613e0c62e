use platform_core::error::AppError;
use thiserror::Error;

use crate::stores::StoreError;

/// Error taxonomy for the authentication core. Variants are what the HTTP
/// adapter translates into status codes; the core itself never touches
/// transport concerns.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked for {wait_minutes} more minutes")]
    AccountLocked { wait_minutes: u64 },

    #[error("Account is deactivated")]
    AccountInactive,

    #[error("Provider {0} is not supported")]
    ProviderNotConfigured(String),

    #[error("Provider {0} is currently disabled")]
    ProviderInactive(String),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Userinfo fetch failed: {0}")]
    UserInfoFetchFailed(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Email already belongs to another account")]
    EmailConflict,

    #[error("Username already taken")]
    UsernameConflict,

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailConflict => AuthError::EmailConflict,
            StoreError::UsernameConflict => AuthError::UsernameConflict,
            StoreError::LinkConflict => {
                AuthError::Internal(anyhow::anyhow!("identity already linked"))
            }
            StoreError::Internal(e) => AuthError::Internal(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            // Never distinguish unknown-user from wrong-password here.
            AuthError::InvalidCredentials => {
                AppError::AuthError(anyhow::anyhow!("Invalid username or password"))
            }
            AuthError::AccountLocked { wait_minutes } => AppError::AccountLocked { wait_minutes },
            AuthError::AccountInactive => {
                AppError::Forbidden(anyhow::anyhow!("Account has been deactivated"))
            }
            AuthError::ProviderNotConfigured(name) => {
                AppError::BadRequest(anyhow::anyhow!("Provider {} is not supported", name))
            }
            AuthError::ProviderInactive(name) => {
                AppError::BadRequest(anyhow::anyhow!("Provider {} is currently disabled", name))
            }
            AuthError::TokenExchangeFailed(detail) => {
                tracing::error!(detail = %detail, "OAuth token exchange failed");
                AppError::BadGateway("OAuth sign-in failed".to_string())
            }
            AuthError::UserInfoFetchFailed(detail) => {
                tracing::error!(detail = %detail, "OAuth userinfo fetch failed");
                AppError::BadGateway("OAuth sign-in failed".to_string())
            }
            AuthError::TokenExpired => AppError::Unauthorized(anyhow::anyhow!("Token expired")),
            AuthError::TokenInvalid => AppError::Unauthorized(anyhow::anyhow!("Invalid token")),
            // Conflicts during OAuth auto-creation should have been prevented
            // by the lookup-before-create ordering; treat as server faults.
            AuthError::EmailConflict => {
                tracing::error!("Email conflict during OAuth account creation");
                AppError::InternalError(anyhow::anyhow!("Account creation conflict"))
            }
            AuthError::UsernameConflict => {
                tracing::error!("Username conflict during OAuth account creation");
                AppError::InternalError(anyhow::anyhow!("Account creation conflict"))
            }
            AuthError::Internal(e) => AppError::InternalError(e),
        }
    }
}
