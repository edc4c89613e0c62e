use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    /// Username or email address
    #[validate(length(min = 1, message = "Identifier is required"))]
    #[schema(example = "alice@example.com")]
    pub identifier: String,

    #[validate(length(min = 1, message = "Password is required"))]
    #[schema(example = "password123")]
    pub password: String,

    /// Extends token lifetimes when true
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    #[schema(example = "refresh-token-123")]
    pub refresh_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderListResponse {
    #[schema(example = json!(["github", "google"]))]
    pub providers: Vec<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Error code the provider sends when the user denies consent
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = "Invalid username or password")]
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_minutes: Option<u64>,
}
