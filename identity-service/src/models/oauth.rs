//! OAuth2 provider configuration and the normalized external identity.

use serde::{Deserialize, Serialize};

/// Static configuration for one OAuth2 provider. Loaded once at startup and
/// immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2Provider {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
    /// Secondary endpoint for providers whose userinfo response omits email
    /// (GitHub-class). `None` for providers that return email inline.
    pub emails_url: Option<String>,
    pub redirect_uri: String,
    pub scope: String,
    /// Field names used to normalize the userinfo payload.
    pub id_field: String,
    pub email_field: String,
    pub name_field: String,
    pub active: bool,
}

/// Normalized identity returned by a provider's userinfo endpoint.
/// Produced fresh per OAuth callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthUserInfo {
    pub provider: String,
    pub provider_user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    #[serde(default)]
    pub raw: serde_json::Map<String, serde_json::Value>,
}
