//! Identity link model - maps an external OAuth identity to one local user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::oauth::OAuthUserInfo;

/// Persisted link between a `(provider, provider_user_id)` pair and a local
/// user. The pair is unique across all links: one external identity can never
/// point at two local accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityLink {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub provider_user_id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
    pub last_login_ip: Option<String>,
}

impl IdentityLink {
    /// Create a link from a freshly fetched external identity.
    pub fn new(user_id: Uuid, info: &OAuthUserInfo, ip: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            provider: info.provider.clone(),
            provider_user_id: info.provider_user_id.clone(),
            email: info.email.clone(),
            name: info.name.clone(),
            picture: info.picture.clone(),
            created_at: now,
            last_login_at: now,
            last_login_ip: Some(ip.to_string()),
        }
    }
}
