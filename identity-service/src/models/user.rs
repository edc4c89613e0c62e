//! User model - the local account this service authenticates against.
//!
//! Persistence of the full user profile belongs to the user store; this
//! service only reads the fields that matter for authentication and creates
//! accounts on the OAuth auto-provisioning path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// User entity as seen by the authentication core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub is_oauth_user: bool,
    pub created_at: DateTime<Utc>,
    pub registration_ip: Option<String>,
}

impl User {
    /// Convert to a sanitized response (no password hash).
    pub fn sanitized(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            avatar_url: self.avatar_url.clone(),
            is_active: self.is_active,
            is_oauth_user: self.is_oauth_user,
            created_at: self.created_at,
        }
    }
}

/// Fields for creating a new user through the user store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub is_oauth_user: bool,
    pub registration_ip: Option<String>,
}

/// User response for the API (without sensitive fields).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserResponse {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "alice@example.com")]
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub is_oauth_user: bool,
    pub created_at: DateTime<Utc>,
}
