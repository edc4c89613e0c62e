//! Store interfaces consumed by the authentication core.
//!
//! Durable persistence lives behind these traits so the core never couples to
//! a concrete database. Uniqueness of `email`, `username` and
//! `(provider, provider_user_id)` is the store's responsibility; the core
//! orders its lookups so conflicts are not expected, and surfaces them as
//! errors when they happen anyway.

mod memory;

pub use memory::{MemoryIdentityLinkStore, MemoryUserStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{IdentityLink, NewUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    EmailConflict,

    #[error("username already taken")]
    UsernameConflict,

    #[error("identity already linked")]
    LinkConflict,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Email lookup is case-insensitive; callers pass the address lowercased.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Username lookup is case-sensitive.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn create(&self, fields: NewUser) -> Result<User, StoreError>;
}

#[async_trait]
pub trait IdentityLinkStore: Send + Sync {
    async fn find_by_provider_identity(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<IdentityLink>, StoreError>;

    async fn create(&self, link: IdentityLink) -> Result<IdentityLink, StoreError>;

    /// Update the last-login fields of an existing link.
    async fn touch_login(
        &self,
        link_id: Uuid,
        ip: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}
