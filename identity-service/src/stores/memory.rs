//! In-memory store implementations for tests and single-process deployments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{IdentityLinkStore, StoreError, UserStore};
use crate::models::{IdentityLink, NewUser, User};

#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pre-built user, bypassing conflict checks. Test helper.
    pub fn insert_raw(&self, user: User) {
        self.users.insert(user.id, user);
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let needle = email.to_lowercase();
        Ok(self.users.iter().find_map(|entry| {
            entry
                .value()
                .email
                .as_deref()
                .filter(|e| e.to_lowercase() == needle)
                .map(|_| entry.value().clone())
        }))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().username == username)
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, fields: NewUser) -> Result<User, StoreError> {
        if let Some(email) = fields.email.as_deref() {
            if self.find_by_email(email).await?.is_some() {
                return Err(StoreError::EmailConflict);
            }
        }
        if self.find_by_username(&fields.username).await?.is_some() {
            return Err(StoreError::UsernameConflict);
        }

        let user = User {
            id: Uuid::new_v4(),
            username: fields.username,
            email: fields.email.map(|e| e.to_lowercase()),
            password_hash: fields.password_hash,
            full_name: fields.full_name,
            avatar_url: fields.avatar_url,
            is_active: fields.is_active,
            is_oauth_user: fields.is_oauth_user,
            created_at: Utc::now(),
            registration_ip: fields.registration_ip,
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[derive(Default)]
pub struct MemoryIdentityLinkStore {
    links: DashMap<Uuid, IdentityLink>,
}

impl MemoryIdentityLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[async_trait]
impl IdentityLinkStore for MemoryIdentityLinkStore {
    async fn find_by_provider_identity(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<IdentityLink>, StoreError> {
        Ok(self
            .links
            .iter()
            .find(|entry| {
                let link = entry.value();
                link.provider == provider && link.provider_user_id == provider_user_id
            })
            .map(|entry| entry.value().clone()))
    }

    async fn create(&self, link: IdentityLink) -> Result<IdentityLink, StoreError> {
        if self
            .find_by_provider_identity(&link.provider, &link.provider_user_id)
            .await?
            .is_some()
        {
            return Err(StoreError::LinkConflict);
        }
        self.links.insert(link.id, link.clone());
        Ok(link)
    }

    async fn touch_login(
        &self,
        link_id: Uuid,
        ip: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        match self.links.get_mut(&link_id) {
            Some(mut entry) => {
                entry.last_login_at = at;
                entry.last_login_ip = Some(ip.to_string());
                Ok(())
            }
            None => Err(StoreError::Internal(anyhow::anyhow!(
                "identity link {} not found",
                link_id
            ))),
        }
    }
}
