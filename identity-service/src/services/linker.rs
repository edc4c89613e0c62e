//! OAuth identity resolution.
//!
//! Maps a normalized external identity to exactly one local user, in strict
//! order: existing link, then email match, then account creation. The store's
//! uniqueness constraints are the authority on conflicts; this service orders
//! its lookups so conflicts are not expected, and surfaces them when the
//! store reports one anyway.

use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{IdentityLink, NewUser, OAuthUserInfo, User};
use crate::services::audit::{AuditLogger, AuthSuccess};
use crate::services::AuthError;
use crate::stores::{IdentityLinkStore, StoreError, UserStore};
use crate::utils::{Clock, Password, PasswordHasher};

/// Attempts at generating a non-colliding username before giving up and
/// surfacing the conflict.
const USERNAME_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct IdentityLinker {
    users: Arc<dyn UserStore>,
    links: Arc<dyn IdentityLinkStore>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    audit: AuditLogger,
}

impl IdentityLinker {
    pub fn new(
        users: Arc<dyn UserStore>,
        links: Arc<dyn IdentityLinkStore>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
        audit: AuditLogger,
    ) -> Self {
        Self {
            users,
            links,
            hasher,
            clock,
            audit,
        }
    }

    /// Resolve an external identity to a local user, creating or linking as
    /// needed. First match wins; the three paths are tried in order.
    pub async fn resolve(
        &self,
        info: &OAuthUserInfo,
        ip: &str,
        user_agent: Option<&str>,
    ) -> Result<User, AuthError> {
        // Path 1: the external identity is already linked.
        if let Some(link) = self
            .links
            .find_by_provider_identity(&info.provider, &info.provider_user_id)
            .await
            .map_err(AuthError::from)?
        {
            let user = self
                .users
                .find_by_id(link.user_id)
                .await
                .map_err(AuthError::from)?
                .ok_or_else(|| {
                    anyhow::anyhow!("identity link {} points at a missing user", link.id)
                })?;

            if !user.is_active {
                return Err(AuthError::AccountInactive);
            }

            self.links
                .touch_login(link.id, ip, self.clock.now())
                .await
                .map_err(AuthError::from)?;

            self.record_success(&user, info, "oauth_login", ip, user_agent);
            return Ok(user);
        }

        // Path 2: no link yet, but the email belongs to an existing account.
        if let Some(email) = info.email.as_deref() {
            if let Some(user) = self
                .users
                .find_by_email(&email.to_lowercase())
                .await
                .map_err(AuthError::from)?
            {
                self.links
                    .create(IdentityLink::new(user.id, info, ip, self.clock.now()))
                    .await
                    .map_err(AuthError::from)?;

                self.record_success(&user, info, "oauth_link", ip, user_agent);
                return Ok(user);
            }
        }

        // Path 3: brand new account.
        let user = self.create_oauth_user(info, ip).await?;

        self.links
            .create(IdentityLink::new(user.id, info, ip, self.clock.now()))
            .await
            .map_err(AuthError::from)?;

        self.record_success(&user, info, "oauth_register", ip, user_agent);
        Ok(user)
    }

    async fn create_oauth_user(&self, info: &OAuthUserInfo, ip: &str) -> Result<User, AuthError> {
        // OAuth accounts get an unusable random password so the password
        // login path can never match them by guessing.
        let random_password = Password::new(Uuid::new_v4().to_string());
        let password_hash = self.hasher.hash(&random_password)?;

        let mut last_conflict = None;
        for _ in 0..USERNAME_ATTEMPTS {
            let username = generate_username(info);
            let fields = NewUser {
                username,
                email: info.email.as_ref().map(|e| e.to_lowercase()),
                password_hash: password_hash.as_str().to_string(),
                full_name: info.name.clone(),
                avatar_url: info.picture.clone(),
                is_active: true,
                is_oauth_user: true,
                registration_ip: Some(ip.to_string()),
            };

            match self.users.create(fields).await {
                Ok(user) => return Ok(user),
                Err(StoreError::UsernameConflict) => {
                    // Suffix collision: try again with a fresh one.
                    last_conflict = Some(StoreError::UsernameConflict);
                }
                Err(other) => return Err(other.into()),
            }
        }

        tracing::error!(
            provider = %info.provider,
            "Username generation collided {} times in a row",
            USERNAME_ATTEMPTS
        );
        Err(last_conflict
            .map(AuthError::from)
            .unwrap_or_else(|| AuthError::Internal(anyhow::anyhow!("username generation failed"))))
    }

    fn record_success(
        &self,
        user: &User,
        info: &OAuthUserInfo,
        action: &'static str,
        ip: &str,
        user_agent: Option<&str>,
    ) {
        self.audit.success(AuthSuccess {
            user_id: user.id,
            ip: ip.to_string(),
            user_agent: user_agent.map(|s| s.to_string()),
            provider: Some(info.provider.clone()),
            action,
            at: self.clock.now(),
        });
    }
}

/// Derive a username from the external identity: email local part, else a
/// slugified display name, else `<provider>_user`, always with a 6-digit
/// suffix appended.
fn generate_username(info: &OAuthUserInfo) -> String {
    let base = if let Some(email) = info.email.as_deref() {
        email.split('@').next().unwrap_or(email).to_string()
    } else if let Some(name) = info.name.as_deref() {
        let slug: String = name
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if slug.is_empty() {
            format!("{}_user", info.provider)
        } else {
            slug
        }
    } else {
        format!("{}_user", info.provider)
    };

    let mut rng = rand::thread_rng();
    let suffix: String = (0..6).map(|_| rng.gen_range(0..10).to_string()).collect();

    format!("{}_{}", base, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(email: Option<&str>, name: Option<&str>) -> OAuthUserInfo {
        OAuthUserInfo {
            provider: "google".to_string(),
            provider_user_id: "12345".to_string(),
            email: email.map(String::from),
            name: name.map(String::from),
            picture: None,
            raw: serde_json::Map::new(),
        }
    }

    #[test]
    fn username_prefers_email_local_part() {
        let username = generate_username(&info(Some("alice.w@example.com"), Some("Alice W")));
        assert!(username.starts_with("alice.w_"));
        assert_eq!(username.len(), "alice.w_".len() + 6);
    }

    #[test]
    fn username_falls_back_to_slugified_name() {
        let username = generate_username(&info(None, Some("Alice Wonder-Land")));
        assert!(username.starts_with("alicewonderland_"));
    }

    #[test]
    fn username_falls_back_to_provider() {
        let username = generate_username(&info(None, None));
        assert!(username.starts_with("google_user_"));
    }

    #[test]
    fn suffix_is_six_digits() {
        let username = generate_username(&info(None, None));
        let suffix = username.rsplit('_').next().unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }
}
