//! Password credential verification with brute-force lockout.

use std::sync::Arc;

use crate::models::User;
use crate::services::audit::{AuditLogger, AuthFailure, AuthFailureKind, AuthSuccess};
use crate::services::{AuthError, LockoutStore};
use crate::stores::UserStore;
use crate::utils::{Clock, Password, PasswordHashString, PasswordHasher};

/// Verifies a username-or-email + password pair.
///
/// The step order is load-bearing: the lockout check happens before the
/// (slow) password hash comparison, and failure recording happens after it,
/// so lockout state cannot leak timing information about the hash check.
#[derive(Clone)]
pub struct CredentialAuthenticator {
    users: Arc<dyn UserStore>,
    lockout: Arc<dyn LockoutStore>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    audit: AuditLogger,
}

impl CredentialAuthenticator {
    pub fn new(
        users: Arc<dyn UserStore>,
        lockout: Arc<dyn LockoutStore>,
        hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
        audit: AuditLogger,
    ) -> Self {
        Self {
            users,
            lockout,
            hasher,
            clock,
            audit,
        }
    }

    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
        ip: &str,
        user_agent: Option<&str>,
    ) -> Result<User, AuthError> {
        if let Some(remaining) = self.lockout.remaining_lockout(identifier, ip) {
            let wait_minutes = wait_minutes(remaining);
            self.record_failure_event(identifier, AuthFailureKind::AccountLocked, None, ip, user_agent);
            return Err(AuthError::AccountLocked { wait_minutes });
        }

        // Email lookups are case-insensitive, usernames are not.
        let user = if identifier.contains('@') {
            self.users
                .find_by_email(&identifier.to_lowercase())
                .await
                .map_err(AuthError::from)?
        } else {
            self.users
                .find_by_username(identifier)
                .await
                .map_err(AuthError::from)?
        };

        let user = match user {
            Some(user) => user,
            None => {
                self.lockout.record_failure(identifier, ip);
                self.record_failure_event(
                    identifier,
                    AuthFailureKind::UserNotFound,
                    None,
                    ip,
                    user_agent,
                );
                // Indistinguishable from a wrong password: callers must not
                // learn whether the identifier exists.
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !user.is_active {
            // Not a brute-force signal: no failure is recorded.
            self.record_failure_event(
                identifier,
                AuthFailureKind::AccountInactive,
                Some(user.id),
                ip,
                user_agent,
            );
            return Err(AuthError::AccountInactive);
        }

        let matches = self.hasher.verify(
            &Password::new(password.to_string()),
            &PasswordHashString::new(user.password_hash.clone()),
        );

        if !matches {
            self.lockout.record_failure(identifier, ip);
            self.record_failure_event(
                identifier,
                AuthFailureKind::InvalidPassword,
                Some(user.id),
                ip,
                user_agent,
            );
            return Err(AuthError::InvalidCredentials);
        }

        self.lockout.reset_failures(identifier, ip);
        self.audit.success(AuthSuccess {
            user_id: user.id,
            ip: ip.to_string(),
            user_agent: user_agent.map(|s| s.to_string()),
            provider: None,
            action: "login",
            at: self.clock.now(),
        });

        Ok(user)
    }

    fn record_failure_event(
        &self,
        identifier: &str,
        kind: AuthFailureKind,
        user_id: Option<uuid::Uuid>,
        ip: &str,
        user_agent: Option<&str>,
    ) {
        self.audit.failure(AuthFailure {
            identifier: identifier.to_string(),
            kind,
            user_id,
            ip: ip.to_string(),
            user_agent: user_agent.map(|s| s.to_string()),
            at: self.clock.now(),
        });
    }
}

/// Remaining lock time rounded up to whole minutes, never reported as zero.
fn wait_minutes(remaining: chrono::Duration) -> u64 {
    let secs = remaining.num_seconds().max(0) as u64;
    secs.div_ceil(60).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_minutes_rounds_up() {
        assert_eq!(wait_minutes(chrono::Duration::seconds(1)), 1);
        assert_eq!(wait_minutes(chrono::Duration::seconds(60)), 1);
        assert_eq!(wait_minutes(chrono::Duration::seconds(61)), 2);
        assert_eq!(wait_minutes(chrono::Duration::minutes(15)), 15);
        assert_eq!(wait_minutes(chrono::Duration::seconds(0)), 1);
    }
}
