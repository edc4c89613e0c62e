//! Brute-force lockout tracking.
//!
//! Counters and lock expiries both key on `username:ip` so a shared NAT
//! address cannot lock an account for everyone, and a lock cannot be read
//! under one key while failures accumulate under another. State is process
//! local: it does not survive restarts and does not span processes. Deployments
//! with multiple instances need a `LockoutStore` backed by a shared counter
//! store with atomic increment-and-expire.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::utils::Clock;

/// Tracks failed login attempts and temporary locks. Implementations must be
/// safe under concurrent calls for the same key; over-counting under a race
/// is acceptable, losing a recorded failure is not. No method ever fails,
/// and an absent entry simply means zero failures.
pub trait LockoutStore: Send + Sync {
    /// Remaining lock duration for this key, if currently locked.
    /// Expired locks are cleared on read.
    fn remaining_lockout(&self, username: &str, ip: &str) -> Option<Duration>;

    fn is_locked_out(&self, username: &str, ip: &str) -> bool {
        self.remaining_lockout(username, ip).is_some()
    }

    /// Record one failed attempt; sets the lock once the counter reaches the
    /// configured maximum.
    fn record_failure(&self, username: &str, ip: &str);

    /// Forget the failure counter for this key after a successful login.
    fn reset_failures(&self, username: &str, ip: &str);
}

#[derive(Debug, Clone, Default)]
struct LoginAttemptRecord {
    failure_count: u32,
    locked_until: Option<DateTime<Utc>>,
}

/// In-memory [`LockoutStore`] for single-process deployments.
pub struct MemoryLockoutStore {
    max_attempts: u32,
    lockout_duration: Duration,
    clock: Arc<dyn Clock>,
    attempts: DashMap<String, LoginAttemptRecord>,
}

impl MemoryLockoutStore {
    pub fn new(max_attempts: u32, lockout_duration_minutes: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lockout_duration: Duration::minutes(lockout_duration_minutes),
            clock,
            attempts: DashMap::new(),
        }
    }

    fn key(username: &str, ip: &str) -> String {
        format!("{}:{}", username, ip)
    }
}

impl LockoutStore for MemoryLockoutStore {
    fn remaining_lockout(&self, username: &str, ip: &str) -> Option<Duration> {
        let key = Self::key(username, ip);
        let now = self.clock.now();

        let mut record = self.attempts.get_mut(&key)?;
        match record.locked_until {
            Some(until) if until > now => Some(until - now),
            Some(_) => {
                // Lock has expired; clear it lazily. The counter stays, so a
                // further failure re-locks immediately.
                record.locked_until = None;
                None
            }
            None => None,
        }
    }

    fn record_failure(&self, username: &str, ip: &str) {
        let key = Self::key(username, ip);
        let mut record = self.attempts.entry(key).or_default();
        record.failure_count += 1;

        if record.failure_count >= self.max_attempts {
            let until = self.clock.now() + self.lockout_duration;
            record.locked_until = Some(until);
            tracing::warn!(
                username = %username,
                ip = %ip,
                failures = record.failure_count,
                locked_until = %until,
                "Account locked after repeated failed logins"
            );
        }
    }

    fn reset_failures(&self, username: &str, ip: &str) {
        self.attempts.remove(&Self::key(username, ip));
    }
}
