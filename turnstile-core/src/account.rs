//! Per-account lockout state
//!
//! [`AccountState`] is the runtime counterpart of a [`UserRecord`](crate::UserRecord).
//! It exists for registered and unregistered ids alike, so that probing a
//! nonexistent account is rate limited exactly like guessing at a real one.
//! It is held in memory only and resets when the process restarts.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Failed-attempt counter and lock flag for one id.
///
/// `locked` is true exactly while an unlock timer is pending for the id, and
/// `unlock_at` is set exactly while `locked` is true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    pub failed_attempts: u32,
    pub locked: bool,
    pub unlock_at: Option<DateTime<Utc>>,
}

impl AccountState {
    pub fn is_locked(&self) -> bool {
        self.locked
    }
}

/// Current lockout status of an id, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutStatus {
    /// The id that was checked.
    pub user_id: UserId,
    /// Consecutive failures since the last success or unlock.
    pub failed_attempts: u32,
    /// Attempts allowed before the account locks.
    pub max_failed_attempts: u32,
    /// Whether the account is currently locked.
    pub is_locked: bool,
    /// When the account unlocks (only set while locked).
    pub unlock_at: Option<DateTime<Utc>>,
}

impl LockoutStatus {
    pub fn new(user_id: UserId, state: AccountState, max_failed_attempts: u32) -> Self {
        Self {
            user_id,
            failed_attempts: state.failed_attempts,
            max_failed_attempts,
            is_locked: state.locked,
            unlock_at: state.unlock_at,
        }
    }

    /// How many more failures the account tolerates before it locks.
    ///
    /// Always zero while locked.
    pub fn remaining_attempts(&self) -> u32 {
        if self.is_locked {
            return 0;
        }
        self.max_failed_attempts.saturating_sub(self.failed_attempts)
    }

    /// Seconds until the account unlocks, measured from `now`.
    ///
    /// Returns `None` when the account is not locked.
    pub fn retry_after_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        if !self.is_locked {
            return None;
        }
        self.unlock_at
            .map(|until| (until - now).num_seconds().max(0))
    }
}
