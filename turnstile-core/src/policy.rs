//! Lockout configuration and decision logic.
//!
//! The policy is stateless: it only answers "does this failure lock the
//! account, and for how long". Counting is the registry's job.

use chrono::Duration;

/// Consecutive failures that lock an account.
pub const MAX_ATTEMPTS: u32 = 5;

/// How long a locked account stays locked, in seconds.
pub const LOCK_DURATION_SECS: i64 = 60;

/// Configuration for account lockout.
///
/// # Example
///
/// ```rust
/// use chrono::Duration;
/// use turnstile_core::LockoutConfig;
///
/// let config = LockoutConfig::default()
///     .with_max_failed_attempts(3)
///     .with_lockout_period(Duration::minutes(5));
/// assert_eq!(config.max_failed_attempts, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutConfig {
    /// Failures (counted against registered and unregistered ids alike) before locking.
    pub max_failed_attempts: u32,
    /// Fixed lock duration. Further attempts while locked neither count nor extend it.
    pub lockout_period: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_failed_attempts: MAX_ATTEMPTS,
            lockout_period: Duration::seconds(LOCK_DURATION_SECS),
        }
    }
}

impl LockoutConfig {
    pub fn with_max_failed_attempts(mut self, max_failed_attempts: u32) -> Self {
        self.max_failed_attempts = max_failed_attempts;
        self
    }

    pub fn with_lockout_period(mut self, lockout_period: Duration) -> Self {
        self.lockout_period = lockout_period;
        self
    }
}

/// Decides when a failure escalates into a lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    max_failed_attempts: u32,
    lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self::from(&LockoutConfig::default())
    }
}

impl From<&LockoutConfig> for LockoutPolicy {
    fn from(config: &LockoutConfig) -> Self {
        Self {
            // A threshold of zero would lock on a success; treat it as one.
            max_failed_attempts: config.max_failed_attempts.max(1),
            lock_duration: config.lockout_period,
        }
    }
}

impl LockoutPolicy {
    /// Whether the failure that brought the counter to `attempts` should lock the account.
    ///
    /// The check is inclusive: with the default threshold the 5th failure locks.
    pub fn on_failure(&self, attempts: u32) -> bool {
        attempts >= self.max_failed_attempts
    }

    pub fn max_failed_attempts(&self) -> u32 {
        self.max_failed_attempts
    }

    pub fn lock_duration(&self) -> Duration {
        self.lock_duration
    }
}
