//! Authentication and lockout service.
//!
//! Each id moves through `Unlocked(n) → Locked(unlock_at) → Unlocked(0)`:
//!
//! - Attempts against a locked id fail with [`AuthError::AccountLocked`] and
//!   are not counted.
//! - Failed attempts (unknown id or rejected credentials) are counted; the
//!   failure that reaches the threshold locks the id and arms an unlock timer.
//! - A successful attempt resets the counter.
//! - The unlock timer is the only way out of `Locked`. It always runs for the
//!   full lockout period.
//!
//! # Example
//!
//! ```rust,ignore
//! use turnstile_core::services::AuthenticationService;
//!
//! let service = AuthenticationService::open(repository, scheduler).await?;
//!
//! service.register("alice", "User").await?;
//! match service.authenticate("alice") {
//!     Ok(()) => { /* show the main window */ }
//!     Err(AuthError::AccountLocked { .. }) => { /* tell the user to retry later */ }
//!     Err(AuthError::UserNotFound) => { /* suggest signing up */ }
//!     Err(AuthError::BadCredentials) => { /* incorrect login */ }
//!     Err(AuthError::UserAlreadyExists) => unreachable!(),
//! }
//! ```
use std::sync::Arc;

use crate::{
    Error, UserId, UserRecord,
    account::LockoutStatus,
    clock::{Clock, SystemClock},
    error::AuthError,
    events::{Event, EventBus, FailureReason, UnlockReason},
    policy::{LockoutConfig, LockoutPolicy},
    registry::{AccountRegistry, FailureOutcome},
    repositories::UserRepository,
    scheduler::UnlockScheduler,
    validation::{validate_role, validate_user_id},
};

/// The credential check applied to registered users.
///
/// This is the seam where a real credential check would plug in; the lockout
/// state machine around it stays the same.
pub trait CredentialVerifier: Send + Sync + 'static {
    fn verify(&self, user: &UserRecord) -> bool;
}

impl<F> CredentialVerifier for F
where
    F: Fn(&UserRecord) -> bool + Send + Sync + 'static,
{
    fn verify(&self, user: &UserRecord) -> bool {
        self(user)
    }
}

/// Accepts any registered user with a non-empty id.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdPresenceVerifier;

impl CredentialVerifier for IdPresenceVerifier {
    fn verify(&self, user: &UserRecord) -> bool {
        !user.id().is_empty()
    }
}

/// Service for registration, authentication and lockout.
///
/// # Thread Safety
///
/// All methods take `&self` and may be called concurrently. Unlock timers
/// fire on the scheduler's own schedule and only touch the registry.
pub struct AuthenticationService<R: UserRepository> {
    registry: Arc<AccountRegistry<R>>,
    policy: LockoutPolicy,
    scheduler: Arc<dyn UnlockScheduler>,
    clock: Arc<dyn Clock>,
    verifier: Arc<dyn CredentialVerifier>,
    events: EventBus,
}

impl<R: UserRepository> AuthenticationService<R> {
    /// Create a service over an existing registry with the default policy.
    pub fn new(registry: Arc<AccountRegistry<R>>, scheduler: Arc<dyn UnlockScheduler>) -> Self {
        Self {
            registry,
            policy: LockoutPolicy::default(),
            scheduler,
            clock: Arc::new(SystemClock),
            verifier: Arc::new(IdPresenceVerifier),
            events: EventBus::default(),
        }
    }

    /// Load the user store from `repository` and create a service over it.
    pub async fn open(
        repository: Arc<R>,
        scheduler: Arc<dyn UnlockScheduler>,
    ) -> Result<Self, Error> {
        let registry = AccountRegistry::open(repository).await?;
        Ok(Self::new(Arc::new(registry), scheduler))
    }

    pub fn with_config(mut self, config: &LockoutConfig) -> Self {
        self.policy = LockoutPolicy::from(config);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn registry(&self) -> &Arc<AccountRegistry<R>> {
        &self.registry
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - [`ValidationError`](crate::ValidationError) if the id is empty or the
    ///   id or role cannot be stored
    /// - [`AuthError::UserAlreadyExists`] for a registered id
    /// - [`AuthError::AccountLocked`] while the id is locked
    /// - [`StorageError`](crate::StorageError) if the store write failed; the
    ///   account is registered in memory regardless
    pub async fn register(&self, id: &str, role: &str) -> Result<(), Error> {
        validate_user_id(id)?;
        validate_role(role)?;

        let user_id = UserId::new(id);
        let result = self.registry.register(user_id.clone(), role).await;

        if matches!(result, Ok(()) | Err(Error::Storage(_))) {
            self.events.emit(Event::UserRegistered {
                user_id,
                role: role.to_string(),
            });
        }
        result
    }

    /// Attempt to log in as `id`.
    pub fn authenticate(&self, id: &str) -> Result<(), AuthError> {
        let user_id = UserId::new(id);
        let state = self.registry.get_state(&user_id);

        tracing::debug!(
            user_id = %user_id,
            failed_attempts = state.failed_attempts,
            max_failed_attempts = self.policy.max_failed_attempts(),
            "Checking login"
        );

        if state.locked {
            tracing::info!(user_id = %user_id, "Account is locked, try again later");
            return Err(AuthError::AccountLocked {
                unlock_at: state.unlock_at,
            });
        }

        let Some(user) = self.registry.user(&user_id) else {
            tracing::info!(user_id = %user_id, "No user found");
            return Err(self.fail(&user_id, AuthError::UserNotFound));
        };

        if !self.verifier.verify(&user) {
            return Err(self.fail(&user_id, AuthError::BadCredentials));
        }

        self.registry.record_success(&user_id)?;

        if self.registry.start_session(&user_id) != Some(true) {
            return Err(self.fail(&user_id, AuthError::BadCredentials));
        }

        tracing::info!(user_id = %user_id, "Successful login");
        self.events.emit(Event::LoginSucceeded { user_id });
        Ok(())
    }

    /// End the session for `id`. Unknown ids are ignored.
    ///
    /// Lock state and failure counters are unaffected.
    pub fn logout(&self, id: &str) {
        let user_id = UserId::new(id);
        if self.registry.end_session(&user_id) {
            tracing::info!(user_id = %user_id, "User logged out");
            self.events.emit(Event::UserLoggedOut { user_id });
        }
    }

    /// Whether `id` is currently locked.
    pub fn is_locked(&self, id: &str) -> bool {
        self.registry
            .peek_state(&UserId::new(id))
            .is_some_and(|state| state.locked)
    }

    /// Whether `id` is registered.
    pub fn exists(&self, id: &str) -> bool {
        self.registry.exists(&UserId::new(id))
    }

    /// A copy of the record for `id`, if registered.
    pub fn user(&self, id: &str) -> Option<UserRecord> {
        self.registry.user(&UserId::new(id))
    }

    /// Failure count and lock status for `id`.
    pub fn lockout_status(&self, id: &str) -> LockoutStatus {
        let user_id = UserId::new(id);
        let state = self.registry.peek_state(&user_id).unwrap_or_default();
        LockoutStatus::new(user_id, state, self.policy.max_failed_attempts())
    }

    /// Write the registered user set to the store.
    pub async fn save(&self) -> Result<(), Error> {
        self.registry.save().await
    }

    /// Count a failed attempt and return the error to report.
    fn fail(&self, user_id: &UserId, reason: AuthError) -> AuthError {
        let now = self.clock.now();

        match self.registry.record_failure(user_id, &self.policy, now) {
            FailureOutcome::AlreadyLocked { unlock_at } => {
                // Another caller locked the account since we checked.
                AuthError::AccountLocked { unlock_at }
            }
            FailureOutcome::Counted { failed_attempts } => {
                tracing::warn!(
                    user_id = %user_id,
                    failed_attempts,
                    max_failed_attempts = self.policy.max_failed_attempts(),
                    error = %reason,
                    "Failed login attempt"
                );
                self.emit_failure(user_id, failed_attempts, &reason, now);
                reason
            }
            FailureOutcome::Locked {
                failed_attempts,
                unlock_at,
            } => {
                tracing::warn!(
                    user_id = %user_id,
                    failed_attempts,
                    error = %reason,
                    "Failed login attempt"
                );
                self.emit_failure(user_id, failed_attempts, &reason, now);
                self.arm_unlock(user_id);

                tracing::info!(
                    user_id = %user_id,
                    unlock_at = %unlock_at,
                    "Account is now locked"
                );
                self.events.emit(Event::AccountLocked {
                    user_id: user_id.clone(),
                    failed_attempts,
                    unlock_at,
                    timestamp: now,
                });
                reason
            }
        }
    }

    fn emit_failure(
        &self,
        user_id: &UserId,
        failed_attempts: u32,
        reason: &AuthError,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) {
        if let Some(reason) = FailureReason::from_auth_error(reason) {
            self.events.emit(Event::LoginFailed {
                user_id: user_id.clone(),
                failed_attempts,
                reason,
                timestamp,
            });
        }
    }

    fn arm_unlock(&self, user_id: &UserId) {
        let registry = Arc::clone(&self.registry);
        let clock = Arc::clone(&self.clock);
        let events = self.events.clone();
        let target = user_id.clone();

        let armed = self.scheduler.schedule(
            user_id,
            self.policy.lock_duration(),
            Box::new(move || {
                if registry.unlock(&target) {
                    tracing::info!(user_id = %target, "Account is now unlocked");
                    events.emit(Event::AccountUnlocked {
                        user_id: target,
                        reason: UnlockReason::LockoutExpired,
                        timestamp: clock.now(),
                    });
                }
            }),
        );

        if !armed {
            // The pending timer will clear this lock when it fires.
            tracing::warn!(user_id = %user_id, "Unlock timer was already armed");
        }
    }
}
