//! # Turnstile
//!
//! Turnstile is a small account gate for Rust applications: it registers
//! users, checks login attempts, and locks an account out for a fixed period
//! after too many consecutive failures.
//!
//! - Users are persisted to a flat `<id>,<role>` text file (or kept in memory)
//! - Five consecutive failed attempts lock the id for sixty seconds
//! - Attempts against a locked id are refused without being counted
//! - Locks lift on their own when the unlock timer fires
//!
//! Failures are counted per id whether or not the id is registered, so
//! probing for account names trips the same lockout.
//!
//! ## Example
//!
//! ```rust,no_run
//! use turnstile::{AuthError, TurnstileBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let turnstile = TurnstileBuilder::new()
//!         .with_file_storage("users.txt")
//!         .build()
//!         .await?;
//!
//!     turnstile.register("bob", "Admin").await?;
//!
//!     match turnstile.authenticate("bob") {
//!         Ok(()) => println!("welcome back"),
//!         Err(AuthError::AccountLocked { .. }) => println!("try again later"),
//!         Err(e) => println!("login failed: {e}"),
//!     }
//!
//!     turnstile.logout("bob");
//!     Ok(())
//! }
//! ```
use std::sync::Arc;

use tokio::sync::broadcast;
use turnstile_core::repositories::UserRepository;

mod builder;

pub use builder::{NoStorage, TurnstileBuilder, TurnstileBuilderError, WithStorage};

/// Re-export core types from turnstile_core
pub use turnstile_core::{
    AccountState, AuthError, Clock, CredentialVerifier, Error, Event, FailureReason,
    IdPresenceVerifier, LOCK_DURATION_SECS, LockoutConfig, LockoutStatus, MAX_ATTEMPTS,
    ManualClock, ManualUnlockScheduler, StorageError, SystemClock, TokioUnlockScheduler,
    UnlockReason, UnlockScheduler, UserId, UserRecord, ValidationError,
};

/// Re-export the in-memory repository for tests and ephemeral setups
pub use turnstile_core::InMemoryUserRepository;

/// Flat-file storage backend
#[cfg(feature = "file")]
pub mod file {
    pub use turnstile_storage_file::FileUserRepository;
    pub use turnstile_storage_file::format;
}

#[cfg(feature = "file")]
pub use file::FileUserRepository;

use turnstile_core::AuthenticationService;

/// The main entry point for account registration and login checks.
///
/// Cloning is cheap; clones share the same accounts, timers and event bus.
pub struct Turnstile<R: UserRepository> {
    service: Arc<AuthenticationService<R>>,
}

impl<R: UserRepository> Clone for Turnstile<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
        }
    }
}

impl Turnstile<InMemoryUserRepository> {
    /// Start building a new instance.
    pub fn builder() -> TurnstileBuilder<NoStorage> {
        TurnstileBuilder::new()
    }
}

impl<R: UserRepository> Turnstile<R> {
    pub(crate) fn new(service: AuthenticationService<R>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Register `id` with `role` and persist the user store.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if `id` is empty, or `id` or `role` contains a
    ///   comma or line break
    /// - [`AuthError::UserAlreadyExists`] if `id` is already registered
    /// - [`AuthError::AccountLocked`] while `id` is locked out
    /// - [`Error::Storage`] if the store could not be written; the user is
    ///   still registered for the lifetime of this instance
    pub async fn register(&self, id: &str, role: &str) -> Result<(), Error> {
        self.service.register(id, role).await
    }

    /// Attempt to log in as `id`.
    ///
    /// A locked id is refused with [`AuthError::AccountLocked`] before
    /// anything else is checked, and the attempt is not counted. Otherwise an
    /// unknown id or rejected credentials count one failure; reaching the
    /// threshold locks the id and arms its unlock timer. Success clears the
    /// failure count.
    pub fn authenticate(&self, id: &str) -> Result<(), AuthError> {
        self.service.authenticate(id)
    }

    /// End the session for `id`.
    pub fn logout(&self, id: &str) {
        self.service.logout(id)
    }

    /// Whether `id` is currently locked out.
    pub fn is_locked(&self, id: &str) -> bool {
        self.service.is_locked(id)
    }

    /// Whether `id` is registered.
    pub fn exists(&self, id: &str) -> bool {
        self.service.exists(id)
    }

    /// A copy of the registered record for `id`.
    pub fn user(&self, id: &str) -> Option<UserRecord> {
        self.service.user(id)
    }

    /// Every registered user, ordered by id.
    pub fn users(&self) -> Vec<UserRecord> {
        self.service.registry().users()
    }

    /// Failure count, remaining attempts and lock status for `id`.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # async fn example(turnstile: turnstile::Turnstile<turnstile::InMemoryUserRepository>) {
    /// let status = turnstile.lockout_status("bob");
    /// if status.is_locked {
    ///     println!("locked until {:?}", status.unlock_at);
    /// } else {
    ///     println!("{} attempts left", status.remaining_attempts());
    /// }
    /// # }
    /// ```
    pub fn lockout_status(&self, id: &str) -> LockoutStatus {
        self.service.lockout_status(id)
    }

    /// The effective lockout configuration.
    pub fn lockout_config(&self) -> LockoutConfig {
        let policy = self.service.policy();
        LockoutConfig::default()
            .with_max_failed_attempts(policy.max_failed_attempts())
            .with_lockout_period(policy.lock_duration())
    }

    /// Subscribe to account events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.service.events().subscribe()
    }

    /// Write the registered user set to the store.
    ///
    /// Registration already persists; this is for retrying after a failed write.
    pub async fn save(&self) -> Result<(), Error> {
        self.service.save().await
    }

    /// Check that the user store is reachable.
    pub async fn health_check(&self) -> Result<(), Error> {
        self.service.registry().repository().health_check().await
    }
}
