//! Builder pattern for constructing Turnstile instances
//!
//! This module provides a type-safe builder for creating [`Turnstile`] instances with
//! compile-time validation of storage configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use turnstile::TurnstileBuilder;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let turnstile = TurnstileBuilder::new()
//!         .with_file_storage("users.txt")
//!         .build()
//!         .await?;
//!
//!     turnstile.register("alice", "User").await?;
//!     turnstile.authenticate("alice")?;
//!     Ok(())
//! }
//! ```

#[cfg(feature = "file")]
use std::path::Path;
use std::sync::Arc;

use turnstile_core::{
    AccountRegistry, AuthenticationService, Clock, CredentialVerifier, EventBus,
    InMemoryUserRepository, LockoutConfig, SystemClock, TokioUnlockScheduler, UnlockScheduler,
    UserRepository, events::DEFAULT_EVENT_CAPACITY,
};

use crate::Turnstile;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur when building a Turnstile instance.
#[derive(Debug, thiserror::Error)]
pub enum TurnstileBuilderError {
    /// Failed to read the user store
    #[error("Storage connection failed: {0}")]
    StorageConnection(String),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

// ============================================================================
// Type-State Markers
// ============================================================================

/// Marker type indicating no storage has been configured yet.
///
/// This is the initial state of [`TurnstileBuilder`].
pub struct NoStorage;

/// Marker type indicating storage has been configured.
pub struct WithStorage<R: UserRepository> {
    repository: Arc<R>,
}

// ============================================================================
// Builder Implementation
// ============================================================================

/// A type-safe builder for constructing [`Turnstile`] instances.
///
/// # Type States
///
/// - [`NoStorage`]: Initial state, storage must be configured
/// - [`WithStorage<R>`]: Storage configured, ready to build or add more configuration
pub struct TurnstileBuilder<Storage> {
    storage: Storage,
    lockout_config: LockoutConfig,
    clock: Option<Arc<dyn Clock>>,
    scheduler: Option<Arc<dyn UnlockScheduler>>,
    verifier: Option<Arc<dyn CredentialVerifier>>,
    event_capacity: usize,
}

impl Default for TurnstileBuilder<NoStorage> {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnstileBuilder<NoStorage> {
    /// Create a new builder with default configuration.
    ///
    /// # Defaults
    ///
    /// - Lockout: 5 attempts, 60 second lockout
    /// - Clock: system clock
    /// - Scheduler: Tokio timers on the runtime that calls [`build`](TurnstileBuilder::build)
    /// - Credential check: any registered, non-empty id
    pub fn new() -> Self {
        Self {
            storage: NoStorage,
            lockout_config: LockoutConfig::default(),
            clock: None,
            scheduler: None,
            verifier: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Use an existing repository for the user store.
    pub fn with_repository<R: UserRepository>(
        self,
        repository: Arc<R>,
    ) -> TurnstileBuilder<WithStorage<R>> {
        TurnstileBuilder {
            storage: WithStorage { repository },
            lockout_config: self.lockout_config,
            clock: self.clock,
            scheduler: self.scheduler,
            verifier: self.verifier,
            event_capacity: self.event_capacity,
        }
    }

    /// Keep registered users in memory only.
    ///
    /// Everything is lost when the process exits.
    pub fn with_memory_storage(self) -> TurnstileBuilder<WithStorage<InMemoryUserRepository>> {
        self.with_repository(Arc::new(InMemoryUserRepository::new()))
    }

    /// Keep registered users in a flat text file at `path`.
    ///
    /// The file is created on the first registration if it does not exist.
    #[cfg(feature = "file")]
    pub fn with_file_storage<P: AsRef<Path>>(
        self,
        path: P,
    ) -> TurnstileBuilder<WithStorage<crate::file::FileUserRepository>> {
        self.with_repository(Arc::new(crate::file::FileUserRepository::new(path)))
    }
}

// ============================================================================
// Configuration Methods
// ============================================================================

impl<S> TurnstileBuilder<S> {
    /// Configure the lockout threshold and duration.
    ///
    /// Default: 5 attempts, 60 second lockout
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use chrono::Duration;
    /// use turnstile::{LockoutConfig, TurnstileBuilder};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let turnstile = TurnstileBuilder::new()
    ///     .with_memory_storage()
    ///     .with_lockout_config(
    ///         LockoutConfig::default().with_lockout_period(Duration::minutes(5)),
    ///     )
    ///     .build()
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_lockout_config(mut self, config: LockoutConfig) -> Self {
        self.lockout_config = config;
        self
    }

    /// Use `clock` to timestamp locks and events.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Use `scheduler` for unlock timers.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn UnlockScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Replace the credential check applied to registered users.
    pub fn with_verifier(mut self, verifier: Arc<dyn CredentialVerifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Buffer up to `capacity` events per subscriber.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl<R: UserRepository> TurnstileBuilder<WithStorage<R>> {
    /// Load the user store and build the [`Turnstile`] instance.
    ///
    /// # Errors
    ///
    /// - [`TurnstileBuilderError::InvalidConfiguration`] if the lockout
    ///   threshold is zero, or no scheduler was given and there is no Tokio
    ///   runtime to run timers on
    /// - [`TurnstileBuilderError::StorageConnection`] if the store cannot be read
    pub async fn build(self) -> Result<Turnstile<R>, TurnstileBuilderError> {
        if self.lockout_config.max_failed_attempts == 0 {
            return Err(TurnstileBuilderError::InvalidConfiguration(
                "max_failed_attempts must be at least 1".to_string(),
            ));
        }

        let scheduler: Arc<dyn UnlockScheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(TokioUnlockScheduler::current().ok_or_else(|| {
                TurnstileBuilderError::InvalidConfiguration(
                    "no Tokio runtime available for unlock timers".to_string(),
                )
            })?),
        };

        let registry = AccountRegistry::open(self.storage.repository)
            .await
            .map_err(|e| TurnstileBuilderError::StorageConnection(e.to_string()))?;

        let mut service = AuthenticationService::new(Arc::new(registry), scheduler)
            .with_config(&self.lockout_config)
            .with_clock(self.clock.unwrap_or_else(|| Arc::new(SystemClock)))
            .with_event_bus(EventBus::new(self.event_capacity));

        if let Some(verifier) = self.verifier {
            service = service.with_verifier(verifier);
        }

        tracing::info!(
            users = service.registry().len(),
            max_failed_attempts = self.lockout_config.max_failed_attempts,
            lockout_secs = self.lockout_config.lockout_period.num_seconds(),
            "Turnstile ready"
        );

        Ok(Turnstile::new(service))
    }
}
