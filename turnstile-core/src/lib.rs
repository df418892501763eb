//! Core functionality for the turnstile project
//!
//! This crate contains the account model, the brute force lockout state
//! machine and the traits storage backends implement.
//!
//! It includes:
//!
//! - [`UserRecord`] and [`UserId`], the durable identity of an account
//! - [`AccountState`], the in-memory failure counter and lock flag
//! - [`LockoutPolicy`], which decides when failures lock an account
//! - [`AccountRegistry`], the single owner of all account data
//! - [`UnlockScheduler`], the one-shot timers that lift locks
//! - [`AuthenticationService`], the façade tying them together
//!
//! Storage backends implement [`repositories::UserRepository`].
pub mod account;
pub mod clock;
pub mod error;
pub mod events;
pub mod policy;
pub mod registry;
pub mod repositories;
pub mod scheduler;
pub mod services;
pub mod user;
pub mod validation;

pub use account::{AccountState, LockoutStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AuthError, Error, StorageError, ValidationError};
pub use events::{Event, EventBus, FailureReason, UnlockReason};
pub use policy::{LOCK_DURATION_SECS, LockoutConfig, LockoutPolicy, MAX_ATTEMPTS};
pub use registry::{AccountRegistry, FailureOutcome};
pub use repositories::{InMemoryUserRepository, UserRepository};
pub use scheduler::{ManualUnlockScheduler, TokioUnlockScheduler, UnlockCallback, UnlockScheduler};
pub use services::{AuthenticationService, CredentialVerifier, IdPresenceVerifier};
pub use user::{UserId, UserRecord};
