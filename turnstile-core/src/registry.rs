//! The account registry.
//!
//! [`AccountRegistry`] exclusively owns every [`UserRecord`] and
//! [`AccountState`]. Callers only ever receive copies; all changes go through
//! the registry's methods, each of which is atomic for a single id.
//!
//! State entries are created lazily for any id that is looked at, registered
//! or not. This is what lets unregistered ids accrue failures and lock, so an
//! attacker cannot tell "no such user" apart from "wrong credentials".
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use tokio::sync::Mutex;

use crate::{
    Error, UserId, UserRecord,
    account::AccountState,
    error::AuthError,
    policy::LockoutPolicy,
    repositories::UserRepository,
};

/// Result of counting one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The failure was counted and the account stays unlocked.
    Counted { failed_attempts: u32 },
    /// The failure was counted and locked the account.
    Locked {
        failed_attempts: u32,
        unlock_at: DateTime<Utc>,
    },
    /// The account was already locked; nothing was counted.
    AlreadyLocked { unlock_at: Option<DateTime<Utc>> },
}

/// Owner of the identity and lockout maps.
///
/// Reads and writes for different ids proceed concurrently; operations on the
/// same id are serialized by the map's per-shard locks. Persistence writes are
/// serialized separately so a slow write never overwrites a newer snapshot.
pub struct AccountRegistry<R: UserRepository> {
    repository: Arc<R>,
    users: DashMap<UserId, UserRecord>,
    states: DashMap<UserId, AccountState>,
    save_lock: Mutex<()>,
}

impl<R: UserRepository> AccountRegistry<R> {
    /// Create an empty registry without reading the store.
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            users: DashMap::new(),
            states: DashMap::new(),
            save_lock: Mutex::new(()),
        }
    }

    /// Create a registry and load the persisted user set into it.
    pub async fn open(repository: Arc<R>) -> Result<Self, Error> {
        let registry = Self::new(repository);
        registry.load().await?;
        Ok(registry)
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Read the persisted user set into memory.
    ///
    /// Records already in memory are kept. Lockout state is never persisted, so
    /// every loaded account starts unlocked with no failures.
    ///
    /// Returns the number of records added.
    pub async fn load(&self) -> Result<usize, Error> {
        let records = self.repository.load_all().await?;
        let mut added = 0;

        for record in records {
            match self.users.entry(record.id().clone()) {
                Entry::Occupied(existing) => {
                    tracing::warn!(
                        user_id = %existing.key(),
                        "Duplicate user record in store, keeping the first"
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(record);
                    added += 1;
                }
            }
        }

        tracing::info!(count = added, "Loaded registered users");
        Ok(added)
    }

    /// Write the current user set to the store, replacing its contents.
    pub async fn save(&self) -> Result<(), Error> {
        let _guard = self.save_lock.lock().await;
        let snapshot = self.users();
        self.repository.save_all(&snapshot).await
    }

    /// True iff `id` has a user record.
    pub fn exists(&self, id: &UserId) -> bool {
        self.users.contains_key(id)
    }

    /// A copy of the record for `id`, if registered.
    pub fn user(&self, id: &UserId) -> Option<UserRecord> {
        self.users.get(id).map(|user| user.clone())
    }

    /// Copies of every registered record, ordered by id.
    pub fn users(&self) -> Vec<UserRecord> {
        let mut users: Vec<UserRecord> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by(|a, b| a.id().cmp(b.id()));
        users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Register a new account and persist the updated user set.
    ///
    /// Fails with [`AuthError::UserAlreadyExists`] for a registered id and with
    /// [`AuthError::AccountLocked`] while the id is locked; neither touches any
    /// state. Otherwise the account starts unlocked with no failures.
    ///
    /// If the durable write fails the registration still stands in memory and
    /// the storage error is returned.
    pub async fn register(&self, id: UserId, role: impl Into<String>) -> Result<(), Error> {
        match self.users.entry(id.clone()) {
            Entry::Occupied(_) => {
                tracing::info!(user_id = %id, "User is already signed up");
                return Err(AuthError::UserAlreadyExists.into());
            }
            Entry::Vacant(slot) => {
                // Held across the check and the reset so a concurrent lock
                // cannot land in between. Lock order is users, then states.
                let mut state = self.states.entry(id.clone()).or_default();
                if state.locked {
                    return Err(AuthError::AccountLocked {
                        unlock_at: state.unlock_at,
                    }
                    .into());
                }
                *state = AccountState::default();
                drop(state);
                slot.insert(UserRecord::new(id.clone(), role));
            }
        }

        tracing::info!(user_id = %id, "New account created");

        if let Err(e) = self.save().await {
            tracing::error!(user_id = %id, error = %e, "Failed to persist user store");
            return Err(e);
        }
        Ok(())
    }

    /// The state for `id`, creating a default entry on first access.
    pub fn get_state(&self, id: &UserId) -> AccountState {
        *self.states.entry(id.clone()).or_insert_with(|| {
            tracing::debug!(user_id = %id, "Tracking new account state");
            AccountState::default()
        })
    }

    /// The state for `id` without creating an entry.
    pub fn peek_state(&self, id: &UserId) -> Option<AccountState> {
        self.states.get(id).map(|state| *state)
    }

    /// Increment the failure counter and return the new value.
    pub fn increment_failure(&self, id: &UserId) -> u32 {
        let mut state = self.states.entry(id.clone()).or_default();
        state.failed_attempts = state.failed_attempts.saturating_add(1);
        state.failed_attempts
    }

    /// Reset the failure counter to zero.
    pub fn reset_failure(&self, id: &UserId) {
        self.states.entry(id.clone()).or_default().failed_attempts = 0;
    }

    /// Set the lock fields. `unlock_at` is ignored when unlocking.
    pub fn set_locked(&self, id: &UserId, locked: bool, unlock_at: Option<DateTime<Utc>>) {
        let mut state = self.states.entry(id.clone()).or_default();
        state.locked = locked;
        state.unlock_at = if locked { unlock_at } else { None };
    }

    /// Count a failed attempt and lock the account if `policy` says so.
    ///
    /// The check, increment and lock happen under one entry lock, so
    /// concurrent failures for an id can lock it only once and a locked
    /// account never accrues further failures.
    pub fn record_failure(
        &self,
        id: &UserId,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> FailureOutcome {
        let mut state = self.states.entry(id.clone()).or_default();

        if state.locked {
            return FailureOutcome::AlreadyLocked {
                unlock_at: state.unlock_at,
            };
        }

        state.failed_attempts = state.failed_attempts.saturating_add(1);
        let failed_attempts = state.failed_attempts;

        if policy.on_failure(failed_attempts) {
            let unlock_at = now + policy.lock_duration();
            state.locked = true;
            state.unlock_at = Some(unlock_at);
            FailureOutcome::Locked {
                failed_attempts,
                unlock_at,
            }
        } else {
            FailureOutcome::Counted { failed_attempts }
        }
    }

    /// Reset the failure counter after a successful attempt.
    ///
    /// Fails with [`AuthError::AccountLocked`] if the account locked in the
    /// meantime, in which case nothing changes.
    pub fn record_success(&self, id: &UserId) -> Result<(), AuthError> {
        let mut state = self.states.entry(id.clone()).or_default();
        if state.locked {
            return Err(AuthError::AccountLocked {
                unlock_at: state.unlock_at,
            });
        }
        state.failed_attempts = 0;
        Ok(())
    }

    /// Clear the lock on `id` and reset its counter.
    ///
    /// Returns `false` if the account was not locked.
    pub fn unlock(&self, id: &UserId) -> bool {
        match self.states.get_mut(id) {
            Some(mut state) if state.locked => {
                *state = AccountState::default();
                true
            }
            _ => false,
        }
    }

    /// Mark a session as started on the record for `id`.
    ///
    /// Returns `None` if `id` is not registered, otherwise what the record's
    /// `login` reported.
    pub fn start_session(&self, id: &UserId) -> Option<bool> {
        self.users.get_mut(id).map(|mut user| user.login())
    }

    /// End the session on the record for `id`.
    ///
    /// Returns `false` if `id` is not registered.
    pub fn end_session(&self, id: &UserId) -> bool {
        match self.users.get_mut(id) {
            Some(mut user) => {
                user.logout();
                true
            }
            None => false,
        }
    }
}
