//! Repository traits for the durable user store
//!
//! Only identity records are durable. A repository persists the whole set of
//! registered users at once: the registry hands it a snapshot after every
//! successful registration and reads the full set back when it opens.
//!
//! Storage backends implement [`UserRepository`]; this crate ships an
//! in-memory implementation for tests and ephemeral deployments.

pub mod memory;

pub use memory::InMemoryUserRepository;

use async_trait::async_trait;

use crate::{Error, UserRecord};

/// Durable storage for the registered user set
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Read every persisted user record.
    ///
    /// A store that has never been written is empty, not an error.
    async fn load_all(&self) -> Result<Vec<UserRecord>, Error>;

    /// Replace the persisted set with `users`.
    async fn save_all(&self, users: &[UserRecord]) -> Result<(), Error>;

    /// Check that the backing store is reachable
    async fn health_check(&self) -> Result<(), Error> {
        Ok(())
    }
}
