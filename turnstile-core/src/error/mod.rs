pub mod utilities;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Expected outcomes of an authentication or registration attempt.
///
/// None of these are fatal: callers report them to the user and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("User not found")]
    UserNotFound,

    #[error("Bad credentials")]
    BadCredentials,

    #[error("Account is locked")]
    AccountLocked {
        /// When the pending unlock timer is due, if known.
        unlock_at: Option<DateTime<Utc>>,
    },

    #[error("User already exists")]
    UserAlreadyExists,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),
}

impl Error {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
