use crate::{Error, error::StorageError};

/// Extension trait for Result types to simplify storage error mapping
///
/// Storage backends deal in `std::io::Error` and friends; this converts any
/// displayable error into a turnstile storage error.
///
/// # Example
///
/// ```rust
/// use turnstile_core::error::utilities::StorageResultExt;
///
/// let result: Result<(), std::io::Error> = Ok(());
/// result.map_storage_err_with_context("Failed to write user store").unwrap();
/// ```
pub trait StorageResultExt<T> {
    /// Convert an I/O error to a turnstile storage error
    fn map_storage_err(self) -> Result<T, Error>;

    /// Convert an I/O error to a turnstile storage error with additional context
    fn map_storage_err_with_context(self, context: &str) -> Result<T, Error>;
}

impl<T, E: std::fmt::Display> StorageResultExt<T> for Result<T, E> {
    fn map_storage_err(self) -> Result<T, Error> {
        self.map_err(|e| Error::Storage(StorageError::Io(e.to_string())))
    }

    fn map_storage_err_with_context(self, context: &str) -> Result<T, Error> {
        self.map_err(|e| Error::Storage(StorageError::Io(format!("{context}: {e}"))))
    }
}
