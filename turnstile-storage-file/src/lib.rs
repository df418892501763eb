//! Flat-file storage backend for turnstile
//!
//! Registered users are kept in a plain text file, one `<id>,<role>` record
//! per line. The file is rewritten in full on every save: the new contents go
//! to a sibling temporary file which is then renamed over the store.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use turnstile_storage_file::FileUserRepository;
//! use turnstile_core::repositories::UserRepository;
//!
//! # async fn example() -> Result<(), turnstile_core::Error> {
//! let repository = Arc::new(FileUserRepository::new("users.txt"));
//! let users = repository.load_all().await?;
//! # Ok(())
//! # }
//! ```
pub mod format;

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use turnstile_core::{
    Error, UserRecord, error::utilities::StorageResultExt, repositories::UserRepository,
};

/// User repository backed by a flat text file.
#[derive(Debug, Clone)]
pub struct FileUserRepository {
    path: PathBuf,
}

impl FileUserRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn parent_dir(&self) -> Option<&Path> {
        self.path.parent().filter(|p| !p.as_os_str().is_empty())
    }
}

#[async_trait]
impl UserRepository for FileUserRepository {
    async fn load_all(&self) -> Result<Vec<UserRecord>, Error> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "User store does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to read user store");
                return Err(e).map_storage_err_with_context("Failed to read user store");
            }
        };

        let parsed = format::parse(&contents);
        for (line, error) in &parsed.skipped {
            tracing::warn!(
                path = %self.path.display(),
                line,
                error = %error,
                "Skipping malformed user record"
            );
        }

        Ok(parsed.records)
    }

    async fn save_all(&self, users: &[UserRecord]) -> Result<(), Error> {
        if let Some(parent) = self.parent_dir() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_storage_err_with_context("Failed to create user store directory")?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, format::encode(users))
            .await
            .map_storage_err_with_context("Failed to write user store")?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_storage_err_with_context("Failed to replace user store")?;

        tracing::debug!(path = %self.path.display(), count = users.len(), "Saved user store");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        match self.parent_dir() {
            Some(parent) => tokio::fs::metadata(parent)
                .await
                .map(|_| ())
                .map_storage_err_with_context("User store directory is not accessible"),
            None => Ok(()),
        }
    }
}
