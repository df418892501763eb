use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Error, UserId, UserRecord, repositories::UserRepository};

/// Repository that keeps the user set in process memory.
///
/// Like a real store it keeps only the durable fields, so records read back
/// from it always start without an active session.
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    records: RwLock<Vec<(UserId, String)>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-populated with `(id, role)` pairs.
    pub fn with_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let records = records
            .into_iter()
            .map(|(id, role)| (UserId::from(id.into()), role.into()))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Number of records currently persisted.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn load_all(&self) -> Result<Vec<UserRecord>, Error> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .map(|(id, role)| UserRecord::new(id.clone(), role.clone()))
            .collect())
    }

    async fn save_all(&self, users: &[UserRecord]) -> Result<(), Error> {
        *self.records.write().await = users
            .iter()
            .map(|user| (user.id().clone(), user.role().to_string()))
            .collect();
        Ok(())
    }
}
