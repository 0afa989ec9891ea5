use std::{
    collections::{hash_map::Entry, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    auth::UserDatabase,
    error::DatabaseError,
    types::{CredentialRecord, InsertOutcome, Username},
};

#[derive(thiserror::Error, Debug)]
pub enum ConnectError {
    #[error("unsupported database url scheme: {0}")]
    UnsupportedScheme(String),
    #[cfg(feature = "postgres")]
    #[error("failed to connect to postgres")]
    Postgres {
        #[from]
        source: sqlx::Error,
    },
}

/// Open the store named by a connection url: `memory://` for a process-local
/// map, or `postgres://...` when built with the `postgres` feature.
pub async fn connect(url: &str) -> Result<Arc<dyn UserDatabase>, ConnectError> {
    let scheme = url.split_once("://").map_or(url, |(scheme, _)| scheme);

    match scheme {
        "memory" => Ok(Arc::new(InMemoryUserDatabase::new())),
        #[cfg(feature = "postgres")]
        "postgres" | "postgresql" => Ok(Arc::new(
            crate::postgres::PgUserDatabase::connect(url).await?,
        )),
        other => Err(ConnectError::UnsupportedScheme(other.to_owned())),
    }
}

/// Process-local store. Everything is lost on restart.
#[derive(Default)]
pub struct InMemoryUserDatabase {
    storage: RwLock<HashMap<Username, CredentialRecord>>,
}

impl InMemoryUserDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDatabase for InMemoryUserDatabase {
    async fn insert_user_if_absent(
        &self,
        record: &CredentialRecord,
    ) -> Result<InsertOutcome, DatabaseError> {
        match self.storage.write().await.entry(record.username.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn find_user(
        &self,
        username: &Username,
    ) -> Result<Option<CredentialRecord>, DatabaseError> {
        Ok(self.storage.read().await.get(username).cloned())
    }
}
