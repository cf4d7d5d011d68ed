// Key-value persistence: the store contract and its backends.

mod memory;
mod sqlite;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Failure talking to a backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("stored value could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A string-keyed store holding opaque string values.
///
/// Writes replace the whole value; there is no compare-and-swap, so two
/// clients doing read-modify-write on the same key can lose an update.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// The store selected at startup.
#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    /// Open the configured backend. `memory` wins over the database URL.
    pub async fn open(database_url: &str, memory: bool) -> Result<Self, StoreError> {
        if memory {
            tracing::info!("Using in-memory leaderboard store");
            return Ok(Store::Memory(MemoryStore::new()));
        }
        tracing::info!(url = database_url, "Opening SQLite leaderboard store");
        Ok(Store::Sqlite(SqliteStore::new(database_url).await?))
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Store::Memory(_) => "memory",
            Store::Sqlite(_) => "sqlite",
        }
    }
}

impl KeyValueStore for Store {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Store::Memory(s) => s.get(key).await,
            Store::Sqlite(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        match self {
            Store::Memory(s) => s.set(key, value).await,
            Store::Sqlite(s) => s.set(key, value).await,
        }
    }
}
