#![forbid(unsafe_code)]

use crate::config::ServerConfig;
use crate::error::ApiError;
use ct_core::Deadline;
use ct_storage::{SqliteStore, StoreError};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<SqliteStore>>,
    config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(store: SqliteStore, config: ServerConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            config: Arc::new(config),
        }
    }

    pub fn open(config: ServerConfig) -> Result<Self, StoreError> {
        let store = SqliteStore::open(&config.storage_dir)?;
        Ok(Self::new(store, config))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Runs `work` on the blocking pool with the store locked for its whole
    /// duration, so a lookup and the write it guards see the same state.
    pub(crate) async fn with_store<T, F>(&self, work: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteStore, &Deadline) -> Result<T, ApiError> + Send + 'static,
    {
        let deadline = Deadline::within(self.config.store_deadline());
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            // A panicking holder leaves no open transaction behind: rusqlite
            // rolls back on drop.
            let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
            work(&mut store, &deadline)
        })
        .await
        .map_err(|err| ApiError::Internal(format!("store worker failed: {err}")))?
    }
}
