use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::config::AppConfig;
use crate::store::{KvStore, MemoryStore, PgStore, RetryingStore, StoreError};

/// Shared handle to the document store plus the process-wide write lock.
///
/// Every read-modify-write goes through [`Db::lock_writes`] so two requests
/// can never interleave on the same documents.
#[derive(Clone)]
pub struct Db {
    store: Arc<dyn KvStore>,
    write_lock: Arc<Mutex<()>>,
}

impl Db {
    pub fn new<S: KvStore + 'static>(store: S) -> Self {
        Self {
            store: Arc::new(store),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn memory() -> Self {
        Self::new(MemoryStore::new())
    }

    pub fn store(&self) -> &dyn KvStore {
        self.store.as_ref()
    }

    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }
}

/// Open the store named by the configuration: PostgreSQL when
/// `DATABASE_URL` is set, otherwise an in-memory store.
pub async fn init_store(config: &AppConfig) -> Result<Db, StoreError> {
    match &config.database_url {
        Some(url) => {
            let pg = PgStore::connect(url, config.db_max_connections).await?;
            log::info!("Using PostgreSQL document store");
            Ok(Db::new(RetryingStore::new(pg, config.retry)))
        }
        None => {
            log::warn!("No DATABASE_URL set, using in-memory store (data lost on restart)");
            Ok(Db::new(RetryingStore::new(MemoryStore::new(), config.retry)))
        }
    }
}
