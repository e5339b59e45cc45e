//! redb-backed implementation of [`search_core::store::ResultCache`].
//!
//! Grounded on the teacher's `RedbStorage` (`memory-storage-redb/src/lib.rs`):
//! a single [`redb::Database`] opened once, every blocking redb call run
//! through [`tokio::task::spawn_blocking`] with a timeout, one table per
//! concern, postcard for on-disk encoding.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use redb::{Database, TableDefinition};
use search_core::error::{Error, Result};
use tracing::info;

mod entry;
mod result_cache;

pub use entry::CacheEntry;

const CACHE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("search_cache");

const DB_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

async fn with_db_timeout<T, F>(operation: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::time::timeout(DB_OPERATION_TIMEOUT, tokio::task::spawn_blocking(operation)).await
    {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(Error::StoreUnavailable(format!(
            "cache task join error: {join_err}"
        ))),
        Err(_) => Err(Error::StoreUnavailable(format!(
            "cache operation timed out after {DB_OPERATION_TIMEOUT:?}"
        ))),
    }
}

/// The redb-backed search result cache (spec C3).
pub struct RedbResultCache {
    db: Arc<Database>,
}

impl RedbResultCache {
    /// Open (creating if absent) the cache database at `path`.
    pub async fn new(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "opening result cache database");
        let path_buf = path.to_path_buf();

        let db = with_db_timeout(move || {
            Database::create(&path_buf)
                .map_err(|e| Error::StoreUnavailable(format!("failed to open cache db: {e}")))
        })
        .await?;

        let store = Self { db: Arc::new(db) };
        store.initialize_table().await?;
        Ok(store)
    }

    /// Open an in-memory-backed cache for tests: a tempdir-local file,
    /// since redb has no true `:memory:` mode.
    #[cfg(test)]
    async fn new_in_dir(dir: &tempfile::TempDir) -> Result<Self> {
        Self::new(&dir.path().join("cache.redb")).await
    }

    async fn initialize_table(&self) -> Result<()> {
        let db = Arc::clone(&self.db);
        with_db_timeout(move || {
            let write_txn = db
                .begin_write()
                .map_err(|e| Error::StoreUnavailable(format!("begin write failed: {e}")))?;
            {
                let _table = write_txn
                    .open_table(CACHE_TABLE)
                    .map_err(|e| Error::StoreUnavailable(format!("open table failed: {e}")))?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::StoreUnavailable(format!("commit failed: {e}")))?;
            Ok(())
        })
        .await
    }
}
