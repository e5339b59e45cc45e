//! Connection management: URL/token validation, schema initialization.

use std::sync::Arc;

use libsql::{Builder, Connection, Database};
use search_core::error::{Error, Result};
use tracing::info;

use crate::schema::ALL_SCHEMA_STATEMENTS;

/// The libSQL-backed catalog store, implementing [`search_core::store::VectorStore`]
/// and [`search_core::store::AnalyticsStore`].
///
/// Grounded on the teacher's `TursoStorage` connection/protocol-validation
/// pattern (`memory-storage-turso/src/lib.rs`), pared down to the single
/// connection this pipeline needs (no pooling, no compression).
pub struct VectorTursoStore {
    pub(crate) db: Arc<Database>,
}

impl VectorTursoStore {
    /// Connect to `url` with `token`.
    ///
    /// Only `libsql://`, `file:`, and `:memory:` protocols are accepted;
    /// remote connections require a non-empty token.
    ///
    /// # Errors
    /// `InvalidInput` for a disallowed protocol or missing token;
    /// `StoreUnavailable` if the connection itself fails.
    pub async fn new(url: &str, token: &str) -> Result<Self> {
        info!(url, "connecting to catalog database");

        if !url.starts_with("libsql://") && !url.starts_with("file:") && url != ":memory:" {
            return Err(Error::InvalidInput(format!(
                "unsupported database url protocol: {url}"
            )));
        }
        if url.starts_with("libsql://") && token.trim().is_empty() {
            return Err(Error::InvalidInput(
                "authentication token required for remote connections".into(),
            ));
        }

        let db = if url.starts_with("libsql://") {
            Builder::new_remote(url.to_string(), token.to_string())
                .build()
                .await
                .map_err(|e| Error::StoreUnavailable(e.to_string()))?
        } else if url == ":memory:" {
            Builder::new_local(":memory:")
                .build()
                .await
                .map_err(|e| Error::StoreUnavailable(e.to_string()))?
        } else {
            let path = url.strip_prefix("file:").unwrap_or(url);
            Builder::new_local(path)
                .build()
                .await
                .map_err(|e| Error::StoreUnavailable(e.to_string()))?
        };

        let store = Self { db: Arc::new(db) };
        store.initialize_schema().await?;
        Ok(store)
    }

    pub(crate) async fn get_connection(&self) -> Result<Connection> {
        self.db
            .connect()
            .map_err(|e| Error::StoreUnavailable(e.to_string()))
    }

    async fn initialize_schema(&self) -> Result<()> {
        let conn = self.get_connection().await?;
        for statement in ALL_SCHEMA_STATEMENTS {
            conn.execute(statement, ())
                .await
                .map_err(|e| Error::StoreUnavailable(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_insecure_protocol() {
        let result = VectorTursoStore::new("http://example.com", "").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn rejects_remote_without_token() {
        let result = VectorTursoStore::new("libsql://example.com", "").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn in_memory_connects_and_initializes_schema() {
        let store = VectorTursoStore::new(":memory:", "").await.unwrap();
        let conn = store.get_connection().await.unwrap();
        let mut rows = conn
            .query("SELECT COUNT(*) FROM products", ())
            .await
            .unwrap();
        assert!(rows.next().await.unwrap().is_some());
    }
}
