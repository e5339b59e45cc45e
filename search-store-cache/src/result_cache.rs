//! [`ResultCache`] implementation over a single redb table, keyed by the
//! fingerprint's hex digest (grounded on the teacher's `patterns.rs`
//! store/get/get_all CRUD idiom).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use redb::ReadableTable;
use search_core::error::{Error, Result};
use search_core::fingerprint::Fingerprint;
use search_core::store::ResultCache;
use search_core::types::SearchResponse;
use tracing::debug;

use crate::{with_db_timeout, CacheEntry, RedbResultCache, CACHE_TABLE};

/// Build the namespaced key a cache row is actually stored under, so
/// `invalidate_prefix(namespace)` can scope itself to exactly one namespace
/// instead of matching by accidental hex collision.
fn namespaced_key(namespace: &str, key: Fingerprint) -> String {
    format!("{namespace}:{}", key.to_hex())
}

#[async_trait]
impl ResultCache for RedbResultCache {
    async fn get(&self, namespace: &str, key: Fingerprint) -> Result<Option<SearchResponse>> {
        let db = Arc::clone(&self.db);
        let key_hex = namespaced_key(namespace, key);

        let entry: Option<CacheEntry> = with_db_timeout(move || {
            let read_txn = db
                .begin_read()
                .map_err(|e| Error::StoreUnavailable(format!("begin read failed: {e}")))?;
            let table = read_txn
                .open_table(CACHE_TABLE)
                .map_err(|e| Error::StoreUnavailable(format!("open table failed: {e}")))?;

            match table
                .get(key_hex.as_str())
                .map_err(|e| Error::StoreUnavailable(format!("get failed: {e}")))?
            {
                Some(guard) => {
                    let entry: CacheEntry = postcard::from_bytes(guard.value())
                        .map_err(|e| Error::Serialization(e.to_string()))?;
                    Ok(Some(entry))
                }
                None => Ok(None),
            }
        })
        .await?;

        match entry {
            Some(entry) if !entry.is_expired(Utc::now()) => {
                debug!(key = %key, "cache hit");
                Ok(Some(entry.response))
            }
            Some(_) => {
                debug!(key = %key, "cache entry expired");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        namespace: &str,
        key: Fingerprint,
        value: &SearchResponse,
        ttl: StdDuration,
    ) -> Result<()> {
        let db = Arc::clone(&self.db);
        let key_hex = namespaced_key(namespace, key);
        let expires_at = Utc::now()
            + ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::seconds(0));

        let entry = CacheEntry {
            response: value.clone(),
            expires_at,
        };
        let bytes =
            postcard::to_allocvec(&entry).map_err(|e| Error::Serialization(e.to_string()))?;

        with_db_timeout(move || {
            let write_txn = db
                .begin_write()
                .map_err(|e| Error::StoreUnavailable(format!("begin write failed: {e}")))?;
            {
                let mut table = write_txn
                    .open_table(CACHE_TABLE)
                    .map_err(|e| Error::StoreUnavailable(format!("open table failed: {e}")))?;
                table
                    .insert(key_hex.as_str(), bytes.as_slice())
                    .map_err(|e| Error::StoreUnavailable(format!("insert failed: {e}")))?;
            }
            write_txn
                .commit()
                .map_err(|e| Error::StoreUnavailable(format!("commit failed: {e}")))?;
            Ok(())
        })
        .await
    }

    async fn invalidate_prefix(&self, namespace: &str) -> Result<u64> {
        let db = Arc::clone(&self.db);
        let prefix = format!("{namespace}:");

        with_db_timeout(move || {
            let write_txn = db
                .begin_write()
                .map_err(|e| Error::StoreUnavailable(format!("begin write failed: {e}")))?;
            let mut removed = 0u64;
            {
                let mut table = write_txn
                    .open_table(CACHE_TABLE)
                    .map_err(|e| Error::StoreUnavailable(format!("open table failed: {e}")))?;

                let matching: Vec<String> = table
                    .iter()
                    .map_err(|e| Error::StoreUnavailable(format!("iterate failed: {e}")))?
                    .filter_map(|entry| entry.ok())
                    .filter(|(k, _)| k.value().starts_with(&prefix))
                    .map(|(k, _)| k.value().to_string())
                    .collect();

                for k in matching {
                    table
                        .remove(k.as_str())
                        .map_err(|e| Error::StoreUnavailable(format!("remove failed: {e}")))?;
                    removed += 1;
                }
            }
            write_txn
                .commit()
                .map_err(|e| Error::StoreUnavailable(format!("commit failed: {e}")))?;
            Ok(removed)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_core::types::request::SearchType;
    use search_core::types::response::{AppliedFilters, Facets, Pagination, ResponseMetadata};
    use search_core::types::Filters;

    fn response() -> SearchResponse {
        SearchResponse {
            results: vec![],
            pagination: Pagination::new(1, 25, 0),
            filters: AppliedFilters {
                min_price: None,
                max_price: None,
                store_scope: None,
                similarity_threshold: 0.7,
            },
            facets: Facets::default(),
            metadata: ResponseMetadata {
                cache_hit: false,
                fallback_used: false,
                applied_strategies: vec![],
                search_type: SearchType::Semantic,
                result_count: 0,
            },
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RedbResultCache::new_in_dir(&dir).await.unwrap();
        let key = Fingerprint::compute("boots", &Filters::default(), 1, 25, SearchType::Semantic);

        cache
            .put("semantic_search", key, &response(), StdDuration::from_secs(60))
            .await
            .unwrap();

        let hit = cache.get("semantic_search", key).await.unwrap();
        assert!(hit.is_some());
    }

    #[tokio::test]
    async fn expired_entry_is_not_returned() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RedbResultCache::new_in_dir(&dir).await.unwrap();
        let key = Fingerprint::compute("boots", &Filters::default(), 1, 25, SearchType::Semantic);

        cache
            .put("semantic_search", key, &response(), StdDuration::from_secs(0))
            .await
            .unwrap();

        tokio::time::sleep(StdDuration::from_millis(10)).await;
        assert!(cache.get("semantic_search", key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RedbResultCache::new_in_dir(&dir).await.unwrap();
        let key = Fingerprint::compute("sandals", &Filters::default(), 1, 25, SearchType::Fuzzy);
        assert!(cache.get("fuzzy_search", key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_prefix_removes_matching_keys() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RedbResultCache::new_in_dir(&dir).await.unwrap();
        let key = Fingerprint::compute("boots", &Filters::default(), 1, 25, SearchType::Semantic);
        cache
            .put("semantic_search", key, &response(), StdDuration::from_secs(60))
            .await
            .unwrap();

        let removed = cache.invalidate_prefix("semantic_search").await.unwrap();
        assert_eq!(removed, 1);
        assert!(cache.get("semantic_search", key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_prefix_does_not_cross_namespaces() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RedbResultCache::new_in_dir(&dir).await.unwrap();
        let key = Fingerprint::compute("boots", &Filters::default(), 1, 25, SearchType::Semantic);
        cache
            .put("semantic_search", key, &response(), StdDuration::from_secs(60))
            .await
            .unwrap();
        cache
            .put("fuzzy_search", key, &response(), StdDuration::from_secs(60))
            .await
            .unwrap();

        let removed = cache.invalidate_prefix("semantic_search").await.unwrap();
        assert_eq!(removed, 1);
        assert!(cache.get("fuzzy_search", key).await.unwrap().is_some());
    }
}
