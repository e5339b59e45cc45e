//! Capability traits the orchestrator depends on.
//!
//! Each collaborator is injected as a trait object at construction time
//! (`Arc<dyn VectorStore>`, etc.); nothing in `search-core` performs runtime
//! service lookup. This mirrors the teacher's `StorageBackend` trait
//! (`memory-core/src/storage/mod.rs`), generalized into four narrower
//! capability traits instead of one do-everything trait, since this
//! pipeline's storage concerns (durable catalog, ephemeral cache, append-only
//! analytics, upstream embeddings) have genuinely different failure modes
//! and lifetimes.

use async_trait::async_trait;

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::types::{
    AnalyticsEvent, Baseline, BaselineScope, DailyPerformance, FacetUsage, Filters, LearnedPattern,
    PopularQuery, Product, SearchResponse,
};

/// A scored candidate returned from a vector or fuzzy search.
#[derive(Debug, Clone)]
pub struct ScoredProduct {
    pub product: Product,
    pub similarity: f32,
}

/// The durable product catalog with vector-similarity search (spec C2).
///
/// Implemented by `search-store-vector` over libSQL/Turso.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Transactional upsert keyed by `external_id`.
    async fn upsert_product(&self, product: &Product) -> Result<()>;

    async fn get_product(&self, external_id: &str) -> Result<Option<Product>>;

    /// Cosine-similarity search against `embedding`, with predicate pushdown
    /// on `filters`. Returns at most `limit` candidates starting at `offset`,
    /// ordered by descending similarity.
    async fn search_semantic(
        &self,
        embedding: &[f32],
        filters: &Filters,
        similarity_threshold: f32,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<ScoredProduct>, u64)>;

    /// Trigram/fuzzy text search, used when `search_type == Fuzzy` or as the
    /// embedding-provider fallback (spec §7, `UpstreamUnavailable`).
    async fn search_fuzzy(
        &self,
        query: &str,
        filters: &Filters,
        min_trigram_score: f32,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<ScoredProduct>, u64)>;
}

/// The ephemeral result cache (spec C3).
///
/// Implemented by `search-store-cache` over redb; TTL enforcement is the
/// implementor's responsibility via an `expires_at` field, not this trait's.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// `namespace` scopes the key (e.g. `"semantic_search"`) so
    /// `invalidate_prefix` can target exactly one namespace without
    /// colliding with another's fingerprint hex by chance.
    async fn get(&self, namespace: &str, key: Fingerprint) -> Result<Option<SearchResponse>>;

    async fn put(
        &self,
        namespace: &str,
        key: Fingerprint,
        value: &SearchResponse,
        ttl: std::time::Duration,
    ) -> Result<()>;

    /// Invalidate every entry under `namespace` (e.g. all entries for a
    /// `search_type`), used by administrative invalidation, not request
    /// serving.
    async fn invalidate_prefix(&self, namespace: &str) -> Result<u64>;
}

/// The append-mostly analytics store (spec C6, C9).
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Record one event; implementors must dedupe on
    /// `(session_id, timestamp, query_hash)` rather than erroring on a
    /// duplicate, since the recorder may retry after a partial failure.
    async fn record_event(&self, event: &AnalyticsEvent) -> Result<()>;

    async fn daily_performance(
        &self,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<DailyPerformance>>;

    /// Raw events since `since`, the input `learning::compute_baseline` groups
    /// and aggregates per (store, category)/(store, intent) (spec C9 step 2).
    async fn events_since(&self, since: chrono::DateTime<chrono::Utc>) -> Result<Vec<AnalyticsEvent>>;

    async fn facet_usage(
        &self,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<FacetUsage>>;

    /// Most-queried terms overall, ordered by cumulative count descending,
    /// ties broken by most-recent last-seen timestamp (spec's resolved
    /// "get_popular_searches_analytics duplicate" Open Question).
    async fn popular_queries(&self, limit: u32) -> Result<Vec<PopularQuery>>;

    async fn save_baseline(&self, baseline: &Baseline) -> Result<()>;

    async fn latest_baseline(&self) -> Result<Option<Baseline>>;

    /// Most recent baseline for one (scope, store, group), used as
    /// `compute_baseline`'s `previous` argument to derive a trend.
    async fn latest_baseline_for(
        &self,
        scope: BaselineScope,
        store_id: Option<&str>,
        group: &str,
    ) -> Result<Option<Baseline>>;

    async fn save_pattern(&self, pattern: &LearnedPattern) -> Result<()>;

    async fn list_patterns(&self) -> Result<Vec<LearnedPattern>>;

    async fn delete_pattern(&self, pattern_id: uuid::Uuid) -> Result<()>;

    /// Delete rows older than their respective retention window (spec C10).
    /// Returns the number of rows removed per table, for logging.
    async fn purge_older_than(
        &self,
        analytics_before: chrono::DateTime<chrono::Utc>,
        clicks_before: chrono::DateTime<chrono::Utc>,
        performance_before: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64>;
}

/// The upstream embedding provider (spec C1).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed free text. `search_type` is always [`SearchType::Semantic`] or
    /// [`SearchType::Fuzzy`]'s ranking hint; implementors ignore it.
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed image bytes fetched from a caller-supplied URL.
    async fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scored_product_is_plain_data() {
        // compile-time check only: ScoredProduct must not depend on any
        // storage-crate type.
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScoredProduct>();
    }
}
