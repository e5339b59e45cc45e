//! In-memory fakes for `search-core`'s four capability traits, grounded on
//! the `Mutex<Vec<_>>`-backed `FakeStore` already used for the retention
//! job's own unit tests (`search-core/src/retention/mod.rs`), generalized
//! into one fake per trait so integration tests can wire a full
//! [`search_core::orchestrator::SearchOrchestrator`].

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use search_core::error::Result;
use search_core::fingerprint::Fingerprint;
use search_core::store::{AnalyticsStore, EmbeddingProvider, ResultCache, ScoredProduct, VectorStore};
use search_core::types::{AnalyticsEvent, Baseline, BaselineScope, DailyPerformance, FacetUsage, Filters, LearnedPattern, PopularQuery, Product, SearchResponse};

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    ((dot / (mag_a * mag_b)) + 1.0) / 2.0
}

fn matches_filters(p: &Product, filters: &Filters) -> bool {
    if matches!(p.status, search_core::types::product::ProductStatus::Archived) {
        return false;
    }
    if let Some(min) = filters.min_price {
        if p.price < min {
            return false;
        }
    }
    if let Some(max) = filters.max_price {
        if p.price > max {
            return false;
        }
    }
    if let Some(store) = &filters.store_scope {
        if p.store_id.as_deref() != Some(store.as_str()) {
            return false;
        }
    }
    true
}

/// An in-memory product catalog, linear-scanned on every search.
#[derive(Default)]
pub struct InMemoryVectorStore {
    products: Mutex<Vec<Product>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn seeded(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert_product(&self, product: &Product) -> Result<()> {
        let mut products = self.products.lock().unwrap();
        if let Some(existing) = products
            .iter_mut()
            .find(|p| p.external_id == product.external_id)
        {
            *existing = product.clone();
        } else {
            products.push(product.clone());
        }
        Ok(())
    }

    async fn get_product(&self, external_id: &str) -> Result<Option<Product>> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.external_id == external_id)
            .cloned())
    }

    async fn search_semantic(
        &self,
        embedding: &[f32],
        filters: &Filters,
        similarity_threshold: f32,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<ScoredProduct>, u64)> {
        let mut scored: Vec<ScoredProduct> = self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| matches_filters(p, filters))
            .map(|p| ScoredProduct {
                product: p.clone(),
                similarity: cosine_similarity(embedding, &p.combined_embedding),
            })
            .filter(|s| s.similarity >= similarity_threshold)
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.product.internal_id.cmp(&b.product.internal_id))
        });
        let total = scored.len() as u64;
        let page = scored.into_iter().skip(offset as usize).take(limit as usize).collect();
        Ok((page, total))
    }

    async fn search_fuzzy(
        &self,
        query: &str,
        filters: &Filters,
        _min_trigram_score: f32,
        offset: u32,
        limit: u32,
    ) -> Result<(Vec<ScoredProduct>, u64)> {
        let needle = query.to_lowercase();
        let mut scored: Vec<ScoredProduct> = self
            .products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| matches_filters(p, filters))
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .map(|p| ScoredProduct {
                product: p.clone(),
                similarity: 1.0,
            })
            .collect();

        scored.sort_by(|a, b| a.product.external_id.cmp(&b.product.external_id));
        let total = scored.len() as u64;
        let page = scored.into_iter().skip(offset as usize).take(limit as usize).collect();
        Ok((page, total))
    }
}

/// An in-memory result cache with the same TTL-on-read semantics as the
/// redb-backed store (`search-store-cache`).
#[derive(Default)]
pub struct InMemoryResultCache {
    entries: Mutex<std::collections::HashMap<String, (SearchResponse, DateTime<Utc>)>>,
}

impl InMemoryResultCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn namespaced_key(namespace: &str, key: Fingerprint) -> String {
    format!("{namespace}:{}", key.to_hex())
}

#[async_trait]
impl ResultCache for InMemoryResultCache {
    async fn get(&self, namespace: &str, key: Fingerprint) -> Result<Option<SearchResponse>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(&namespaced_key(namespace, key)).and_then(|(response, expires_at)| {
            if Utc::now() < *expires_at {
                Some(response.clone())
            } else {
                None
            }
        }))
    }

    async fn put(
        &self,
        namespace: &str,
        key: Fingerprint,
        value: &SearchResponse,
        ttl: std::time::Duration,
    ) -> Result<()> {
        let expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::seconds(0));
        self.entries
            .lock()
            .unwrap()
            .insert(namespaced_key(namespace, key), (value.clone(), expires_at));
        Ok(())
    }

    async fn invalidate_prefix(&self, namespace: &str) -> Result<u64> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        let prefix = format!("{namespace}:");
        entries.retain(|key, _| !key.starts_with(&prefix));
        Ok((before - entries.len()) as u64)
    }
}

/// An in-memory analytics/baseline/pattern store.
#[derive(Default)]
pub struct InMemoryAnalyticsStore {
    events: Mutex<Vec<AnalyticsEvent>>,
    baselines: Mutex<Vec<Baseline>>,
    patterns: Mutex<Vec<LearnedPattern>>,
}

impl InMemoryAnalyticsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalyticsStore for InMemoryAnalyticsStore {
    async fn record_event(&self, event: &AnalyticsEvent) -> Result<()> {
        let mut events = self.events.lock().unwrap();
        let duplicate = events.iter().any(|e| {
            e.session_id == event.session_id
                && e.timestamp == event.timestamp
                && e.query_hash == event.query_hash
        });
        if !duplicate {
            events.push(event.clone());
        }
        Ok(())
    }

    async fn daily_performance(&self, since: DateTime<Utc>) -> Result<Vec<DailyPerformance>> {
        let events = self.events.lock().unwrap();
        let mut by_day: std::collections::BTreeMap<i64, Vec<&AnalyticsEvent>> = std::collections::BTreeMap::new();
        for event in events.iter().filter(|e| e.timestamp >= since) {
            by_day.entry(event.timestamp.timestamp() / 86_400).or_default().push(event);
        }

        Ok(by_day
            .into_iter()
            .map(|(day, events)| {
                let count = events.len() as f64;
                let avg_latency_ms = events.iter().map(|e| e.latency_ms as f64).sum::<f64>() / count;
                let cache_hit_rate = events.iter().filter(|e| e.cache_hit).count() as f64 / count;
                let zero_result_rate = events.iter().filter(|e| e.result_count == 0).count() as f64 / count;
                DailyPerformance {
                    date: DateTime::from_timestamp(day * 86_400, 0).unwrap_or_default(),
                    query_count: events.len() as u64,
                    avg_latency_ms,
                    cache_hit_rate,
                    zero_result_rate,
                }
            })
            .collect())
    }

    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<AnalyticsEvent>> {
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect())
    }

    async fn facet_usage(&self, _since: DateTime<Utc>) -> Result<Vec<FacetUsage>> {
        Ok(vec![])
    }

    async fn popular_queries(&self, limit: u32) -> Result<Vec<PopularQuery>> {
        let events = self.events.lock().unwrap();
        let mut by_query: std::collections::HashMap<&str, (u64, f64, DateTime<Utc>)> =
            std::collections::HashMap::new();
        for event in events.iter() {
            let entry = by_query
                .entry(event.query.as_str())
                .or_insert((0, 0.0, event.timestamp));
            entry.0 += 1;
            entry.1 += event.result_count as f64;
            entry.2 = entry.2.max(event.timestamp);
        }

        let mut ranked: Vec<(PopularQuery, DateTime<Utc>)> = by_query
            .into_iter()
            .map(|(query, (count, result_sum, last_seen))| {
                (
                    PopularQuery {
                        query: query.to_string(),
                        count,
                        avg_result_count: result_sum / count as f64,
                    },
                    last_seen,
                )
            })
            .collect();

        ranked.sort_by(|a, b| b.0.count.cmp(&a.0.count).then(b.1.cmp(&a.1)));
        ranked.truncate(limit as usize);
        Ok(ranked.into_iter().map(|(pq, _)| pq).collect())
    }

    async fn save_baseline(&self, baseline: &Baseline) -> Result<()> {
        self.baselines.lock().unwrap().push(baseline.clone());
        Ok(())
    }

    async fn latest_baseline(&self) -> Result<Option<Baseline>> {
        Ok(self
            .baselines
            .lock()
            .unwrap()
            .iter()
            .max_by_key(|b| b.computed_at)
            .cloned())
    }

    async fn latest_baseline_for(
        &self,
        scope: BaselineScope,
        store_id: Option<&str>,
        group: &str,
    ) -> Result<Option<Baseline>> {
        Ok(self
            .baselines
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.scope == scope && b.store_id.as_deref() == store_id && b.group == group)
            .max_by_key(|b| b.computed_at)
            .cloned())
    }

    async fn save_pattern(&self, pattern: &LearnedPattern) -> Result<()> {
        let mut patterns = self.patterns.lock().unwrap();
        if let Some(existing) = patterns.iter_mut().find(|p| p.pattern_id == pattern.pattern_id) {
            *existing = pattern.clone();
        } else {
            patterns.push(pattern.clone());
        }
        Ok(())
    }

    async fn list_patterns(&self) -> Result<Vec<LearnedPattern>> {
        Ok(self.patterns.lock().unwrap().clone())
    }

    async fn delete_pattern(&self, pattern_id: uuid::Uuid) -> Result<()> {
        self.patterns.lock().unwrap().retain(|p| p.pattern_id != pattern_id);
        Ok(())
    }

    async fn purge_older_than(
        &self,
        analytics_before: DateTime<Utc>,
        clicks_before: DateTime<Utc>,
        performance_before: DateTime<Utc>,
    ) -> Result<u64> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| {
            let cutoff = if e.clicked_external_id.is_some() {
                clicks_before
            } else {
                analytics_before
            };
            e.timestamp >= cutoff
        });
        let mut purged = (before - events.len()) as u64;

        let mut baselines = self.baselines.lock().unwrap();
        let before = baselines.len();
        baselines.retain(|b| b.computed_at >= performance_before);
        purged += (before - baselines.len()) as u64;

        Ok(purged)
    }
}

/// A deterministic embedding provider: each distinct input hashes to the
/// same fixed-dimension vector, so similarity assertions in tests are
/// reproducible without a real upstream model.
pub struct MockEmbeddingProvider {
    dim: usize,
}

impl MockEmbeddingProvider {
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new(8)
    }
}

fn deterministic_embedding(bytes: &[u8], dim: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut embedding = vec![0.0f32; dim];
    for (i, chunk) in bytes.chunks(4.max(bytes.len() / dim.max(1))).enumerate().take(dim) {
        let mut hasher = DefaultHasher::new();
        chunk.hash(&mut hasher);
        let hashed = hasher.finish();
        embedding[i % dim] += (hashed % 1000) as f32 / 1000.0;
    }

    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in &mut embedding {
            *x /= norm;
        }
    }
    embedding
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        Ok(deterministic_embedding(text.as_bytes(), self.dim))
    }

    async fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        Ok(deterministic_embedding(bytes, self.dim))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_core::types::request::SearchType;

    fn product(id: &str, price: f64, hot: usize) -> Product {
        crate::test_product(id, &format!("product {id}"), price, hot)
    }

    #[tokio::test]
    async fn vector_store_round_trips_and_filters_archived() {
        let store = InMemoryVectorStore::new();
        let mut archived = product("ext-1", 10.0, 0);
        archived.status = search_core::types::product::ProductStatus::Archived;
        store.upsert_product(&archived).await.unwrap();
        store.upsert_product(&product("ext-2", 10.0, 0)).await.unwrap();

        let (results, total) = store
            .search_semantic(&[1.0, 0.0, 0.0, 0.0], &Filters::default(), 0.9, 0, 10)
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(results[0].product.external_id, "ext-2");
    }

    #[tokio::test]
    async fn result_cache_respects_ttl() {
        let cache = InMemoryResultCache::new();
        let key = Fingerprint::compute("boots", &Filters::default(), 1, 25, SearchType::Semantic);
        let response = SearchResponse {
            results: vec![],
            pagination: search_core::types::response::Pagination::new(1, 25, 0),
            filters: search_core::types::response::AppliedFilters {
                min_price: None,
                max_price: None,
                store_scope: None,
                similarity_threshold: 0.7,
            },
            facets: search_core::types::response::Facets::default(),
            metadata: search_core::types::response::ResponseMetadata {
                cache_hit: false,
                fallback_used: false,
                applied_strategies: vec![],
                search_type: SearchType::Semantic,
                result_count: 0,
            },
        };

        cache
            .put("semantic_search", key, &response, std::time::Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.get("semantic_search", key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn mock_embedding_provider_is_deterministic() {
        let provider = MockEmbeddingProvider::default();
        let a = provider.embed_text("boots").await.unwrap();
        let b = provider.embed_text("boots").await.unwrap();
        assert_eq!(a, b);
    }
}
