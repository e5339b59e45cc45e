//! The search orchestrator (spec C5): the spine of the serving path.
//!
//! `SearchOrchestrator::search` runs the thirteen steps of spec §4.5 in
//! strict order within one request; across requests there is no ordering
//! guarantee (cache and analytics are eventually consistent).

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::instrument;
use uuid::Uuid;

use crate::adaptive::AdaptiveEngine;
use crate::analytics::AnalyticsRecorder;
use crate::cache::SingleFlight;
use crate::embedding::{fetch_image_bytes, EmbeddingClient};
use crate::error::{Error, Result};
use crate::facets::build_facets;
use crate::fingerprint::Fingerprint;
use crate::intent::{classify, Classification};
use crate::ratelimit::{SlidingWindowLimiter, TokenBucket};
use crate::store::{ResultCache, ScoredProduct, VectorStore};
use crate::types::analytics::AnalyticsEvent;
use crate::types::config::SearchConfig;
use crate::types::filters::Filters;
use crate::types::request::{NormalizedRequest, SearchRequest, SearchType};
use crate::types::response::{AppliedFilters, Pagination, ResponseMetadata, ResultItem, SearchResponse};

/// The `ResultCache` key namespace for a search type (spec C3: cache
/// invalidation scopes to one search type, never crossing into another's
/// fingerprint space).
fn cache_namespace(search_type: SearchType) -> &'static str {
    match search_type {
        SearchType::Semantic => "semantic_search",
        SearchType::Fuzzy => "fuzzy_search",
        SearchType::Image => "image_search",
    }
}

/// Constructor-injected collaborators the orchestrator depends on (spec §9
/// "explicit interface set... wire dependencies via constructor injection").
pub struct SearchOrchestrator {
    vector_store: Arc<dyn VectorStore>,
    result_cache: Arc<dyn ResultCache>,
    embedding_client: Arc<EmbeddingClient>,
    outbound_limiter: Arc<TokenBucket>,
    inbound_limiter: Arc<SlidingWindowLimiter>,
    single_flight: Arc<SingleFlight>,
    adaptive_engine: Arc<AdaptiveEngine>,
    analytics: AnalyticsRecorder,
    config: SearchConfig,
}

/// Builder for [`SearchOrchestrator`], mirroring the teacher's preference
/// for explicit construction over a god-object `new(..10 args..)`.
#[derive(Default)]
pub struct SearchOrchestratorBuilder {
    vector_store: Option<Arc<dyn VectorStore>>,
    result_cache: Option<Arc<dyn ResultCache>>,
    embedding_client: Option<Arc<EmbeddingClient>>,
    outbound_limiter: Option<Arc<TokenBucket>>,
    inbound_limiter: Option<Arc<SlidingWindowLimiter>>,
    adaptive_engine: Option<Arc<AdaptiveEngine>>,
    analytics: Option<AnalyticsRecorder>,
    config: Option<SearchConfig>,
}

impl SearchOrchestratorBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn vector_store(mut self, v: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(v);
        self
    }

    #[must_use]
    pub fn result_cache(mut self, v: Arc<dyn ResultCache>) -> Self {
        self.result_cache = Some(v);
        self
    }

    #[must_use]
    pub fn embedding_client(mut self, v: Arc<EmbeddingClient>) -> Self {
        self.embedding_client = Some(v);
        self
    }

    #[must_use]
    pub fn outbound_limiter(mut self, v: Arc<TokenBucket>) -> Self {
        self.outbound_limiter = Some(v);
        self
    }

    #[must_use]
    pub fn inbound_limiter(mut self, v: Arc<SlidingWindowLimiter>) -> Self {
        self.inbound_limiter = Some(v);
        self
    }

    #[must_use]
    pub fn adaptive_engine(mut self, v: Arc<AdaptiveEngine>) -> Self {
        self.adaptive_engine = Some(v);
        self
    }

    #[must_use]
    pub fn analytics(mut self, v: AnalyticsRecorder) -> Self {
        self.analytics = Some(v);
        self
    }

    #[must_use]
    pub fn config(mut self, v: SearchConfig) -> Self {
        self.config = Some(v);
        self
    }

    /// # Errors
    /// Returns `InvalidInput` if a required collaborator was never set.
    pub fn build(self) -> Result<SearchOrchestrator> {
        Ok(SearchOrchestrator {
            vector_store: self
                .vector_store
                .ok_or_else(|| Error::InvalidInput("vector_store is required".into()))?,
            result_cache: self
                .result_cache
                .ok_or_else(|| Error::InvalidInput("result_cache is required".into()))?,
            embedding_client: self
                .embedding_client
                .ok_or_else(|| Error::InvalidInput("embedding_client is required".into()))?,
            outbound_limiter: self
                .outbound_limiter
                .ok_or_else(|| Error::InvalidInput("outbound_limiter is required".into()))?,
            inbound_limiter: self
                .inbound_limiter
                .ok_or_else(|| Error::InvalidInput("inbound_limiter is required".into()))?,
            single_flight: Arc::new(SingleFlight::new()),
            adaptive_engine: self
                .adaptive_engine
                .ok_or_else(|| Error::InvalidInput("adaptive_engine is required".into()))?,
            analytics: self
                .analytics
                .ok_or_else(|| Error::InvalidInput("analytics is required".into()))?,
            config: self.config.unwrap_or_default(),
        })
    }
}

impl SearchOrchestrator {
    #[must_use]
    pub fn builder() -> SearchOrchestratorBuilder {
        SearchOrchestratorBuilder::new()
    }

    /// Run the thirteen-step search pipeline. `deadline` bounds total
    /// latency; on elapse the caller receives [`Error::Cancelled`] while the
    /// single-flight fill (if any) continues in the background.
    #[instrument(skip(self, request), fields(query = %request.query))]
    pub async fn search(&self, request: SearchRequest, deadline: Option<Duration>) -> Result<SearchResponse> {
        let fut = self.search_inner(request);
        match deadline {
            Some(d) => tokio::time::timeout(d, fut).await.unwrap_or(Err(Error::Cancelled)),
            None => fut.await,
        }
    }

    async fn search_inner(&self, request: SearchRequest) -> Result<SearchResponse> {
        let started = Instant::now();
        let caller = request.caller_fingerprint.clone();

        // Step 1: validate.
        let normalized = crate::types::request::normalize_request(
            request,
            self.config.search.default_similarity_threshold,
            self.config.search.max_page_size,
        )?;

        // Step 2: admit.
        self.inbound_limiter.check(&caller)?;

        // Step 3: fingerprint.
        let key = Fingerprint::compute(
            &normalized.query,
            &normalized.filters,
            normalized.page,
            normalized.limit,
            normalized.search_type,
        );

        // Step 4: cache lookup, run alongside C8's intent classification
        // (spec §5: "intent classification in parallel with the cache
        // lookup"). The classifier is pure/synchronous; `tokio::join!` still
        // lets the cache I/O suspend without blocking on it.
        let namespace = cache_namespace(normalized.search_type);
        let query_for_intent = normalized.query.clone();
        let (cached, classification) = tokio::join!(
            self.result_cache.get(namespace, key),
            tokio::task::spawn_blocking(move || classify(&query_for_intent))
        );
        let cached = cached?;
        // A classifier task panic never fails the request: fall back to an
        // unclassified ("other") query rather than propagate the join error.
        let classification = classification.unwrap_or_else(|_| classify(""));

        if let Some(mut cached) = cached {
            cached.metadata.cache_hit = true;
            self.emit_analytics(&normalized, &cached, &classification, started.elapsed(), None);
            return Ok(cached);
        }

        // Steps 5-12: single-flight guarded fill.
        let single_flight = self.single_flight.clone();
        let this_key = key;
        let response = {
            let vector_store = self.vector_store.clone();
            let result_cache = self.result_cache.clone();
            let embedding_client = self.embedding_client.clone();
            let outbound_limiter = self.outbound_limiter.clone();
            let adaptive_engine = self.adaptive_engine.clone();
            let config = self.config.clone();
            let normalized = normalized.clone();
            let classification_for_fill = classification.clone();

            single_flight
                .run_detached(this_key, move || async move {
                    fill(
                        &normalized,
                        this_key,
                        &classification_for_fill,
                        vector_store,
                        result_cache,
                        embedding_client,
                        outbound_limiter,
                        adaptive_engine,
                        &config,
                    )
                    .await
                })
                .await?
        };

        // Step 13: analytics (never blocks the caller).
        self.emit_analytics(&normalized, &response, &classification, started.elapsed(), None);

        Ok(response)
    }

    fn emit_analytics(
        &self,
        request: &NormalizedRequest,
        response: &SearchResponse,
        classification: &Classification,
        elapsed: Duration,
        clicked_external_id: Option<String>,
    ) {
        let avg_similarity = if response.results.is_empty() {
            0.0
        } else {
            response.results.iter().map(|r| f64::from(r.similarity)).sum::<f64>()
                / response.results.len() as f64
        };

        self.analytics.record(AnalyticsEvent {
            event_id: Uuid::new_v4(),
            session_id: request
                .session_id
                .clone()
                .unwrap_or_else(|| request.caller_fingerprint.0.clone()),
            caller_ip: request.caller_fingerprint.0.clone(),
            query: request.query.clone(),
            query_hash: Fingerprint::compute(
                &request.query,
                &request.filters,
                request.page,
                request.limit,
                request.search_type,
            )
            .to_hex(),
            search_type: response.metadata.search_type,
            filters: request.filters.clone(),
            page: request.page,
            limit: request.limit,
            user_agent: request.user_agent.clone(),
            result_count: response.metadata.result_count,
            cache_hit: response.metadata.cache_hit,
            applied_strategies: response.metadata.applied_strategies.clone(),
            latency_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            clicked_external_id,
            category: response.facets.category.first().map(|f| f.value.clone()),
            primary_intent: classification.primary_intent.as_str().to_string(),
            avg_similarity,
            timestamp: chrono::Utc::now(),
        });
    }
}

/// Steps 6-12 of spec §4.5, run inside the single-flight guard.
#[allow(clippy::too_many_arguments)]
async fn fill(
    normalized: &NormalizedRequest,
    key: Fingerprint,
    classification: &Classification,
    vector_store: Arc<dyn VectorStore>,
    result_cache: Arc<dyn ResultCache>,
    embedding_client: Arc<EmbeddingClient>,
    outbound_limiter: Arc<TokenBucket>,
    adaptive_engine: Arc<AdaptiveEngine>,
    config: &SearchConfig,
) -> Result<SearchResponse> {
    let margin = normalized.limit;
    let offset = (normalized.page - 1) * normalized.limit;

    let mut fallback_used = false;
    let mut search_type = normalized.search_type;
    let mut query_embedding: Option<Vec<f32>> = None;

    let mut candidates: (Vec<ScoredProduct>, u64) = if normalized.search_type == SearchType::Fuzzy {
        vector_store
            .search_fuzzy(
                &normalized.query,
                &normalized.filters,
                config.search.fuzzy_min_trigram_score,
                offset,
                normalized.limit + margin,
            )
            .await?
    } else {
        // Step 6: embed, governed by the outbound limiter.
        let embed_result: Result<Vec<f32>> = async {
            outbound_limiter
                .acquire(Duration::from_millis(config.rate.outbound_acquire_timeout_ms))
                .await?;
            if normalized.search_type == SearchType::Image {
                let url = normalized
                    .image_url
                    .as_ref()
                    .ok_or_else(|| Error::InvalidInput("image_url missing".into()))?;
                let bytes = fetch_image_bytes(url, &config.embedding).await?;
                embedding_client.embed_image(&bytes).await
            } else {
                embedding_client.embed_text(&normalized.query).await
            }
        }
        .await;

        match embed_result {
            Ok(embedding) => {
                // Step 7: vector search.
                let result = vector_store
                    .search_semantic(
                        &embedding,
                        &normalized.filters,
                        normalized.similarity_threshold,
                        offset,
                        normalized.limit + margin,
                    )
                    .await?;
                query_embedding = Some(embedding);
                result
            }
            Err(e) if e.is_recoverable() => {
                // Step 8 (embedding side): fall through to fuzzy search.
                fallback_used = true;
                search_type = SearchType::Fuzzy;
                vector_store
                    .search_fuzzy(
                        &normalized.query,
                        &normalized.filters,
                        config.search.fuzzy_min_trigram_score,
                        offset,
                        normalized.limit + margin,
                    )
                    .await?
            }
            Err(e) => return Err(e),
        }
    };

    // Step 8 (result side): no usable vector results also falls back to fuzzy.
    if candidates.0.is_empty() && search_type == SearchType::Semantic {
        fallback_used = true;
        search_type = SearchType::Fuzzy;
        candidates = vector_store
            .search_fuzzy(
                &normalized.query,
                &normalized.filters,
                config.search.fuzzy_min_trigram_score,
                offset,
                normalized.limit + margin,
            )
            .await?;
    }

    // Step 9: adaptive improvement. An explicit price filter always wins;
    // otherwise fall back to C8's price intent parsed out of the query text
    // itself, so C7's price-coherence scoring still has a signal when the
    // caller never set `filters.min_price`/`max_price` (spec C7/C8).
    let detected_price = match (normalized.filters.min_price, normalized.filters.max_price) {
        (Some(min), Some(max)) => Some((min, max)),
        _ => classification.detected_price,
    };

    let filters = normalized.filters.clone();
    let vector_store_for_requery = vector_store.clone();
    let similarity_threshold = normalized.similarity_threshold;
    let requery_limit = normalized.limit + margin;
    let requery_query_text = normalized.query.clone();
    let requery_embedding = query_embedding.clone();
    let requery_trigram_score = config.search.fuzzy_min_trigram_score;
    let requery = move |amended: Filters| {
        let vector_store = vector_store_for_requery.clone();
        let query_text = requery_query_text.clone();
        let embedding = requery_embedding.clone();
        Box::pin(async move {
            match embedding {
                Some(embedding) => {
                    vector_store
                        .search_semantic(&embedding, &amended, similarity_threshold, offset, requery_limit)
                        .await
                }
                None => {
                    vector_store
                        .search_fuzzy(&query_text, &amended, requery_trigram_score, offset, requery_limit)
                        .await
                }
            }
        }) as futures::future::BoxFuture<'static, Result<(Vec<ScoredProduct>, u64)>>
    };

    let outcome = adaptive_engine
        .improve(candidates.0, candidates.1, &filters, detected_price, &requery)
        .await;

    if !outcome.applied_strategies.is_empty() {
        fallback_used = true;
    }

    let mut page_items = outcome.results;
    page_items.truncate(normalized.limit as usize);

    // Step 10: facets.
    let facets = build_facets(&page_items);

    // Step 11: assemble.
    let results: Vec<ResultItem> = page_items
        .iter()
        .map(|r| ResultItem {
            external_id: r.product.external_id.clone(),
            internal_id: r.product.internal_id,
            title: r.product.title.clone(),
            description: r.product.description.clone(),
            price: r.product.price,
            image_url: r.product.image_url.clone(),
            vendor: r.product.vendor.clone(),
            product_type: r.product.product_type.clone(),
            tags: r.product.tags.clone(),
            similarity: r.similarity,
            search_type,
        })
        .collect();

    let response = SearchResponse {
        pagination: Pagination::new(normalized.page, normalized.limit, outcome.total),
        filters: AppliedFilters {
            min_price: normalized.filters.min_price,
            max_price: normalized.filters.max_price,
            store_scope: normalized.filters.store_scope.clone(),
            similarity_threshold: normalized.similarity_threshold,
        },
        metadata: ResponseMetadata {
            cache_hit: false,
            fallback_used,
            applied_strategies: outcome
                .applied_strategies
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            search_type,
            result_count: results.len(),
        },
        results,
        facets,
    };

    // Step 12: write-back with namespace TTL.
    let ttl = match search_type {
        SearchType::Semantic => config.cache.semantic,
        SearchType::Fuzzy => config.cache.fuzzy,
        SearchType::Image => config.cache.semantic,
    };
    // Cache write failures are logged by the implementor and must not fail
    // the request (spec §7): only bubble a hard store failure, never retry here.
    // `normalized.search_type` is always the originally-requested type
    // (fuzzy fallback only changes the response's `search_type`, not the
    // fingerprint's namespace), so this matches the step-4 lookup's namespace.
    let namespace = cache_namespace(normalized.search_type);
    let _ = result_cache.put(namespace, key, &response, ttl).await;

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_all_collaborators() {
        let err = SearchOrchestrator::builder().build();
        assert!(err.is_err());
    }
}
