//! Caching, retrying façade over an [`EmbeddingProvider`] (spec C1).
//!
//! Wraps an upstream provider with an LRU cache keyed by the SHA-256 hash of
//! the canonicalized input text (teacher's `retrieval::cache` keys by a
//! hashed, structured cache key for the same reason: avoid storing the raw
//! query text as the map key) and a [`RetryPolicy`] for transient failures.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::error::{Error, Result};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::store::EmbeddingProvider;

/// Canonicalize text the same way on every call so identical inputs always
/// hash to the same cache key (spec C1: "identical inputs must yield
/// identical outputs").
fn canonicalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn text_cache_key(canonical: &str) -> u64 {
    let digest = Sha256::digest(canonical.as_bytes());
    u64::from_be_bytes(digest[..8].try_into().unwrap_or([0; 8]))
}

/// A caching, retrying embedding client used by the orchestrator.
pub struct EmbeddingClient {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Mutex<LruCache<u64, Vec<f32>>>,
    retry_config: RetryConfig,
}

impl EmbeddingClient {
    #[must_use]
    pub fn new(provider: Arc<dyn EmbeddingProvider>, lru_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(lru_capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            provider,
            cache: Mutex::new(LruCache::new(capacity)),
            retry_config: RetryConfig::default(),
        }
    }

    #[must_use]
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Embed `text`, serving from cache when the canonicalized text has been
    /// embedded before.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let canonical = canonicalize(text);
        if canonical.is_empty() {
            return Err(Error::InvalidInput("text must not be empty".into()));
        }
        let key = text_cache_key(&canonical);

        if let Some(cached) = self.cache.lock().get(&key).cloned() {
            return Ok(cached);
        }

        let mut policy = RetryPolicy::with_config(self.retry_config.clone());
        let embedding = policy.execute(|| self.provider.embed_text(&canonical)).await?;

        self.cache.lock().put(key, embedding.clone());
        Ok(embedding)
    }

    /// Embed image bytes. Image embeddings are not cached: callers rarely
    /// repeat an identical image URL within a cache's useful lifetime.
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    pub async fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        let mut policy = RetryPolicy::with_config(self.retry_config.clone());
        policy.execute(|| self.provider.embed_image(bytes)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![text.len() as f32, 0.0])
        }

        async fn embed_image(&self, _bytes: &[u8]) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
    }

    #[tokio::test]
    async fn repeated_text_is_served_from_cache() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicU32::new(0),
        });
        let client = EmbeddingClient::new(provider.clone(), 10);

        client.embed_text("boots").await.unwrap();
        client.embed_text("boots").await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_text_bypasses_cache() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicU32::new(0),
        });
        let client = EmbeddingClient::new(provider.clone(), 10);

        client.embed_text("boots").await.unwrap();
        client.embed_text("sandals").await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn differently_cased_and_spaced_text_shares_a_cache_entry() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicU32::new(0),
        });
        let client = EmbeddingClient::new(provider.clone(), 10);

        client.embed_text("  Black   Boots ").await.unwrap();
        client.embed_text("black boots").await.unwrap();

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn whitespace_only_text_is_rejected() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicU32::new(0),
        });
        let client = EmbeddingClient::new(provider, 10);

        assert!(matches!(
            client.embed_text("   ").await,
            Err(Error::InvalidInput(_))
        ));
    }
}
