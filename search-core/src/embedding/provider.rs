//! HTTP-backed [`EmbeddingProvider`], feature-gated behind `provider-http`,
//! matching the teacher's optional `openai`/`mistral` provider features
//! (`memory-core/src/embeddings/openai.rs`): a thin `reqwest` client posting
//! to an OpenAI-compatible embeddings endpoint, with the image path routed
//! through [`fetch_image_bytes`] first.

#![cfg(feature = "provider-http")]

use serde::{Deserialize, Serialize};

use crate::embedding::fetch_image_bytes;
use crate::error::{Error, Result};
use crate::store::EmbeddingProvider;
use crate::types::config::EmbeddingConfig;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponseItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingResponseItem>,
}

/// Calls an OpenAI-compatible `/embeddings` endpoint for text, and a
/// same-shaped endpoint with a base64-encoded image payload for images.
///
/// Image bytes are fetched and guarded by [`fetch_image_bytes`] before this
/// type ever sees them; it never accepts a bare URL itself.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    config: EmbeddingConfig,
}

impl HttpEmbeddingProvider {
    #[must_use]
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn post_embedding(&self, input: &str) -> Result<Vec<f32>> {
        let url = format!("{}/embeddings", self.config.api_base_url.trim_end_matches('/'));
        let body = EmbeddingRequest {
            model: &self.config.model_name,
            input,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?
            .json::<EmbeddingResponse>()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::UpstreamUnavailable("embedding response had no data".into()))?
            .embedding;

        if embedding.len() != self.config.dim {
            return Err(Error::IntegrityError(format!(
                "provider returned {}-dimensional embedding, expected {}",
                embedding.len(),
                self.config.dim
            )));
        }

        Ok(embedding)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.post_embedding(text).await
    }

    async fn embed_image(&self, bytes: &[u8]) -> Result<Vec<f32>> {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.post_embedding(&format!("data:image;base64,{encoded}")).await
    }
}

/// Convenience wrapper: fetch `url`'s bytes (bounded/guarded per
/// [`fetch_image_bytes`]) and embed them in one call.
pub async fn embed_image_url(
    provider: &HttpEmbeddingProvider,
    url: &str,
    config: &EmbeddingConfig,
) -> Result<Vec<f32>> {
    let bytes = fetch_image_bytes(url, config).await?;
    provider.embed_image(&bytes).await
}
