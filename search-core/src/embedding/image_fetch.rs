//! Bounded image loading for the image-search path (spec C1 `embed_image`).
//!
//! Fetches `image_url`, enforces a byte-size bound and a guarded timeout, and
//! sniffs the content type before handing raw bytes to the image encoder.
//! Downscaling large images is left to the upstream encoder: none of this
//! workspace's dependencies include a pixel-decoding crate, and the teacher
//! repo has no equivalent either, so this only implements the bound/timeout/
//! sniff guarantees the spec requires of C1 itself.

use crate::error::{Error, Result};
use crate::types::config::EmbeddingConfig;

const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Fetch and validate image bytes from `url`, bounded by `config`.
///
/// # Errors
/// `InvalidInput` for a bad URL, wrong content type, or oversized payload;
/// `UpstreamUnavailable` if the request times out or the fetch fails.
#[cfg(feature = "provider-http")]
pub async fn fetch_image_bytes(url: &str, config: &EmbeddingConfig) -> Result<Vec<u8>> {
    let client = reqwest::Client::new();
    let timeout = config.image_timeout;
    let max_bytes = max_image_bytes(config);

    let response = tokio::time::timeout(timeout, client.get(url).send())
        .await
        .map_err(|_| Error::UpstreamUnavailable("image fetch timed out".into()))?
        .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !ALLOWED_CONTENT_TYPES.iter().any(|t| content_type.starts_with(t)) {
        return Err(Error::InvalidInput(format!(
            "unsupported image content type: {content_type}"
        )));
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(Error::InvalidInput("image exceeds size bound".into()));
        }
    }

    let bytes = tokio::time::timeout(timeout, response.bytes())
        .await
        .map_err(|_| Error::UpstreamUnavailable("image download timed out".into()))?
        .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;

    if bytes.len() as u64 > max_bytes {
        return Err(Error::InvalidInput("image exceeds size bound".into()));
    }

    Ok(bytes.to_vec())
}

#[cfg(not(feature = "provider-http"))]
pub async fn fetch_image_bytes(_url: &str, _config: &EmbeddingConfig) -> Result<Vec<u8>> {
    Err(Error::InvalidInput(
        "image search requires the provider-http feature".into(),
    ))
}

fn max_image_bytes(config: &EmbeddingConfig) -> u64 {
    // Area-preserving downscale guidance (`image_max_dim`) translates to a
    // generous byte bound here since no pixel decoder is available to
    // measure actual dimensions pre-decode.
    u64::from(config.image_max_dim) * u64::from(config.image_max_dim) * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_feature_fails_closed() {
        #[cfg(not(feature = "provider-http"))]
        {
            let config = EmbeddingConfig::default();
            let result = fetch_image_bytes("https://example.com/a.png", &config).await;
            assert!(result.is_err());
        }
    }
}
