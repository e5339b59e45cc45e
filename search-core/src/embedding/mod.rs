//! Embedding generation: the caching/retrying client and weight resolution
//! used to combine text and image embeddings (spec C1).

pub mod client;
pub mod image_fetch;
#[cfg(feature = "provider-http")]
pub mod provider;
pub mod weights;

pub use client::EmbeddingClient;
pub use image_fetch::fetch_image_bytes;
#[cfg(feature = "provider-http")]
pub use provider::{embed_image_url, HttpEmbeddingProvider};
pub use weights::{resolve_weights, DEFAULT_IMAGE_WEIGHT, DEFAULT_TEXT_WEIGHT};
