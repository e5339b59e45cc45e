//! Text/image embedding weight resolution (spec C1, C2).
//!
//! Grounded on the resolved Open Question in `SPEC_FULL.md`: a store-specific
//! weight pair beats a category-default pair, which beats the hardcoded
//! fallback (`original_source/ai_shopify_search/core/embeddings.py::combine_embeddings`).

use crate::types::config::EmbeddingConfig;

/// Default weights used when neither a store-specific nor a category-default
/// weight pair is configured.
pub const DEFAULT_TEXT_WEIGHT: f32 = 0.7;
pub const DEFAULT_IMAGE_WEIGHT: f32 = 0.3;

/// Resolve `(text_weight, image_weight)` for a product, preferring a
/// store-specific override over the category default over the hardcoded
/// fallback.
#[must_use]
pub fn resolve_weights(
    config: &EmbeddingConfig,
    store_id: Option<&str>,
    product_type: Option<&str>,
) -> (f32, f32) {
    if let Some(store_id) = store_id {
        let store_key = format!("store:{store_id}");
        if let Some(&w) = config.text_weight_by_category.get(&store_key) {
            let iw = config
                .image_weight_by_category
                .get(&store_key)
                .copied()
                .unwrap_or(1.0 - w);
            return (w, iw);
        }
    }

    if let Some(category) = product_type {
        if let Some(&w) = config.text_weight_by_category.get(category) {
            let iw = config
                .image_weight_by_category
                .get(category)
                .copied()
                .unwrap_or(1.0 - w);
            return (w, iw);
        }
    }

    (DEFAULT_TEXT_WEIGHT, DEFAULT_IMAGE_WEIGHT)
}
