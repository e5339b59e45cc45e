//! The `Product` value type (spec §3) and its embedding invariants.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Embedding dimensionality fixed at configuration time (spec §4.1).
pub const EMBEDDING_DIM: usize = 1536;

/// Maximum allowed drift from unit norm for the combined embedding
/// (spec §3 invariant: "unit-norm within 1e-6").
pub const UNIT_NORM_EPSILON: f32 = 1e-6;

/// A small JSON-like value used in a product's attribute bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A short string (size, color name, material name, ...).
    Text(String),
    /// A numeric attribute (weight, a dimension in cm, ...).
    Number(f64),
    /// A boolean flag.
    Bool(bool),
    /// A list of short strings (e.g. available sizes).
    List(Vec<String>),
}

/// Stock status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    /// Available.
    InStock,
    /// Temporarily unavailable.
    OutOfStock,
    /// Can be ordered but is not currently held in inventory.
    Backorder,
}

/// Publication status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    /// Visible to search.
    Active,
    /// Hidden from search but retained for history/analytics.
    Draft,
    /// Soft-removed; the ingestion collaborator owns hard deletion.
    Archived,
}

/// A catalog item, as persisted by the Vector Store Gateway (C2).
///
/// `Product` is a plain value type with no reference to any storage crate —
/// the persistence layer depends on this type, never the reverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// External catalog id, unique, supplied by the ingestion collaborator.
    pub external_id: String,
    /// Internal monotonic id, assigned by the vector store on first upsert.
    pub internal_id: i64,
    /// Store scope; `None` means the product is globally visible.
    pub store_id: Option<String>,

    pub title: String,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub price: f64,
    pub tags: Vec<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub stock_status: StockStatus,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub status: ProductStatus,
    pub image_url: Option<String>,

    /// Unit-normalized text embedding.
    pub text_embedding: Vec<f32>,
    /// Unit-normalized image embedding, if one was computed.
    pub image_embedding: Option<Vec<f32>>,
    /// Category-weighted convex combination of text and image embeddings,
    /// re-normalized to unit length. This is the vector used for retrieval.
    pub combined_embedding: Vec<f32>,
}

impl Product {
    /// Deduplicate tags in place, preserving first-seen order.
    pub fn dedupe_tags(&mut self) {
        let mut seen = std::collections::HashSet::with_capacity(self.tags.len());
        self.tags.retain(|t| seen.insert(t.clone()));
    }

    /// True if `combined_embedding` is within [`UNIT_NORM_EPSILON`] of unit
    /// norm and, when no image embedding is present, equals the text
    /// embedding (spec §3 invariants).
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        if self.tags.len()
            != self
                .tags
                .iter()
                .collect::<std::collections::HashSet<_>>()
                .len()
        {
            return false;
        }

        let norm = l2_norm(&self.combined_embedding);
        if (norm - 1.0).abs() > UNIT_NORM_EPSILON {
            return false;
        }

        if self.image_embedding.is_none() && self.combined_embedding != self.text_embedding {
            return false;
        }

        true
    }
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Combine a text and an optional image embedding into a unit-normalized
/// combined embedding, using `text_weight`/`image_weight` (spec §4.1,
/// `original_source/ai_shopify_search/core/embeddings.py::combine_embeddings`).
///
/// Weights need not already sum to 1; the result is re-normalized.
#[must_use]
pub fn combine_embeddings(
    text: &[f32],
    image: Option<&[f32]>,
    text_weight: f32,
    image_weight: f32,
) -> Vec<f32> {
    let Some(image) = image else {
        return text.to_vec();
    };

    let mut combined: Vec<f32> = text
        .iter()
        .zip(image.iter())
        .map(|(t, i)| t * text_weight + i * image_weight)
        .collect();

    let norm = l2_norm(&combined);
    if norm > f32::EPSILON {
        for x in &mut combined {
            *x /= norm;
        }
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_vec(dim: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[hot] = 1.0;
        v
    }

    #[test]
    fn combine_with_no_image_returns_text_unchanged() {
        let text = unit_vec(4, 0);
        let combined = combine_embeddings(&text, None, 0.7, 0.3);
        assert_eq!(combined, text);
    }

    #[test]
    fn combine_is_unit_norm() {
        let text = unit_vec(4, 0);
        let image = unit_vec(4, 1);
        let combined = combine_embeddings(&text, Some(&image), 0.7, 0.3);
        let norm = l2_norm(&combined);
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn dedupe_tags_preserves_first_seen_order() {
        let mut p = sample_product();
        p.tags = vec!["red".into(), "blue".into(), "red".into()];
        p.dedupe_tags();
        assert_eq!(p.tags, vec!["red".to_string(), "blue".to_string()]);
    }

    #[test]
    fn invariants_hold_for_text_only_product() {
        let p = sample_product();
        assert!(p.invariants_hold());
    }

    fn sample_product() -> Product {
        Product {
            external_id: "ext-1".into(),
            internal_id: 1,
            store_id: None,
            title: "black leather boots".into(),
            description: None,
            vendor: None,
            product_type: None,
            price: 59.0,
            tags: vec!["boots".into()],
            seo_title: None,
            seo_description: None,
            attributes: BTreeMap::new(),
            stock_status: StockStatus::InStock,
            sku: None,
            barcode: None,
            status: ProductStatus::Active,
            image_url: None,
            text_embedding: unit_vec(4, 0),
            image_embedding: None,
            combined_embedding: unit_vec(4, 0),
        }
    }
}
