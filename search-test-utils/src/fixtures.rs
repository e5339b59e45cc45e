//! Builder functions for domain types, grounded on the teacher's
//! `create_test_episode`/`create_test_pattern` style (`test-utils/src/lib.rs`).

use std::collections::BTreeMap;

use search_core::types::product::{AttributeValue, ProductStatus, StockStatus};
use search_core::types::{Filters, Product};

/// A minimal product with a unit-vector embedding, keyed by `external_id`.
///
/// `embedding_hot_index` picks which dimension of a small `dim`-length
/// one-hot vector is `1.0`, so callers can build products with deliberately
/// similar or dissimilar embeddings for retrieval tests.
#[must_use]
pub fn test_product(external_id: &str, title: &str, price: f64, embedding_hot_index: usize) -> Product {
    let dim = (embedding_hot_index + 1).max(4);
    let mut embedding = vec![0.0f32; dim];
    embedding[embedding_hot_index] = 1.0;

    Product {
        external_id: external_id.to_string(),
        internal_id: 0,
        store_id: None,
        title: title.to_string(),
        description: None,
        vendor: Some("acme".into()),
        product_type: Some("footwear".into()),
        price,
        tags: vec!["test".into()],
        seo_title: None,
        seo_description: None,
        attributes: BTreeMap::from([("color".to_string(), AttributeValue::Text("black".into()))]),
        stock_status: StockStatus::InStock,
        sku: None,
        barcode: None,
        status: ProductStatus::Active,
        image_url: None,
        text_embedding: embedding.clone(),
        image_embedding: None,
        combined_embedding: embedding,
    }
}

/// An empty, always-valid filter set.
#[must_use]
pub fn test_filters() -> Filters {
    Filters::default()
}
