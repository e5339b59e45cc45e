//! Faceted count derivation over a result set (spec C11).
//!
//! Pure and cache-friendly: given the products in a result set, produce
//! per-dimension top-K counts. Takes no dependency on the storage layer.

use std::collections::HashMap;

use crate::store::ScoredProduct;
use crate::types::product::AttributeValue;
use crate::types::response::{FacetMetadata, FacetValue, Facets};

const TOP_K: usize = 10;
const PRICE_BUCKETS: &[(f64, f64, &str)] = &[
    (0.0, 25.0, "0-25"),
    (25.0, 50.0, "25-50"),
    (50.0, 100.0, "50-100"),
    (100.0, 250.0, "100-250"),
    (250.0, f64::MAX, "250+"),
];

fn price_bucket(price: f64) -> &'static str {
    PRICE_BUCKETS
        .iter()
        .find(|(lo, hi, _)| price >= *lo && price < *hi)
        .map_or("unknown", |(_, _, label)| *label)
}

fn attribute_as_strings(value: &AttributeValue) -> Vec<String> {
    match value {
        AttributeValue::Text(s) => vec![s.clone()],
        AttributeValue::List(items) => items.clone(),
        AttributeValue::Number(_) | AttributeValue::Bool(_) => vec![],
    }
}

fn top_k(counts: HashMap<String, u64>) -> Vec<FacetValue> {
    let mut values: Vec<FacetValue> = counts
        .into_iter()
        .map(|(value, count)| FacetValue { value, count })
        .collect();
    values.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    values.truncate(TOP_K);
    values
}

fn count_dimension(results: &[ScoredProduct], key: &str) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for r in results {
        if let Some(value) = r.product.attributes.get(key) {
            for v in attribute_as_strings(value) {
                *counts.entry(v).or_insert(0u64) += 1;
            }
        }
    }
    counts
}

fn count_tags(results: &[ScoredProduct], covered_dimensions: &[&str]) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for r in results {
        for tag in &r.product.tags {
            if !covered_dimensions.contains(&tag.as_str()) {
                *counts.entry(tag.clone()).or_insert(0u64) += 1;
            }
        }
    }
    counts
}

/// Build facets over a final result set.
#[must_use]
pub fn build_facets(results: &[ScoredProduct]) -> Facets {
    let mut brand_counts = HashMap::new();
    let mut category_counts = HashMap::new();
    let mut price_counts = HashMap::new();

    for r in results {
        if let Some(vendor) = &r.product.vendor {
            *brand_counts.entry(vendor.clone()).or_insert(0u64) += 1;
        }
        if let Some(pt) = &r.product.product_type {
            *category_counts.entry(pt.clone()).or_insert(0u64) += 1;
        }
        *price_counts
            .entry(price_bucket(r.product.price).to_string())
            .or_insert(0u64) += 1;
    }

    let dimensions = ["color", "material", "size", "season", "style"];
    let color = top_k(count_dimension(results, "color"));
    let material = top_k(count_dimension(results, "material"));
    let size = top_k(count_dimension(results, "size"));
    let season = top_k(count_dimension(results, "season"));
    let style = top_k(count_dimension(results, "style"));
    let tag = top_k(count_tags(results, &dimensions));

    Facets {
        color,
        material,
        size,
        brand: top_k(brand_counts),
        category: top_k(category_counts),
        season,
        style,
        price_range: top_k(price_counts),
        tag,
        metadata: Some(FacetMetadata {
            total_products: results.len() as u64,
            facet_count: 8,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::product::{ProductStatus, StockStatus};
    use std::collections::BTreeMap;

    fn product(price: f64, vendor: &str, color: &str) -> ScoredProduct {
        let mut attributes = BTreeMap::new();
        attributes.insert("color".to_string(), AttributeValue::Text(color.to_string()));
        ScoredProduct {
            product: crate::types::product::Product {
                external_id: "e".into(),
                internal_id: 1,
                store_id: None,
                title: "t".into(),
                description: None,
                vendor: Some(vendor.to_string()),
                product_type: Some("boots".into()),
                price,
                tags: vec!["clearance".into()],
                seo_title: None,
                seo_description: None,
                attributes,
                stock_status: StockStatus::InStock,
                sku: None,
                barcode: None,
                status: ProductStatus::Active,
                image_url: None,
                text_embedding: vec![1.0],
                image_embedding: None,
                combined_embedding: vec![1.0],
            },
            similarity: 0.9,
        }
    }

    #[test]
    fn facets_count_vendor_and_color() {
        let results = vec![product(10.0, "acme", "red"), product(20.0, "acme", "blue")];
        let facets = build_facets(&results);
        assert_eq!(facets.brand[0].value, "acme");
        assert_eq!(facets.brand[0].count, 2);
        assert_eq!(facets.color.len(), 2);
    }

    #[test]
    fn price_bucket_assigns_correct_range() {
        assert_eq!(price_bucket(10.0), "0-25");
        assert_eq!(price_bucket(300.0), "250+");
    }

    #[test]
    fn tags_exclude_dimensions_already_covered() {
        let results = vec![product(10.0, "acme", "red")];
        let facets = build_facets(&results);
        assert!(facets.tag.iter().any(|f| f.value == "clearance"));
        assert!(!facets.tag.iter().any(|f| f.value == "red"));
    }
}
