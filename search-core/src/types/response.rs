//! Outbound response type (spec §6).

use serde::{Deserialize, Serialize};

use crate::types::request::SearchType;

/// A single item in the returned result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultItem {
    pub external_id: String,
    pub internal_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub tags: Vec<String>,
    pub similarity: f32,
    pub search_type: SearchType,
}

/// Pagination state for a response.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    #[must_use]
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        let pages = if limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(limit))
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

/// Filters actually applied to the search (echoed back for caller clarity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedFilters {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub store_scope: Option<String>,
    pub similarity_threshold: f32,
}

/// A (value, count) pair for a facet dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetValue {
    pub value: String,
    pub count: u64,
}

/// Facet metadata echoed at the end of the facets block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetMetadata {
    pub total_products: u64,
    pub facet_count: usize,
}

/// Faceted counts derived from the final result set (C11).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Facets {
    pub color: Vec<FacetValue>,
    pub material: Vec<FacetValue>,
    pub size: Vec<FacetValue>,
    pub brand: Vec<FacetValue>,
    pub category: Vec<FacetValue>,
    pub season: Vec<FacetValue>,
    pub style: Vec<FacetValue>,
    pub price_range: Vec<FacetValue>,
    pub tag: Vec<FacetValue>,
    pub metadata: Option<FacetMetadata>,
}

/// Response-level metadata describing how the result was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub cache_hit: bool,
    pub fallback_used: bool,
    pub applied_strategies: Vec<String>,
    pub search_type: SearchType,
    pub result_count: usize,
}

/// The full response returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<ResultItem>,
    pub pagination: Pagination,
    pub filters: AppliedFilters,
    pub facets: Facets,
    pub metadata: ResponseMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_computes_page_count() {
        let p = Pagination::new(1, 25, 60);
        assert_eq!(p.pages, 3);
    }

    #[test]
    fn pagination_handles_exact_multiple() {
        let p = Pagination::new(1, 25, 50);
        assert_eq!(p.pages, 2);
    }

    #[test]
    fn pagination_handles_zero_total() {
        let p = Pagination::new(1, 25, 0);
        assert_eq!(p.pages, 0);
    }
}
