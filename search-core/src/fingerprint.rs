//! Query fingerprinting for cache keys and single-flight coalescing.
//!
//! A [`Fingerprint`] is a stable hash over the canonicalized, order-independent
//! shape of `(query, filters, page, limit, search_type)` (spec §4.3, §4.5
//! step 2). Two logically identical requests always hash to the same value
//! regardless of JSON field order or filter construction order.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::filters::Filters;
use crate::types::request::SearchType;

/// A 128-bit digest identifying a normalized search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    /// Compute the fingerprint of a normalized request's cacheable shape.
    #[must_use]
    pub fn compute(
        query: &str,
        filters: &Filters,
        page: u32,
        limit: u32,
        search_type: SearchType,
    ) -> Self {
        #[derive(Serialize)]
        struct Canonical<'a> {
            query: &'a str,
            filters: Filters,
            page: u32,
            limit: u32,
            search_type: SearchType,
        }

        let canonical = Canonical {
            query,
            filters: filters.canonicalize(),
            page,
            limit,
            search_type,
        };

        // serde_json with a struct (not a map) preserves declared field
        // order, so this is stable across process runs and platforms.
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        let digest = Sha256::digest(&bytes);
        let mut out = [0u8; 16];
        out.copy_from_slice(&digest[..16]);
        Self(out)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_requests_fingerprint_identically() {
        let f1 = Fingerprint::compute("boots", &Filters::default(), 1, 25, SearchType::Semantic);
        let f2 = Fingerprint::compute("boots", &Filters::default(), 1, 25, SearchType::Semantic);
        assert_eq!(f1, f2);
    }

    #[test]
    fn differing_filters_change_fingerprint() {
        let f1 = Fingerprint::compute("boots", &Filters::default(), 1, 25, SearchType::Semantic);
        let filters2 = Filters {
            min_price: Some(10.0),
            ..Default::default()
        };
        let f2 = Fingerprint::compute("boots", &filters2, 1, 25, SearchType::Semantic);
        assert_ne!(f1, f2);
    }

    #[test]
    fn store_scope_case_is_normalized_before_hashing() {
        let filters_upper = Filters {
            store_scope: Some("ACME".into()),
            ..Default::default()
        };
        let filters_lower = Filters {
            store_scope: Some("acme".into()),
            ..Default::default()
        };
        let f1 = Fingerprint::compute("boots", &filters_upper, 1, 25, SearchType::Semantic);
        let f2 = Fingerprint::compute("boots", &filters_lower, 1, 25, SearchType::Semantic);
        assert_eq!(f1, f2);
    }

    #[test]
    fn different_page_changes_fingerprint() {
        let f1 = Fingerprint::compute("boots", &Filters::default(), 1, 25, SearchType::Semantic);
        let f2 = Fingerprint::compute("boots", &Filters::default(), 2, 25, SearchType::Semantic);
        assert_ne!(f1, f2);
    }
}
