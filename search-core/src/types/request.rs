//! Inbound request type (spec §6).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::filters::Filters;

/// How the query should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Semantic,
    Fuzzy,
    Image,
}

impl Default for SearchType {
    fn default() -> Self {
        Self::Semantic
    }
}

/// An opaque, boundary-injected identifier for the caller, already
/// anonymized. Never constructed from a raw IP inside the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerFingerprint(pub String);

/// A search request as received from the (out-of-scope) transport layer,
/// already deserialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub filters: Filters,
    #[serde(default)]
    pub search_type: SearchType,
    pub similarity_threshold: Option<f32>,
    /// Required when `search_type == Image`.
    pub image_url: Option<String>,
    pub caller_fingerprint: CallerFingerprint,
    /// An opaque, client-rotated session identifier, distinct from
    /// `caller_fingerprint` (which is an anonymized caller IP/API key, not a
    /// session). Absent when the transport layer doesn't supply one.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_page() -> u32 {
    1
}
fn default_limit() -> u32 {
    25
}

/// Validated, normalized form of a [`SearchRequest`]: whitespace-collapsed
/// query, canonicalized filters, bounds-checked page/limit.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub query: String,
    pub page: u32,
    pub limit: u32,
    pub filters: Filters,
    pub search_type: SearchType,
    pub similarity_threshold: f32,
    pub image_url: Option<String>,
    pub caller_fingerprint: CallerFingerprint,
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
}

/// Normalize and validate a raw request (spec §4.5 step 1).
///
/// - trims and collapses internal whitespace in `query`
/// - rejects empty (post-normalization), too-long (>256 chars), or
///   control-character-containing queries
/// - rejects an inverted price range
/// - clamps `limit` into `[1, max_page_size]` is the *caller's* job to have
///   requested correctly: an out-of-range limit is `InvalidInput`, not
///   silently clamped, so the response's `pagination.limit` always reflects
///   what was actually served.
pub fn normalize_request(
    req: SearchRequest,
    default_similarity_threshold: f32,
    max_page_size: u32,
) -> Result<NormalizedRequest> {
    let collapsed = collapse_whitespace(&req.query);

    if collapsed.is_empty() {
        return Err(Error::InvalidInput("query must not be empty".into()));
    }
    if collapsed.chars().count() > 256 {
        return Err(Error::InvalidInput("query exceeds 256 characters".into()));
    }
    if collapsed.chars().any(|c| c.is_control()) {
        return Err(Error::InvalidInput(
            "query must not contain control characters".into(),
        ));
    }

    req.filters.validate()?;

    if req.page < 1 {
        return Err(Error::InvalidInput("page must be >= 1".into()));
    }
    if req.limit < 1 || req.limit > max_page_size {
        return Err(Error::InvalidInput(format!(
            "limit must be within 1..={max_page_size}"
        )));
    }
    if req.search_type == SearchType::Image && req.image_url.is_none() {
        return Err(Error::InvalidInput(
            "image_url is required for search_type = image".into(),
        ));
    }
    if let Some(t) = req.similarity_threshold {
        if !(0.0..=1.0).contains(&t) {
            return Err(Error::InvalidInput(
                "similarity_threshold must be within [0, 1]".into(),
            ));
        }
    }

    Ok(NormalizedRequest {
        query: collapsed,
        page: req.page,
        limit: req.limit,
        filters: req.filters.canonicalize(),
        search_type: req.search_type,
        similarity_threshold: req.similarity_threshold.unwrap_or(default_similarity_threshold),
        image_url: req.image_url,
        caller_fingerprint: req.caller_fingerprint,
        session_id: req.session_id,
        user_agent: req.user_agent.map(|ua| sanitize_user_agent(&ua)),
    })
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Strip control characters and cap length so an oversized or malformed
/// `User-Agent` header can never bloat a stored analytics event.
fn sanitize_user_agent(ua: &str) -> String {
    ua.chars().filter(|c| !c.is_control()).take(512).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            page: 1,
            limit: 25,
            filters: Filters::default(),
            search_type: SearchType::Semantic,
            similarity_threshold: None,
            image_url: None,
            caller_fingerprint: CallerFingerprint("anon-1".into()),
            session_id: None,
            user_agent: None,
        }
    }

    #[test]
    fn empty_query_after_normalization_is_rejected() {
        let req = base_request("   \t  ");
        assert!(matches!(
            normalize_request(req, 0.5, 100),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn whitespace_is_collapsed_and_lowercased() {
        let req = base_request("  Dark   BOOTS  ");
        let normalized = normalize_request(req, 0.5, 100).unwrap();
        assert_eq!(normalized.query, "dark boots");
    }

    #[test]
    fn control_characters_are_rejected() {
        let req = base_request("boots\u{0007}");
        assert!(normalize_request(req, 0.5, 100).is_err());
    }

    #[test]
    fn oversized_query_is_rejected() {
        let req = base_request(&"a".repeat(300));
        assert!(normalize_request(req, 0.5, 100).is_err());
    }

    #[test]
    fn image_search_without_url_is_rejected() {
        let mut req = base_request("shoes");
        req.search_type = SearchType::Image;
        assert!(normalize_request(req, 0.5, 100).is_err());
    }

    #[test]
    fn limit_outside_bounds_is_rejected() {
        let mut req = base_request("shoes");
        req.limit = 0;
        assert!(normalize_request(req, 0.5, 100).is_err());

        let mut req = base_request("shoes");
        req.limit = 500;
        assert!(normalize_request(req, 0.5, 100).is_err());
    }

    #[test]
    fn default_similarity_threshold_is_applied() {
        let req = base_request("shoes");
        let normalized = normalize_request(req, 0.42, 100).unwrap();
        assert_eq!(normalized.similarity_threshold, 0.42);
    }
}
