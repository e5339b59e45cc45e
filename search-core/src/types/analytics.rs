//! Analytics event and rollup types (spec C6, C9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::filters::Filters;
use crate::types::request::SearchType;

/// A single recorded search event, emitted after a response is served.
///
/// Idempotency key is `(session_id, timestamp, query_hash)` (spec C6); the
/// analytics store is responsible for enforcing it, not this type.
///
/// `session_id` is an opaque, client-rotated identifier; `caller_ip` is a
/// separately-sourced, anonymized caller identity. The two must never be
/// conflated (spec §3/§4.6 privacy contract) — a session id rotates far more
/// often than the caller behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub event_id: Uuid,
    pub session_id: String,
    pub caller_ip: String,
    pub query: String,
    pub query_hash: String,
    pub search_type: SearchType,
    pub filters: Filters,
    pub page: u32,
    pub limit: u32,
    pub user_agent: Option<String>,
    pub result_count: usize,
    pub cache_hit: bool,
    pub applied_strategies: Vec<String>,
    pub latency_ms: u64,
    pub clicked_external_id: Option<String>,
    /// Top-ranked category facet of the served response, if any (spec C9
    /// step 2's per-category baseline grouping key).
    pub category: Option<String>,
    /// `Intent::as_str()` of the request's C8 classification.
    pub primary_intent: String,
    pub avg_similarity: f64,
    pub timestamp: DateTime<Utc>,
}

/// A query and how often it was seen in an analytics window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopularQuery {
    pub query: String,
    pub count: u64,
    pub avg_result_count: f64,
}

/// Usage counter for a single facet value within a window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetUsage {
    pub dimension: String,
    pub value: String,
    pub selected_count: u64,
}

/// Daily rollup of serving performance, as mined by C9's baseline job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPerformance {
    pub date: DateTime<Utc>,
    pub query_count: u64,
    pub avg_latency_ms: f64,
    pub cache_hit_rate: f64,
    pub zero_result_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analytics_event_round_trips_through_json() {
        let e = AnalyticsEvent {
            event_id: Uuid::nil(),
            session_id: "s-1".into(),
            caller_ip: "anon-1".into(),
            query: "boots".into(),
            query_hash: "abc".into(),
            search_type: SearchType::Semantic,
            filters: Filters::default(),
            page: 1,
            limit: 25,
            user_agent: None,
            result_count: 10,
            cache_hit: false,
            applied_strategies: vec![],
            latency_ms: 42,
            clicked_external_id: None,
            category: None,
            primary_intent: "other".into(),
            avg_similarity: 0.0,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: AnalyticsEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.session_id, "s-1");
    }
}
