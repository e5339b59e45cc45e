//! Offline baseline computation and pattern mining (spec C9).
//!
//! Every function here is a pure function of an analytics window and,
//! where relevant, the previous baseline: no wall-clock reads mid-
//! computation, so two runs over the same window produce equal output
//! (spec §8 property 9, idempotence).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::analytics::AnalyticsEvent;
use crate::types::baseline::{Baseline, BaselineScope, Trend};
use crate::types::pattern::LearnedPattern;
use crate::types::strategy::StrategyKind;

/// The (store, group) key an event belongs to under a given
/// [`BaselineScope`]. `None` when the event carries no value for that scope
/// (e.g. `Category` scope on an event whose response had no category facet).
#[must_use]
pub fn group_key(event: &AnalyticsEvent, scope: BaselineScope) -> Option<(Option<String>, String)> {
    match scope {
        BaselineScope::Category => event
            .category
            .clone()
            .map(|c| (event.filters.store_scope.clone(), c)),
        BaselineScope::Intent => Some((event.filters.store_scope.clone(), event.primary_intent.clone())),
    }
}

/// Partition `events` by their (store, group) key under `scope`, in a
/// deterministic (`BTreeMap`) order so repeated runs iterate groups the same
/// way.
#[must_use]
pub fn group_events(
    events: &[AnalyticsEvent],
    scope: BaselineScope,
) -> BTreeMap<(Option<String>, String), Vec<&AnalyticsEvent>> {
    let mut groups: BTreeMap<(Option<String>, String), Vec<&AnalyticsEvent>> = BTreeMap::new();
    for event in events {
        if let Some(key) = group_key(event, scope) {
            groups.entry(key).or_default().push(event);
        }
    }
    groups
}

/// Compute a single group's baseline as a pure function of its event slice
/// and the group's previous baseline. Returns `None` below
/// `min_events_per_group` (spec C9 step 2, `baseline.min_events_per_group`).
#[must_use]
pub fn compute_baseline(
    events: &[&AnalyticsEvent],
    scope: BaselineScope,
    store_id: Option<String>,
    group: String,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    computed_at: DateTime<Utc>,
    min_events_per_group: u64,
    previous: Option<&Baseline>,
    trend_threshold: f64,
) -> Option<Baseline> {
    let sample_size = events.len() as u64;
    if sample_size < min_events_per_group {
        return None;
    }

    let total = events.len() as f64;
    let avg_latency_ms = events.iter().map(|e| e.latency_ms as f64).sum::<f64>() / total;
    let cache_hit_rate = events.iter().filter(|e| e.cache_hit).count() as f64 / total;
    let zero_result_rate = events.iter().filter(|e| e.result_count == 0).count() as f64 / total;
    let avg_result_count = events.iter().map(|e| e.result_count as f64).sum::<f64>() / total;
    let avg_score = events.iter().map(|e| e.avg_similarity).sum::<f64>() / total;
    let success_rate = events.iter().filter(|e| e.result_count > 0).count() as f64 / total;

    let mut sorted_latencies: Vec<f64> = events.iter().map(|e| e.latency_ms as f64).collect();
    sorted_latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let p95_latency_ms = percentile(&sorted_latencies, 0.95);

    let trend = match previous {
        None => Trend::Regenerated,
        Some(prev) => {
            let delta = avg_score - prev.avg_score;
            if delta > trend_threshold {
                Trend::Improving
            } else if delta < -trend_threshold {
                Trend::Declining
            } else {
                Trend::Stable
            }
        }
    };

    Some(Baseline {
        scope,
        store_id,
        group,
        computed_at,
        window_start,
        window_end,
        avg_latency_ms,
        p95_latency_ms,
        cache_hit_rate,
        zero_result_rate,
        avg_result_count,
        avg_score,
        success_rate,
        trend,
        sample_size,
    })
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// A query seen often enough, with a high enough success rate, to mine as a
/// reusable [`LearnedPattern`] (spec C9 step 4).
#[derive(Debug, Clone)]
pub struct MineCandidate {
    pub query_template: String,
    pub count: u64,
    pub avg_similarity: f64,
    pub suggested_strategy: StrategyKind,
}

/// Mine successful query patterns from candidates whose average similarity
/// and occurrence both clear their thresholds.
#[must_use]
pub fn mine_patterns(
    candidates: &[MineCandidate],
    min_similarity: f64,
    min_count: u64,
    observed_at: DateTime<Utc>,
) -> Vec<LearnedPattern> {
    candidates
        .iter()
        .filter(|c| c.avg_similarity >= min_similarity && c.count >= min_count)
        .map(|c| LearnedPattern {
            pattern_id: Uuid::nil(),
            query_template: c.query_template.clone(),
            suggested_strategy: c.suggested_strategy.as_str().to_string(),
            success_count: c.count,
            failure_count: 0,
            last_seen: observed_at,
            last_applied: None,
        })
        .collect()
}

/// A failing-category signal (spec C9 step 5).
#[derive(Debug, Clone)]
pub struct FailingCategory {
    pub category: String,
    pub avg_score: f64,
}

/// Suggestion type, closed per spec §9's "string-typed category" guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionType {
    SynonymExpansion,
    CachingOptimization,
    QueryRefinement,
}

/// A mined improvement suggestion for operator review.
#[derive(Debug, Clone)]
pub struct PatternSuggestion {
    pub suggestion_type: SuggestionType,
    pub target_category: String,
    pub expected_improvement: f64,
    pub confidence: f64,
    pub priority: u8,
}

/// Emit suggestions for categories whose average score is below
/// `failing_threshold` (spec C9 step 5).
#[must_use]
pub fn suggest_improvements(failing: &[FailingCategory], failing_threshold: f64) -> Vec<PatternSuggestion> {
    failing
        .iter()
        .filter(|f| f.avg_score < failing_threshold)
        .map(|f| {
            let deficit = failing_threshold - f.avg_score;
            PatternSuggestion {
                suggestion_type: if deficit > 0.3 {
                    SuggestionType::SynonymExpansion
                } else if deficit > 0.15 {
                    SuggestionType::QueryRefinement
                } else {
                    SuggestionType::CachingOptimization
                },
                target_category: f.category.clone(),
                expected_improvement: deficit,
                confidence: (1.0 - f.avg_score).clamp(0.0, 1.0),
                priority: if deficit > 0.3 { 1 } else { 2 },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn event(latency_ms: u64) -> AnalyticsEvent {
        AnalyticsEvent {
            event_id: Uuid::nil(),
            session_id: "sess-1".into(),
            caller_ip: "anon-1".into(),
            query: "boots".into(),
            query_hash: "abc".into(),
            search_type: crate::types::request::SearchType::Semantic,
            filters: crate::types::filters::Filters::default(),
            page: 1,
            limit: 25,
            user_agent: None,
            result_count: 5,
            cache_hit: false,
            applied_strategies: vec![],
            latency_ms,
            clicked_external_id: None,
            category: Some("boots".into()),
            primary_intent: "category".into(),
            avg_similarity: 0.7,
            timestamp: epoch(),
        }
    }

    #[test]
    fn below_threshold_group_yields_no_baseline() {
        let events = vec![event(100)];
        let refs: Vec<&AnalyticsEvent> = events.iter().collect();
        let baseline = compute_baseline(
            &refs, BaselineScope::Category, None, "boots".into(), epoch(), epoch(), epoch(), 30, None, 0.05,
        );
        assert!(baseline.is_none());
    }

    #[test]
    fn baseline_computation_is_idempotent() {
        let events: Vec<AnalyticsEvent> = (0..40).map(|i| event(100 + i)).collect();
        let refs: Vec<&AnalyticsEvent> = events.iter().collect();
        let b1 = compute_baseline(
            &refs, BaselineScope::Category, None, "boots".into(), epoch(), epoch(), epoch(), 30, None, 0.05,
        )
        .unwrap();
        let b2 = compute_baseline(
            &refs, BaselineScope::Category, None, "boots".into(), epoch(), epoch(), epoch(), 30, None, 0.05,
        )
        .unwrap();
        assert!((b1.avg_latency_ms - b2.avg_latency_ms).abs() < f64::EPSILON);
        assert_eq!(b1.sample_size, b2.sample_size);
    }

    #[test]
    fn trend_is_improving_when_score_rises_past_threshold() {
        let events: Vec<AnalyticsEvent> = (0..40).map(|i| event(100 + i)).collect();
        let refs: Vec<&AnalyticsEvent> = events.iter().collect();
        let mut previous = Baseline::empty(epoch(), BaselineScope::Category, None, "boots".into());
        previous.avg_score = 0.3;
        let baseline = compute_baseline(
            &refs, BaselineScope::Category, None, "boots".into(), epoch(), epoch(), epoch(), 30,
            Some(&previous), 0.05,
        )
        .unwrap();
        assert_eq!(baseline.trend, Trend::Improving);
    }

    #[test]
    fn mine_patterns_filters_by_similarity_and_count() {
        let candidates = vec![
            MineCandidate {
                query_template: "boots".into(),
                count: 100,
                avg_similarity: 0.85,
                suggested_strategy: StrategyKind::CategoryBroaden,
            },
            MineCandidate {
                query_template: "rare item".into(),
                count: 2,
                avg_similarity: 0.9,
                suggested_strategy: StrategyKind::CategoryBroaden,
            },
        ];
        let patterns = mine_patterns(&candidates, 0.8, 10, epoch());
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].query_template, "boots");
    }

    #[test]
    fn suggest_improvements_escalates_type_with_deficit() {
        let failing = vec![FailingCategory {
            category: "tiaras".into(),
            avg_score: 0.2,
        }];
        let suggestions = suggest_improvements(&failing, 0.6);
        assert_eq!(suggestions[0].suggestion_type, SuggestionType::SynonymExpansion);
    }
}
