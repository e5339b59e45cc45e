//! Learned performance baseline (spec C9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a [`Baseline`]'s `group` key names: a product category, or a C8
/// query intent (spec C9 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineScope {
    Category,
    Intent,
}

impl BaselineScope {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Intent => "intent",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "category" => Some(Self::Category),
            "intent" => Some(Self::Intent),
            _ => None,
        }
    }
}

/// How a baseline's `avg_score` moved relative to the previous baseline in
/// the same (scope, store, group).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// No previous baseline existed for this group: first computation.
    Regenerated,
    Improving,
    Declining,
    Stable,
}

impl Trend {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regenerated => "regenerated",
            Self::Improving => "improving",
            Self::Declining => "declining",
            Self::Stable => "stable",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "regenerated" => Some(Self::Regenerated),
            "improving" => Some(Self::Improving),
            "declining" => Some(Self::Declining),
            "stable" => Some(Self::Stable),
            _ => None,
        }
    }
}

/// A rolling baseline of "normal" serving performance, recomputed by C9's
/// offline job as a pure function of an analytics window and the previous
/// baseline (never reads wall-clock time mid-computation), scoped to one
/// (store, category) or (store, intent) group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub scope: BaselineScope,
    pub store_id: Option<String>,
    pub group: String,
    pub computed_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: f64,
    pub cache_hit_rate: f64,
    pub zero_result_rate: f64,
    pub avg_result_count: f64,
    pub avg_score: f64,
    pub success_rate: f64,
    pub trend: Trend,
    pub sample_size: u64,
}

impl Baseline {
    /// A conservative all-zero baseline used before the first computation
    /// for a group.
    #[must_use]
    pub fn empty(now: DateTime<Utc>, scope: BaselineScope, store_id: Option<String>, group: String) -> Self {
        Self {
            scope,
            store_id,
            group,
            computed_at: now,
            window_start: now,
            window_end: now,
            avg_latency_ms: 0.0,
            p95_latency_ms: 0.0,
            cache_hit_rate: 0.0,
            zero_result_rate: 0.0,
            avg_result_count: 0.0,
            avg_score: 0.0,
            success_rate: 0.0,
            trend: Trend::Regenerated,
            sample_size: 0,
        }
    }

    /// Whether `latency_ms` is anomalous relative to this baseline, flagged
    /// when it exceeds `p95_latency_ms` by more than `factor` (e.g. `2.0`
    /// means "twice the learned p95").
    #[must_use]
    pub fn is_latency_anomalous(&self, latency_ms: f64, factor: f64) -> bool {
        self.sample_size > 0 && latency_ms > self.p95_latency_ms * factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_baseline_never_flags_anomalies() {
        let b = Baseline::empty(DateTime::<Utc>::UNIX_EPOCH, BaselineScope::Category, None, "boots".into());
        assert!(!b.is_latency_anomalous(100_000.0, 2.0));
    }

    #[test]
    fn latency_over_threshold_is_anomalous() {
        let mut b = Baseline::empty(DateTime::<Utc>::UNIX_EPOCH, BaselineScope::Category, None, "boots".into());
        b.sample_size = 100;
        b.p95_latency_ms = 50.0;
        assert!(b.is_latency_anomalous(150.0, 2.0));
        assert!(!b.is_latency_anomalous(90.0, 2.0));
    }
}
