//! The declarative strategy table consulted by the adaptive filter engine.
//!
//! Strategies are data, not code (spec C7 closing note), so an operator can
//! reprioritize or disable one without touching [`super::engine`].

use parking_lot::RwLock;

use crate::adaptive::metrics::Issue;
use crate::types::strategy::StrategyKind;

/// A strategy's mutable runtime statistics (success rate, usage count).
#[derive(Debug, Clone, Copy)]
pub struct StrategyStats {
    pub success_rate: f64,
    pub usage_count: u64,
}

impl Default for StrategyStats {
    fn default() -> Self {
        Self {
            success_rate: 0.5,
            usage_count: 0,
        }
    }
}

/// One row of the declarative strategy table.
pub struct FilterStrategyRecord {
    pub kind: StrategyKind,
    pub priority: u8,
    pub triggers: &'static [Issue],
    stats: RwLock<StrategyStats>,
}

impl FilterStrategyRecord {
    #[must_use]
    pub fn new(kind: StrategyKind, priority: u8, triggers: &'static [Issue]) -> Self {
        Self {
            kind,
            priority,
            triggers,
            stats: RwLock::new(StrategyStats::default()),
        }
    }

    #[must_use]
    pub fn triggered_by(&self, issues: &[Issue]) -> bool {
        self.triggers.iter().any(|t| issues.contains(t))
    }

    #[must_use]
    pub fn stats(&self) -> StrategyStats {
        *self.stats.read()
    }

    /// Update the moving-average success rate after applying this strategy
    /// (spec C7 step 6). `alpha` controls how quickly the average adapts.
    pub fn record_outcome(&self, improved: bool, alpha: f64) {
        let mut stats = self.stats.write();
        let sample = if improved { 1.0 } else { 0.0 };
        stats.success_rate = stats.success_rate * (1.0 - alpha) + sample * alpha;
        stats.usage_count += 1;
    }
}

/// Build the standard strategy table, grounded on
/// `original_source/ai_shopify_search/features/adaptive_filters.py`'s
/// concrete `FilterStrategy` instances.
#[must_use]
pub fn default_strategies() -> Vec<FilterStrategyRecord> {
    vec![
        FilterStrategyRecord::new(
            StrategyKind::PriceBroadenLow,
            1,
            &[Issue::InsufficientResults, Issue::PriceMismatch],
        ),
        FilterStrategyRecord::new(
            StrategyKind::PriceBroadenHigh,
            2,
            &[Issue::InsufficientResults, Issue::PriceMismatch],
        ),
        FilterStrategyRecord::new(
            StrategyKind::CategoryBroaden,
            3,
            &[Issue::InsufficientResults, Issue::LowCategoryCoverage],
        ),
        FilterStrategyRecord::new(StrategyKind::DiversityImprove, 4, &[Issue::LowDiversity]),
        FilterStrategyRecord::new(
            StrategyKind::MaterialFallback,
            5,
            &[Issue::LowRelevance, Issue::InsufficientResults],
        ),
        FilterStrategyRecord::new(
            StrategyKind::ColorFallback,
            6,
            &[Issue::LowRelevance, Issue::InsufficientResults],
        ),
        FilterStrategyRecord::new(
            StrategyKind::EmergencyFallback,
            255,
            &[Issue::InsufficientResults, Issue::LowRelevance],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategies_are_ordered_by_priority() {
        let strategies = default_strategies();
        let mut prev = 0u8;
        for s in &strategies {
            assert!(s.priority >= prev);
            prev = s.priority;
        }
    }

    #[test]
    fn success_rate_moves_toward_recorded_outcomes() {
        let record = FilterStrategyRecord::new(StrategyKind::PriceBroadenLow, 1, &[]);
        for _ in 0..20 {
            record.record_outcome(true, 0.2);
        }
        assert!(record.stats().success_rate > 0.9);
    }

    #[test]
    fn emergency_fallback_has_lowest_priority() {
        let strategies = default_strategies();
        let emergency = strategies
            .iter()
            .find(|s| s.kind == StrategyKind::EmergencyFallback)
            .unwrap();
        assert_eq!(emergency.priority, 255);
    }
}
