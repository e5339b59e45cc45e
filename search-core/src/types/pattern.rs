//! Mined query patterns and their retention state (spec C9, C10).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A query pattern mined from analytics (spec C9), tracked for reuse by
/// the adaptive filter engine (C7) and subject to retention (C10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnedPattern {
    pub pattern_id: Uuid,
    /// Normalized query or query template this pattern applies to.
    pub query_template: String,
    pub suggested_strategy: String,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_seen: DateTime<Utc>,
    pub last_applied: Option<DateTime<Utc>>,
}

impl LearnedPattern {
    /// Moving success rate in `[0, 1]`; `0.5` when never applied.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            0.5
        } else {
            self.success_count as f64 / total as f64
        }
    }

    /// Whether this pattern has not been seen in longer than `max_age`.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now - self.last_seen > max_age
    }

    /// Whether this pattern's success rate is at or below `threshold`.
    #[must_use]
    pub fn is_unsuccessful(&self, threshold: f64) -> bool {
        self.success_rate() <= threshold
    }

    /// Retention eligibility per spec C10: a pattern is only pruned when it
    /// is *both* stale and unsuccessful, never on either condition alone.
    #[must_use]
    pub fn is_eligible_for_retention(
        &self,
        now: DateTime<Utc>,
        max_age: chrono::Duration,
        unsuccessful_threshold: f64,
    ) -> bool {
        self.is_stale(now, max_age) && self.is_unsuccessful(unsuccessful_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(success: u64, failure: u64, last_seen: DateTime<Utc>) -> LearnedPattern {
        LearnedPattern {
            pattern_id: Uuid::nil(),
            query_template: "category:boots".into(),
            suggested_strategy: "category_broaden".into(),
            success_count: success,
            failure_count: failure,
            last_seen,
            last_applied: None,
        }
    }

    #[test]
    fn stale_but_successful_pattern_is_not_retained() {
        let now = DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(100);
        let p = sample(90, 10, DateTime::<Utc>::UNIX_EPOCH);
        assert!(p.is_stale(now, chrono::Duration::days(30)));
        assert!(!p.is_eligible_for_retention(now, chrono::Duration::days(30), 0.2));
    }

    #[test]
    fn fresh_but_unsuccessful_pattern_is_not_retained() {
        let now = DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(1);
        let p = sample(1, 9, DateTime::<Utc>::UNIX_EPOCH);
        assert!(!p.is_eligible_for_retention(now, chrono::Duration::days(30), 0.2));
    }

    #[test]
    fn stale_and_unsuccessful_pattern_is_retained() {
        let now = DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(100);
        let p = sample(1, 9, DateTime::<Utc>::UNIX_EPOCH);
        assert!(p.is_eligible_for_retention(now, chrono::Duration::days(30), 0.2));
    }
}
