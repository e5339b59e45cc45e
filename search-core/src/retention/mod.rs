//! Age- and usage-based retention across analytics and pattern tables
//! (spec C10).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::Result;
use crate::store::AnalyticsStore;
use crate::types::config::RetentionConfig;

/// Outcome of one retention pass, for logging/metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetentionReport {
    pub rows_purged: u64,
    pub patterns_pruned: u64,
}

/// Run one retention pass against `store` as of `now`.
///
/// `LearnedPattern`s are pruned only under the dual condition (stale AND
/// unsuccessful, spec §3/C10) so a low-usage but high-value pattern survives.
pub async fn run_once(
    store: &Arc<dyn AnalyticsStore>,
    config: &RetentionConfig,
    now: DateTime<Utc>,
) -> Result<RetentionReport> {
    let analytics_before = now - chrono::Duration::days(i64::from(config.analytics_days));
    let clicks_before = now - chrono::Duration::days(i64::from(config.clicks_days));
    let performance_before = now - chrono::Duration::days(i64::from(config.performance_days));

    let rows_purged = store
        .purge_older_than(analytics_before, clicks_before, performance_before)
        .await?;

    let max_age = chrono::Duration::days(i64::from(config.learned_patterns_stale_days));
    let mut patterns_pruned = 0u64;
    for pattern in store.list_patterns().await? {
        if pattern.is_eligible_for_retention(now, max_age, config.learned_patterns_min_success_rate)
        {
            store.delete_pattern(pattern.pattern_id).await?;
            patterns_pruned += 1;
        }
    }

    info!(rows_purged, patterns_pruned, "retention pass complete");

    Ok(RetentionReport {
        rows_purged,
        patterns_pruned,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::pattern::LearnedPattern;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeStore {
        patterns: Mutex<Vec<LearnedPattern>>,
    }

    #[async_trait]
    impl AnalyticsStore for FakeStore {
        async fn record_event(&self, _event: &crate::types::AnalyticsEvent) -> Result<()> {
            Ok(())
        }
        async fn daily_performance(
            &self,
            _since: DateTime<Utc>,
        ) -> Result<Vec<crate::types::DailyPerformance>> {
            Ok(vec![])
        }
        async fn events_since(&self, _since: DateTime<Utc>) -> Result<Vec<crate::types::AnalyticsEvent>> {
            Ok(vec![])
        }
        async fn facet_usage(&self, _since: DateTime<Utc>) -> Result<Vec<crate::types::FacetUsage>> {
            Ok(vec![])
        }
        async fn popular_queries(&self, _limit: u32) -> Result<Vec<crate::types::PopularQuery>> {
            Ok(vec![])
        }
        async fn save_baseline(&self, _baseline: &crate::types::Baseline) -> Result<()> {
            Ok(())
        }
        async fn latest_baseline(&self) -> Result<Option<crate::types::Baseline>> {
            Ok(None)
        }
        async fn latest_baseline_for(
            &self,
            _scope: crate::types::BaselineScope,
            _store_id: Option<&str>,
            _group: &str,
        ) -> Result<Option<crate::types::Baseline>> {
            Ok(None)
        }
        async fn save_pattern(&self, pattern: &LearnedPattern) -> Result<()> {
            self.patterns.lock().unwrap().push(pattern.clone());
            Ok(())
        }
        async fn list_patterns(&self) -> Result<Vec<LearnedPattern>> {
            Ok(self.patterns.lock().unwrap().clone())
        }
        async fn delete_pattern(&self, pattern_id: uuid::Uuid) -> Result<()> {
            self.patterns.lock().unwrap().retain(|p| p.pattern_id != pattern_id);
            Ok(())
        }
        async fn purge_older_than(
            &self,
            _analytics_before: DateTime<Utc>,
            _clicks_before: DateTime<Utc>,
            _performance_before: DateTime<Utc>,
        ) -> Result<u64> {
            Ok(42)
        }
    }

    #[tokio::test]
    async fn retention_prunes_only_stale_and_unsuccessful_patterns() {
        let now = DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(100);
        let stale_bad = LearnedPattern {
            pattern_id: uuid::Uuid::new_v4(),
            query_template: "a".into(),
            suggested_strategy: "x".into(),
            success_count: 1,
            failure_count: 9,
            last_seen: DateTime::<Utc>::UNIX_EPOCH,
            last_applied: None,
        };
        let stale_good = LearnedPattern {
            pattern_id: uuid::Uuid::new_v4(),
            query_template: "b".into(),
            suggested_strategy: "x".into(),
            success_count: 9,
            failure_count: 1,
            last_seen: DateTime::<Utc>::UNIX_EPOCH,
            last_applied: None,
        };
        let store: Arc<dyn AnalyticsStore> = Arc::new(FakeStore {
            patterns: Mutex::new(vec![stale_bad, stale_good]),
        });

        let config = RetentionConfig::default();
        let report = run_once(&store, &config, now).await.unwrap();

        assert_eq!(report.patterns_pruned, 1);
        assert_eq!(store.list_patterns().await.unwrap().len(), 1);
        assert_eq!(report.rows_purged, 42);
    }
}
