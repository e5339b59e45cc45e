//! Analytics, baseline, and pattern storage (spec C6, C9, C10), grounded on
//! the teacher's append-mostly episode storage (`memory-storage-turso/src/storage/episodes/crud.rs`)
//! and its retention sweep (`memory-storage-turso/src/storage/capacity.rs`).

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use libsql::params;
use search_core::error::{Error, Result};
use search_core::store::AnalyticsStore;
use search_core::types::{
    AnalyticsEvent, Baseline, BaselineScope, DailyPerformance, FacetUsage, LearnedPattern, PopularQuery,
};
use tracing::debug;
use uuid::Uuid;

use crate::connection::VectorTursoStore;

fn to_unix(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| Error::Serialization(format!("invalid timestamp: {secs}")))
}

fn row_to_baseline(row: &libsql::Row) -> Result<Option<Baseline>> {
    let scope_kind: String = row.get(0).map_err(|e| Error::Serialization(e.to_string()))?;
    let store_id: String = row.get(1).map_err(|e| Error::Serialization(e.to_string()))?;
    let trend: String = row.get(13).map_err(|e| Error::Serialization(e.to_string()))?;
    let sample_size: i64 = row.get(14).map_err(|e| Error::Serialization(e.to_string()))?;

    let scope = search_core::types::BaselineScope::parse(&scope_kind)
        .ok_or_else(|| Error::Serialization(format!("unknown baseline scope_kind: {scope_kind}")))?;
    let trend = search_core::types::Trend::parse(&trend)
        .ok_or_else(|| Error::Serialization(format!("unknown baseline trend: {trend}")))?;

    Ok(Some(Baseline {
        scope,
        store_id: if store_id.is_empty() { None } else { Some(store_id) },
        group: row.get(2).map_err(|e| Error::Serialization(e.to_string()))?,
        computed_at: from_unix(row.get(3).map_err(|e| Error::Serialization(e.to_string()))?)?,
        window_start: from_unix(row.get(4).map_err(|e| Error::Serialization(e.to_string()))?)?,
        window_end: from_unix(row.get(5).map_err(|e| Error::Serialization(e.to_string()))?)?,
        avg_latency_ms: row.get(6).map_err(|e| Error::Serialization(e.to_string()))?,
        p95_latency_ms: row.get(7).map_err(|e| Error::Serialization(e.to_string()))?,
        cache_hit_rate: row.get(8).map_err(|e| Error::Serialization(e.to_string()))?,
        zero_result_rate: row.get(9).map_err(|e| Error::Serialization(e.to_string()))?,
        avg_result_count: row.get(10).map_err(|e| Error::Serialization(e.to_string()))?,
        avg_score: row.get(11).map_err(|e| Error::Serialization(e.to_string()))?,
        success_rate: row.get(12).map_err(|e| Error::Serialization(e.to_string()))?,
        trend,
        sample_size: sample_size as u64,
    }))
}

#[async_trait]
impl AnalyticsStore for VectorTursoStore {
    async fn record_event(&self, event: &AnalyticsEvent) -> Result<()> {
        debug!(event_id = %event.event_id, "recording analytics event");
        let conn = self.get_connection().await?;

        conn.execute(
            "INSERT OR IGNORE INTO analytics_events \
             (event_id, session_id, caller_ip, query, query_hash, search_type, filters, page, \
              page_limit, user_agent, result_count, cache_hit, applied_strategies, latency_ms, \
              clicked_external_id, category, primary_intent, avg_similarity, occurred_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                event.event_id.to_string(),
                event.session_id.clone(),
                event.caller_ip.clone(),
                event.query.clone(),
                event.query_hash.clone(),
                serde_json::to_string(&event.search_type)?,
                serde_json::to_string(&event.filters)?,
                event.page as i64,
                event.limit as i64,
                event.user_agent.clone(),
                event.result_count as i64,
                event.cache_hit,
                serde_json::to_string(&event.applied_strategies)?,
                event.latency_ms as i64,
                event.clicked_external_id.clone(),
                event.category.clone(),
                event.primary_intent.clone(),
                event.avg_similarity,
                to_unix(event.timestamp),
            ],
        )
        .await
        .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn events_since(&self, since: DateTime<Utc>) -> Result<Vec<AnalyticsEvent>> {
        let conn = self.get_connection().await?;
        let sql = r#"
            SELECT event_id, session_id, caller_ip, query, query_hash, search_type, filters, page,
                   page_limit, user_agent, result_count, cache_hit, applied_strategies, latency_ms,
                   clicked_external_id, category, primary_intent, avg_similarity, occurred_at
            FROM analytics_events
            WHERE occurred_at >= ?
        "#;

        let mut rows = conn
            .query(sql, params![to_unix(since)])
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?
        {
            let event_id: String = row.get(0).map_err(|e| Error::Serialization(e.to_string()))?;
            let search_type: String = row.get(5).map_err(|e| Error::Serialization(e.to_string()))?;
            let filters: String = row.get(6).map_err(|e| Error::Serialization(e.to_string()))?;
            let page: i64 = row.get(7).map_err(|e| Error::Serialization(e.to_string()))?;
            let page_limit: i64 = row.get(8).map_err(|e| Error::Serialization(e.to_string()))?;
            let result_count: i64 = row.get(10).map_err(|e| Error::Serialization(e.to_string()))?;
            let applied_strategies: String =
                row.get(12).map_err(|e| Error::Serialization(e.to_string()))?;
            let latency_ms: i64 = row.get(13).map_err(|e| Error::Serialization(e.to_string()))?;
            let occurred_at: i64 = row.get(18).map_err(|e| Error::Serialization(e.to_string()))?;

            out.push(AnalyticsEvent {
                event_id: Uuid::parse_str(&event_id).map_err(|e| Error::Serialization(e.to_string()))?,
                session_id: row.get(1).map_err(|e| Error::Serialization(e.to_string()))?,
                caller_ip: row.get(2).map_err(|e| Error::Serialization(e.to_string()))?,
                query: row.get(3).map_err(|e| Error::Serialization(e.to_string()))?,
                query_hash: row.get(4).map_err(|e| Error::Serialization(e.to_string()))?,
                search_type: serde_json::from_str(&search_type)?,
                filters: serde_json::from_str(&filters)?,
                page: page as u32,
                limit: page_limit as u32,
                user_agent: row.get(9).map_err(|e| Error::Serialization(e.to_string()))?,
                result_count: result_count as usize,
                cache_hit: row.get(11).map_err(|e| Error::Serialization(e.to_string()))?,
                applied_strategies: serde_json::from_str(&applied_strategies)?,
                latency_ms: latency_ms as u64,
                clicked_external_id: row.get(14).map_err(|e| Error::Serialization(e.to_string()))?,
                category: row.get(15).map_err(|e| Error::Serialization(e.to_string()))?,
                primary_intent: row.get(16).map_err(|e| Error::Serialization(e.to_string()))?,
                avg_similarity: row.get(17).map_err(|e| Error::Serialization(e.to_string()))?,
                timestamp: from_unix(occurred_at)?,
            });
        }

        Ok(out)
    }

    async fn daily_performance(&self, since: DateTime<Utc>) -> Result<Vec<DailyPerformance>> {
        let conn = self.get_connection().await?;
        let sql = r#"
            SELECT
                (occurred_at / 86400) * 86400 AS day_bucket,
                COUNT(*),
                AVG(latency_ms),
                AVG(cache_hit),
                AVG(CASE WHEN result_count = 0 THEN 1.0 ELSE 0.0 END)
            FROM analytics_events
            WHERE occurred_at >= ?
            GROUP BY day_bucket
            ORDER BY day_bucket ASC
        "#;

        let mut rows = conn
            .query(sql, params![to_unix(since)])
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?
        {
            let day_bucket: i64 = row.get(0).map_err(|e| Error::Serialization(e.to_string()))?;
            let query_count: i64 = row.get(1).map_err(|e| Error::Serialization(e.to_string()))?;
            let avg_latency_ms: f64 = row.get(2).map_err(|e| Error::Serialization(e.to_string()))?;
            let cache_hit_rate: f64 = row.get(3).map_err(|e| Error::Serialization(e.to_string()))?;
            let zero_result_rate: f64 =
                row.get(4).map_err(|e| Error::Serialization(e.to_string()))?;

            out.push(DailyPerformance {
                date: from_unix(day_bucket)?,
                query_count: query_count as u64,
                avg_latency_ms,
                cache_hit_rate,
                zero_result_rate,
            });
        }

        Ok(out)
    }

    async fn facet_usage(&self, since: DateTime<Utc>) -> Result<Vec<FacetUsage>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT dimension, value, selected_count FROM facet_usage \
                 WHERE last_used >= ? ORDER BY selected_count DESC",
                params![to_unix(since)],
            )
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?
        {
            let selected_count: i64 = row.get(2).map_err(|e| Error::Serialization(e.to_string()))?;
            out.push(FacetUsage {
                dimension: row.get(0).map_err(|e| Error::Serialization(e.to_string()))?,
                value: row.get(1).map_err(|e| Error::Serialization(e.to_string()))?,
                selected_count: selected_count as u64,
            });
        }

        Ok(out)
    }

    async fn popular_queries(&self, limit: u32) -> Result<Vec<PopularQuery>> {
        let conn = self.get_connection().await?;
        let sql = r#"
            SELECT
                query,
                COUNT(*) AS cnt,
                AVG(result_count),
                MAX(occurred_at)
            FROM analytics_events
            GROUP BY query
            ORDER BY cnt DESC, MAX(occurred_at) DESC
            LIMIT ?
        "#;

        let mut rows = conn
            .query(sql, params![i64::from(limit)])
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?
        {
            let count: i64 = row.get(1).map_err(|e| Error::Serialization(e.to_string()))?;
            let avg_result_count: f64 = row.get(2).map_err(|e| Error::Serialization(e.to_string()))?;
            out.push(PopularQuery {
                query: row.get(0).map_err(|e| Error::Serialization(e.to_string()))?,
                count: count as u64,
                avg_result_count,
            });
        }

        Ok(out)
    }

    async fn save_baseline(&self, baseline: &Baseline) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.execute(
            "INSERT OR REPLACE INTO baselines \
             (scope_kind, store_id, group_key, computed_at, window_start, window_end, \
              avg_latency_ms, p95_latency_ms, cache_hit_rate, zero_result_rate, \
              avg_result_count, avg_score, success_rate, trend, sample_size) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                baseline.scope.as_str(),
                baseline.store_id.clone().unwrap_or_default(),
                baseline.group.clone(),
                to_unix(baseline.computed_at),
                to_unix(baseline.window_start),
                to_unix(baseline.window_end),
                baseline.avg_latency_ms,
                baseline.p95_latency_ms,
                baseline.cache_hit_rate,
                baseline.zero_result_rate,
                baseline.avg_result_count,
                baseline.avg_score,
                baseline.success_rate,
                baseline.trend.as_str(),
                baseline.sample_size as i64,
            ],
        )
        .await
        .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn latest_baseline(&self) -> Result<Option<Baseline>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT scope_kind, store_id, group_key, computed_at, window_start, window_end, \
                 avg_latency_ms, p95_latency_ms, cache_hit_rate, zero_result_rate, \
                 avg_result_count, avg_score, success_rate, trend, sample_size \
                 FROM baselines ORDER BY computed_at DESC LIMIT 1",
                (),
            )
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?
        else {
            return Ok(None);
        };

        row_to_baseline(&row)
    }

    async fn latest_baseline_for(
        &self,
        scope: BaselineScope,
        store_id: Option<&str>,
        group: &str,
    ) -> Result<Option<Baseline>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT scope_kind, store_id, group_key, computed_at, window_start, window_end, \
                 avg_latency_ms, p95_latency_ms, cache_hit_rate, zero_result_rate, \
                 avg_result_count, avg_score, success_rate, trend, sample_size \
                 FROM baselines WHERE scope_kind = ? AND store_id = ? AND group_key = ? \
                 ORDER BY computed_at DESC LIMIT 1",
                params![scope.as_str(), store_id.unwrap_or_default(), group],
            )
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?
        else {
            return Ok(None);
        };

        row_to_baseline(&row)
    }

    async fn save_pattern(&self, pattern: &LearnedPattern) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.execute(
            "INSERT OR REPLACE INTO learned_patterns \
             (pattern_id, query_template, suggested_strategy, success_count, failure_count, \
              last_seen, last_applied) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                pattern.pattern_id.to_string(),
                pattern.query_template.clone(),
                pattern.suggested_strategy.clone(),
                pattern.success_count as i64,
                pattern.failure_count as i64,
                to_unix(pattern.last_seen),
                pattern.last_applied.map(to_unix),
            ],
        )
        .await
        .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn list_patterns(&self) -> Result<Vec<LearnedPattern>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT pattern_id, query_template, suggested_strategy, success_count, \
                 failure_count, last_seen, last_applied FROM learned_patterns",
                (),
            )
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?
        {
            let pattern_id: String = row.get(0).map_err(|e| Error::Serialization(e.to_string()))?;
            let success_count: i64 = row.get(3).map_err(|e| Error::Serialization(e.to_string()))?;
            let failure_count: i64 = row.get(4).map_err(|e| Error::Serialization(e.to_string()))?;
            let last_applied: Option<i64> =
                row.get(6).map_err(|e| Error::Serialization(e.to_string()))?;

            out.push(LearnedPattern {
                pattern_id: Uuid::parse_str(&pattern_id)
                    .map_err(|e| Error::Serialization(e.to_string()))?,
                query_template: row.get(1).map_err(|e| Error::Serialization(e.to_string()))?,
                suggested_strategy: row.get(2).map_err(|e| Error::Serialization(e.to_string()))?,
                success_count: success_count as u64,
                failure_count: failure_count as u64,
                last_seen: from_unix(row.get(5).map_err(|e| Error::Serialization(e.to_string()))?)?,
                last_applied: last_applied.map(from_unix).transpose()?,
            });
        }

        Ok(out)
    }

    async fn delete_pattern(&self, pattern_id: Uuid) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.execute(
            "DELETE FROM learned_patterns WHERE pattern_id = ?",
            params![pattern_id.to_string()],
        )
        .await
        .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn purge_older_than(
        &self,
        analytics_before: DateTime<Utc>,
        clicks_before: DateTime<Utc>,
        performance_before: DateTime<Utc>,
    ) -> Result<u64> {
        let conn = self.get_connection().await?;
        let mut purged: u64 = 0;

        purged += conn
            .execute(
                "DELETE FROM analytics_events WHERE occurred_at < ? AND clicked_external_id IS NULL",
                params![to_unix(analytics_before)],
            )
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        purged += conn
            .execute(
                "DELETE FROM analytics_events WHERE occurred_at < ? AND clicked_external_id IS NOT NULL",
                params![to_unix(clicks_before)],
            )
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        purged += conn
            .execute(
                "DELETE FROM baselines WHERE computed_at < ?",
                params![to_unix(performance_before)],
            )
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))?;

        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use search_core::types::request::SearchType;

    fn event(session: &str, occurred_at: DateTime<Utc>) -> AnalyticsEvent {
        AnalyticsEvent {
            event_id: Uuid::new_v4(),
            session_id: session.into(),
            caller_ip: "anon-1".into(),
            query: "boots".into(),
            query_hash: "hash-1".into(),
            search_type: SearchType::Semantic,
            filters: search_core::types::Filters::default(),
            page: 1,
            limit: 25,
            user_agent: None,
            result_count: 5,
            cache_hit: false,
            applied_strategies: vec![],
            latency_ms: 42,
            clicked_external_id: None,
            category: Some("boots".into()),
            primary_intent: "category".into(),
            avg_similarity: 0.8,
            timestamp: occurred_at,
        }
    }

    #[tokio::test]
    async fn record_event_is_idempotent_on_dedupe_key() {
        let store = VectorTursoStore::new(":memory:", "").await.unwrap();
        let e = event("s-1", Utc.timestamp_opt(1_000, 0).unwrap());
        store.record_event(&e).await.unwrap();
        store.record_event(&e).await.unwrap();

        let perf = store.daily_performance(Utc.timestamp_opt(0, 0).unwrap()).await.unwrap();
        assert_eq!(perf[0].query_count, 1);
    }

    #[tokio::test]
    async fn daily_performance_buckets_by_day() {
        let store = VectorTursoStore::new(":memory:", "").await.unwrap();
        store
            .record_event(&event("s-1", Utc.timestamp_opt(0, 0).unwrap()))
            .await
            .unwrap();
        store
            .record_event(&event("s-2", Utc.timestamp_opt(90_000, 0).unwrap()))
            .await
            .unwrap();

        let perf = store.daily_performance(Utc.timestamp_opt(0, 0).unwrap()).await.unwrap();
        assert_eq!(perf.len(), 2);
    }

    #[tokio::test]
    async fn baseline_round_trips_as_latest() {
        let store = VectorTursoStore::new(":memory:", "").await.unwrap();
        let now = Utc.timestamp_opt(10_000, 0).unwrap();
        let baseline = Baseline::empty(now, search_core::types::BaselineScope::Category, None, "boots".into());
        store.save_baseline(&baseline).await.unwrap();

        let latest = store.latest_baseline().await.unwrap().unwrap();
        assert_eq!(latest.computed_at, now);
        assert_eq!(latest.group, "boots");

        let scoped = store
            .latest_baseline_for(search_core::types::BaselineScope::Category, None, "boots")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(scoped.computed_at, now);
    }

    #[tokio::test]
    async fn events_since_returns_events_in_window() {
        let store = VectorTursoStore::new(":memory:", "").await.unwrap();
        store
            .record_event(&event("s-1", Utc.timestamp_opt(100, 0).unwrap()))
            .await
            .unwrap();

        let events = store.events_since(Utc.timestamp_opt(0, 0).unwrap()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category.as_deref(), Some("boots"));
    }

    #[tokio::test]
    async fn pattern_save_list_delete_round_trips() {
        let store = VectorTursoStore::new(":memory:", "").await.unwrap();
        let pattern = LearnedPattern {
            pattern_id: Uuid::new_v4(),
            query_template: "{color} boots".into(),
            suggested_strategy: "CategoryBroaden".into(),
            success_count: 3,
            failure_count: 1,
            last_seen: Utc.timestamp_opt(10, 0).unwrap(),
            last_applied: None,
        };
        store.save_pattern(&pattern).await.unwrap();

        let patterns = store.list_patterns().await.unwrap();
        assert_eq!(patterns.len(), 1);

        store.delete_pattern(pattern.pattern_id).await.unwrap();
        assert!(store.list_patterns().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn popular_queries_orders_by_count_descending() {
        let store = VectorTursoStore::new(":memory:", "").await.unwrap();
        store
            .record_event(&event("s-1", Utc.timestamp_opt(0, 0).unwrap()))
            .await
            .unwrap();

        let mut rarer = event("s-2", Utc.timestamp_opt(1, 0).unwrap());
        rarer.query = "sandals".into();
        store.record_event(&rarer).await.unwrap();

        let mut also_boots = event("s-3", Utc.timestamp_opt(2, 0).unwrap());
        also_boots.query = "boots".into();
        store.record_event(&also_boots).await.unwrap();

        let popular = store.popular_queries(10).await.unwrap();
        assert_eq!(popular[0].query, "boots");
        assert_eq!(popular[0].count, 2);
        assert_eq!(popular[1].query, "sandals");
    }

    #[tokio::test]
    async fn purge_older_than_removes_stale_rows() {
        let store = VectorTursoStore::new(":memory:", "").await.unwrap();
        store
            .record_event(&event("s-1", Utc.timestamp_opt(0, 0).unwrap()))
            .await
            .unwrap();

        let purged = store
            .purge_older_than(
                Utc.timestamp_opt(1, 0).unwrap(),
                Utc.timestamp_opt(1, 0).unwrap(),
                Utc.timestamp_opt(1, 0).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(purged, 1);
        let perf = store.daily_performance(Utc.timestamp_opt(0, 0).unwrap()).await.unwrap();
        assert!(perf.is_empty());
    }
}
