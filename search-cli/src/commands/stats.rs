//! `search-cli stats`: print daily performance and facet usage rollups for
//! operator review (spec C6, C9's inputs).

use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Args;
use search_core::store::AnalyticsStore;

#[derive(Args)]
pub struct StatsArgs {
    /// How many days back to roll up.
    #[arg(long, default_value_t = 7)]
    days: i64,
}

pub async fn run(analytics_store: &Arc<dyn AnalyticsStore>, args: StatsArgs) -> anyhow::Result<()> {
    let since = Utc::now() - Duration::days(args.days);

    let performance = analytics_store.daily_performance(since).await?;
    println!("daily performance (last {} days):", args.days);
    for day in &performance {
        println!(
            "  {}  queries={:<6} avg_latency_ms={:.1} cache_hit_rate={:.2} zero_result_rate={:.2}",
            day.date.format("%Y-%m-%d"),
            day.query_count,
            day.avg_latency_ms,
            day.cache_hit_rate,
            day.zero_result_rate
        );
    }

    let facets = analytics_store.facet_usage(since).await?;
    println!("facet usage (last {} days):", args.days);
    for facet in &facets {
        println!("  {}={} selected={}", facet.dimension, facet.value, facet.selected_count);
    }

    let popular = analytics_store.popular_queries(10).await?;
    println!("top queries:");
    for pq in &popular {
        println!("  {:<30} count={:<6} avg_results={:.1}", pq.query, pq.count, pq.avg_result_count);
    }

    if let Some(baseline) = analytics_store.latest_baseline().await? {
        println!(
            "latest baseline: scope={} group={} computed_at={} avg_latency_ms={:.1} \
             p95_latency_ms={:.1} sample_size={} trend={}",
            baseline.scope.as_str(),
            baseline.group,
            baseline.computed_at,
            baseline.avg_latency_ms,
            baseline.p95_latency_ms,
            baseline.sample_size,
            baseline.trend.as_str(),
        );
    } else {
        println!("no baseline computed yet");
    }

    Ok(())
}
