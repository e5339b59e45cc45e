//! `search-cli retention run`: one retention sweep (spec C10), invoked by
//! an operator's scheduler; this crate itself stays schedule-agnostic.

use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Subcommand};
use search_core::retention;
use search_core::store::AnalyticsStore;
use search_core::types::config::SearchConfig;

#[derive(Args)]
pub struct RetentionArgs {
    #[command(subcommand)]
    action: RetentionAction,
}

#[derive(Subcommand)]
enum RetentionAction {
    /// Purge aged analytics/click/performance rows and stale-and-unsuccessful
    /// patterns.
    Run,
}

pub async fn run(
    analytics_store: &Arc<dyn AnalyticsStore>,
    search_config: &SearchConfig,
    args: RetentionArgs,
) -> anyhow::Result<()> {
    match args.action {
        RetentionAction::Run => {
            let report = retention::run_once(analytics_store, &search_config.retention, Utc::now()).await?;
            println!(
                "retention complete: rows_purged={} patterns_pruned={}",
                report.rows_purged, report.patterns_pruned
            );
        }
    }
    Ok(())
}
