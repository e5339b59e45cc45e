//! `search-cli baseline refresh`: C9's offline job, run as a one-shot
//! command rather than a cron daemon (scheduling is an operator concern
//! outside this crate, per spec's C9 Non-goals).

use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Subcommand};
use search_core::learning::{compute_baseline, group_events};
use search_core::store::AnalyticsStore;
use search_core::types::config::SearchConfig;
use search_core::types::BaselineScope;

#[derive(Args)]
pub struct BaselineArgs {
    #[command(subcommand)]
    action: BaselineAction,
}

#[derive(Subcommand)]
enum BaselineAction {
    /// Recompute the baseline from the last `window_days` of rollups and
    /// persist it.
    Refresh {
        #[arg(long, default_value_t = 30)]
        window_days: i64,
    },
    /// Print the currently persisted baseline without recomputing.
    Show,
}

pub async fn run(
    analytics_store: &Arc<dyn AnalyticsStore>,
    search_config: &SearchConfig,
    args: BaselineArgs,
) -> anyhow::Result<()> {
    match args.action {
        BaselineAction::Refresh { window_days } => {
            let now = Utc::now();
            let window_start = now - chrono::Duration::days(window_days);
            let events = analytics_store.events_since(window_start).await?;
            let min_events = u64::from(search_config.baseline.min_events_per_group);
            let trend_threshold = search_config.baseline.trend_threshold;

            let mut refreshed = 0u64;
            let mut skipped = 0u64;
            for scope in [BaselineScope::Category, BaselineScope::Intent] {
                for ((store_id, group), group_events_slice) in group_events(&events, scope) {
                    let previous = analytics_store
                        .latest_baseline_for(scope, store_id.as_deref(), &group)
                        .await?;
                    match compute_baseline(
                        &group_events_slice,
                        scope,
                        store_id.clone(),
                        group.clone(),
                        window_start,
                        now,
                        now,
                        min_events,
                        previous.as_ref(),
                        trend_threshold,
                    ) {
                        Some(baseline) => {
                            analytics_store.save_baseline(&baseline).await?;
                            refreshed += 1;
                        }
                        None => skipped += 1,
                    }
                }
            }
            println!("baseline refresh complete: {refreshed} groups refreshed, {skipped} below min_events_per_group");
        }
        BaselineAction::Show => match analytics_store.latest_baseline().await? {
            Some(baseline) => println!("{}", serde_json::to_string_pretty(&baseline)?),
            None => println!("no baseline computed yet"),
        },
    }

    Ok(())
}
