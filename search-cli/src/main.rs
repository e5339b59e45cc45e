//! Operator CLI for the search-serving pipeline, grounded on the teacher's
//! `memory-cli` binary: a clap derive `Cli`/`Commands` tree dispatching into
//! thin command modules, with a layered config file loaded once up front.

mod commands;
mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use search_core::adaptive::AdaptiveEngine;
use search_core::analytics::AnalyticsRecorder;
use search_core::embedding::EmbeddingClient;
use search_core::orchestrator::SearchOrchestrator;
use search_core::ratelimit::{SlidingWindowLimiter, TokenBucket};
use search_core::store::{AnalyticsStore, EmbeddingProvider, ResultCache, VectorStore};
use search_store_cache::RedbResultCache;
use search_store_vector::VectorTursoStore;

#[derive(Parser)]
#[command(name = "search-cli", about = "Operate the semantic product search pipeline")]
struct Cli {
    /// Path to a TOML config file; overrides `SEARCH_CLI_CONFIG` and the
    /// default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one search query against the live pipeline and print the response.
    Search(commands::search::SearchArgs),
    /// Print daily performance and facet usage rollups.
    Stats(commands::stats::StatsArgs),
    /// Offline baseline/pattern-mining job (spec C9).
    Baseline(commands::baseline::BaselineArgs),
    /// Age- and usage-based retention sweep (spec C10).
    Retention(commands::retention::RetentionArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    // `VectorTursoStore` implements both `VectorStore` and `AnalyticsStore`
    // over the same libSQL connection; coerce the one `Arc` into each trait
    // object rather than opening a second connection.
    let catalog = Arc::new(VectorTursoStore::new(&cfg.catalog_url, &cfg.catalog_token).await?);
    let vector_store: Arc<dyn VectorStore> = catalog.clone();
    let analytics_store: Arc<dyn AnalyticsStore> = catalog;
    let result_cache: Arc<dyn ResultCache> = Arc::new(RedbResultCache::new(&cfg.cache_path).await?);

    match cli.command {
        Commands::Search(args) => {
            let embedding_provider = build_embedding_provider(&cfg.search)?;
            let orchestrator = build_orchestrator(
                vector_store,
                result_cache,
                analytics_store,
                embedding_provider,
                cfg.search.clone(),
            )?;
            commands::search::run(&orchestrator, args).await?;
        }
        Commands::Stats(args) => commands::stats::run(&analytics_store, args).await?,
        Commands::Baseline(args) => commands::baseline::run(&analytics_store, &cfg.search, args).await?,
        Commands::Retention(args) => commands::retention::run(&analytics_store, &cfg.search, args).await?,
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_orchestrator(
    vector_store: Arc<dyn VectorStore>,
    result_cache: Arc<dyn ResultCache>,
    analytics_store: Arc<dyn AnalyticsStore>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    search_config: search_core::types::config::SearchConfig,
) -> anyhow::Result<SearchOrchestrator> {
    let embedding_client = Arc::new(EmbeddingClient::new(
        embedding_provider,
        search_config.embedding.lru_capacity,
    ));
    let outbound_limiter = Arc::new(TokenBucket::new(
        search_config.rate.outbound_rps,
        search_config.rate.outbound_burst,
    ));
    let inbound_limiter = Arc::new(SlidingWindowLimiter::new(
        search_config.rate.inbound_per_window,
        Duration::from_secs(search_config.rate.inbound_window_seconds),
    ));
    let adaptive_engine = Arc::new(AdaptiveEngine::new(search_config.adaptive));
    let analytics = AnalyticsRecorder::spawn(analytics_store, 1024, 2, 32, Duration::from_secs(1));

    Ok(SearchOrchestrator::builder()
        .vector_store(vector_store)
        .result_cache(result_cache)
        .embedding_client(embedding_client)
        .outbound_limiter(outbound_limiter)
        .inbound_limiter(inbound_limiter)
        .adaptive_engine(adaptive_engine)
        .analytics(analytics)
        .config(search_config)
        .build()?)
}

#[cfg(feature = "provider-http")]
fn build_embedding_provider(
    search_config: &search_core::types::config::SearchConfig,
) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    Ok(Arc::new(search_core::embedding::HttpEmbeddingProvider::new(
        search_config.embedding.clone(),
    )))
}

#[cfg(not(feature = "provider-http"))]
fn build_embedding_provider(
    _search_config: &search_core::types::config::SearchConfig,
) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    anyhow::bail!("search requires the provider-http feature to be built with an embedding provider")
}
