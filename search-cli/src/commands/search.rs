//! `search-cli search`: run one query against the live orchestrator and
//! print the response as JSON, mirroring the teacher's command style of
//! printing structured output rather than a bespoke table renderer.

use clap::Args;
use search_core::orchestrator::SearchOrchestrator;
use search_core::types::request::{CallerFingerprint, SearchRequest, SearchType};

#[derive(Args)]
pub struct SearchArgs {
    /// Free-text query.
    query: String,

    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = 25)]
    limit: u32,

    #[arg(long, value_enum, default_value_t = CliSearchType::Semantic)]
    search_type: CliSearchType,

    #[arg(long)]
    min_price: Option<f64>,

    #[arg(long)]
    max_price: Option<f64>,

    #[arg(long)]
    store_scope: Option<String>,

    /// Required when `--search-type image`.
    #[arg(long)]
    image_url: Option<String>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CliSearchType {
    Semantic,
    Fuzzy,
    Image,
}

impl From<CliSearchType> for SearchType {
    fn from(v: CliSearchType) -> Self {
        match v {
            CliSearchType::Semantic => SearchType::Semantic,
            CliSearchType::Fuzzy => SearchType::Fuzzy,
            CliSearchType::Image => SearchType::Image,
        }
    }
}

pub async fn run(orchestrator: &SearchOrchestrator, args: SearchArgs) -> anyhow::Result<()> {
    let request = SearchRequest {
        query: args.query,
        page: args.page,
        limit: args.limit,
        filters: search_core::types::filters::Filters {
            min_price: args.min_price,
            max_price: args.max_price,
            store_scope: args.store_scope,
            status: None,
            stock_status: None,
        },
        search_type: args.search_type.into(),
        similarity_threshold: None,
        image_url: args.image_url,
        caller_fingerprint: CallerFingerprint("search-cli".into()),
        session_id: None,
        user_agent: None,
    };

    let response = orchestrator.search(request, None).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
