//! Plain value types shared across the search-serving pipeline (spec §3).

pub mod analytics;
pub mod baseline;
pub mod config;
pub mod filters;
pub mod pattern;
pub mod product;
pub mod request;
pub mod response;
pub mod strategy;

pub use analytics::{AnalyticsEvent, DailyPerformance, FacetUsage, PopularQuery};
pub use baseline::{Baseline, BaselineScope, Trend};
pub use config::SearchConfig;
pub use filters::Filters;
pub use pattern::LearnedPattern;
pub use product::{AttributeValue, Product, ProductStatus, StockStatus};
pub use request::{CallerFingerprint, NormalizedRequest, SearchRequest, SearchType, normalize_request};
pub use response::{
    AppliedFilters, FacetMetadata, FacetValue, Facets, Pagination, ResponseMetadata, ResultItem,
    SearchResponse,
};
pub use strategy::{FilterStrategy, PatternSuggestion, StrategyKind};
