//! SQL schema for the catalog and analytics tables.

pub const CREATE_PRODUCTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    external_id TEXT PRIMARY KEY NOT NULL,
    internal_id INTEGER NOT NULL,
    store_id TEXT,
    title TEXT NOT NULL,
    description TEXT,
    vendor TEXT,
    product_type TEXT,
    price REAL NOT NULL,
    tags TEXT NOT NULL,
    seo_title TEXT,
    seo_description TEXT,
    attributes TEXT NOT NULL,
    stock_status TEXT NOT NULL,
    sku TEXT,
    barcode TEXT,
    status TEXT NOT NULL,
    image_url TEXT,
    text_embedding TEXT NOT NULL,
    image_embedding TEXT,
    combined_embedding TEXT NOT NULL,
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
)
"#;

pub const CREATE_PRODUCTS_STORE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_products_store ON products(store_id)
"#;

pub const CREATE_PRODUCTS_PRICE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_products_price ON products(price)
"#;

pub const CREATE_PRODUCTS_STATUS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_products_status ON products(status)
"#;

pub const CREATE_ANALYTICS_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS analytics_events (
    event_id TEXT PRIMARY KEY NOT NULL,
    session_id TEXT NOT NULL,
    caller_ip TEXT NOT NULL DEFAULT '',
    query TEXT NOT NULL,
    query_hash TEXT NOT NULL,
    search_type TEXT NOT NULL,
    filters TEXT NOT NULL DEFAULT '{}',
    page INTEGER NOT NULL DEFAULT 1,
    page_limit INTEGER NOT NULL DEFAULT 25,
    user_agent TEXT,
    result_count INTEGER NOT NULL,
    cache_hit INTEGER NOT NULL,
    applied_strategies TEXT NOT NULL,
    latency_ms INTEGER NOT NULL,
    clicked_external_id TEXT,
    category TEXT,
    primary_intent TEXT NOT NULL DEFAULT 'other',
    avg_similarity REAL NOT NULL DEFAULT 0,
    occurred_at INTEGER NOT NULL,
    UNIQUE(session_id, occurred_at, query_hash)
)
"#;

pub const CREATE_ANALYTICS_EVENTS_TIME_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_analytics_events_time ON analytics_events(occurred_at DESC)
"#;

pub const CREATE_BASELINES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS baselines (
    scope_kind TEXT NOT NULL,
    store_id TEXT NOT NULL DEFAULT '',
    group_key TEXT NOT NULL,
    computed_at INTEGER NOT NULL,
    window_start INTEGER NOT NULL,
    window_end INTEGER NOT NULL,
    avg_latency_ms REAL NOT NULL,
    p95_latency_ms REAL NOT NULL,
    cache_hit_rate REAL NOT NULL,
    zero_result_rate REAL NOT NULL,
    avg_result_count REAL NOT NULL,
    avg_score REAL NOT NULL,
    success_rate REAL NOT NULL,
    trend TEXT NOT NULL,
    sample_size INTEGER NOT NULL,
    UNIQUE(computed_at, scope_kind, store_id, group_key)
)
"#;

pub const CREATE_BASELINES_GROUP_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_baselines_group ON baselines(scope_kind, store_id, group_key, computed_at DESC)
"#;

pub const CREATE_LEARNED_PATTERNS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS learned_patterns (
    pattern_id TEXT PRIMARY KEY NOT NULL,
    query_template TEXT NOT NULL,
    suggested_strategy TEXT NOT NULL,
    success_count INTEGER NOT NULL,
    failure_count INTEGER NOT NULL,
    last_seen INTEGER NOT NULL,
    last_applied INTEGER
)
"#;

/// Populated by an external reporter (the search UI), not by
/// `AnalyticsRecorder` itself: `AnalyticsEvent` carries no facet-selection
/// field, so `facet_usage` reads whatever this table holds rather than
/// deriving it from recorded events.
pub const CREATE_FACET_USAGE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS facet_usage (
    dimension TEXT NOT NULL,
    value TEXT NOT NULL,
    selected_count INTEGER NOT NULL DEFAULT 0,
    last_used INTEGER NOT NULL,
    PRIMARY KEY (dimension, value)
)
"#;

pub const ALL_SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_PRODUCTS_TABLE,
    CREATE_PRODUCTS_STORE_INDEX,
    CREATE_PRODUCTS_PRICE_INDEX,
    CREATE_PRODUCTS_STATUS_INDEX,
    CREATE_ANALYTICS_EVENTS_TABLE,
    CREATE_ANALYTICS_EVENTS_TIME_INDEX,
    CREATE_BASELINES_TABLE,
    CREATE_BASELINES_GROUP_INDEX,
    CREATE_LEARNED_PATTERNS_TABLE,
    CREATE_FACET_USAGE_TABLE,
];
