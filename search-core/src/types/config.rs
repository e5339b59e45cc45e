//! Runtime configuration (spec §6 "Configuration").
//!
//! Plain, `serde`-deserializable value types; the layered loader (env →
//! file → defaults) lives in `search-cli`, not here — `search-core` only
//! defines the shape and its defaults.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_name: String,
    pub dim: usize,
    pub text_weight_by_category: BTreeMap<String, f32>,
    pub image_weight_by_category: BTreeMap<String, f32>,
    pub lru_capacity: usize,
    pub image_max_dim: u32,
    #[serde(with = "duration_secs")]
    pub image_timeout: Duration,
    /// Base URL of the HTTP embedding provider, used only when the
    /// `provider-http` feature's `HttpEmbeddingProvider` is wired in.
    pub api_base_url: String,
    pub api_key: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_name: "text-embedding-3-small".into(),
            dim: crate::types::product::EMBEDDING_DIM,
            text_weight_by_category: BTreeMap::new(),
            image_weight_by_category: BTreeMap::new(),
            lru_capacity: 10_000,
            image_max_dim: 1024,
            image_timeout: Duration::from_secs(10),
            api_base_url: String::new(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtlConfig {
    #[serde(with = "duration_secs")]
    pub semantic: Duration,
    #[serde(with = "duration_secs")]
    pub fuzzy: Duration,
    #[serde(with = "duration_secs")]
    pub aggregates: Duration,
    #[serde(with = "duration_secs")]
    pub facets: Duration,
}

impl Default for CacheTtlConfig {
    fn default() -> Self {
        Self {
            semantic: Duration::from_secs(300),
            fuzzy: Duration::from_secs(120),
            aggregates: Duration::from_secs(3600),
            facets: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    pub outbound_rps: f64,
    pub outbound_burst: u32,
    pub inbound_per_window: u32,
    pub inbound_window_seconds: u64,
    /// How long a caller waits for an outbound token before failing with
    /// `Throttled` (spec §4.4 point 1).
    pub outbound_acquire_timeout_ms: u64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            outbound_rps: 20.0,
            outbound_burst: 40,
            inbound_per_window: 120,
            inbound_window_seconds: 60,
            outbound_acquire_timeout_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchTuning {
    pub default_similarity_threshold: f32,
    pub max_page_size: u32,
    pub fuzzy_min_trigram_score: f32,
}

impl Default for SearchTuning {
    fn default() -> Self {
        Self {
            default_similarity_threshold: 0.5,
            max_page_size: 100,
            fuzzy_min_trigram_score: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    pub min_improvement_pct: f64,
    pub max_strategies_per_query: u8,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            min_improvement_pct: 0.1,
            max_strategies_per_query: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub analytics_days: u32,
    pub clicks_days: u32,
    pub performance_days: u32,
    pub session_hours: u32,
    pub learned_patterns_min_success_rate: f64,
    pub learned_patterns_stale_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            analytics_days: 90,
            clicks_days: 180,
            performance_days: 365,
            session_hours: 48,
            learned_patterns_min_success_rate: 0.2,
            learned_patterns_stale_days: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    #[serde(with = "duration_secs")]
    pub refresh_interval: Duration,
    pub min_events_per_group: u32,
    /// Minimum `avg_score` delta against the previous baseline to call a
    /// group `improving`/`declining` rather than `stable` (spec C9 step 2).
    pub trend_threshold: f64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(86_400),
            min_events_per_group: 30,
            trend_threshold: 0.05,
        }
    }
}

/// The full configuration tree, recognized per spec §6.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub embedding: EmbeddingConfig,
    pub cache: CacheTtlConfig,
    pub rate: RateConfig,
    pub search: SearchTuning,
    pub adaptive: AdaptiveConfig,
    pub retention: RetentionConfig,
    pub baseline: BaselineConfig,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let c = SearchConfig::default();
        assert_eq!(c.search.max_page_size, 100);
        assert_eq!(c.adaptive.max_strategies_per_query, 3);
        assert!((c.adaptive.min_improvement_pct - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let c = SearchConfig::default();
        let s = toml::to_string(&c).unwrap();
        let back: SearchConfig = toml::from_str(&s).unwrap();
        assert_eq!(back.cache.semantic, c.cache.semantic);
    }
}
