//! Layered configuration: defaults → TOML file → environment overrides,
//! in the style of the teacher's `config::loader` (file/env loaders
//! composed in preference order), collapsed into one module since this
//! binary's config surface is one struct, not a progressive wizard.

use std::env;
use std::path::{Path, PathBuf};

use search_core::types::config::SearchConfig;
use serde::{Deserialize, Serialize};

/// Everything the CLI needs besides the library's own [`SearchConfig`]:
/// where the catalog and cache databases live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub catalog_url: String,
    pub catalog_token: String,
    pub cache_path: PathBuf,
    #[serde(flatten)]
    pub search: SearchConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            catalog_url: ":memory:".into(),
            catalog_token: String::new(),
            cache_path: PathBuf::from("search-cache.redb"),
            search: SearchConfig::default(),
        }
    }
}

const DEFAULT_CONFIG_PATHS: &[&str] = &["search-cli.toml", ".search-cli.toml"];

/// Load configuration: start from defaults, layer a TOML file (explicit
/// `--config` path, `SEARCH_CLI_CONFIG` env var, or the first default path
/// that exists) over them, then apply a handful of direct environment
/// overrides for the values operators touch most.
pub fn load_config(explicit_path: Option<&Path>) -> anyhow::Result<CliConfig> {
    let mut config = CliConfig::default();

    if let Some(path) = resolve_config_path(explicit_path) {
        tracing::info!(path = %path.display(), "loading configuration file");
        let contents = std::fs::read_to_string(&path)?;
        config = toml::from_str(&contents)?;
    }

    if let Ok(url) = env::var("SEARCH_CATALOG_URL") {
        config.catalog_url = url;
    }
    if let Ok(token) = env::var("SEARCH_CATALOG_TOKEN") {
        config.catalog_token = token;
    }
    if let Ok(path) = env::var("SEARCH_CACHE_PATH") {
        config.cache_path = PathBuf::from(path);
    }

    Ok(config)
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = env::var("SEARCH_CLI_CONFIG") {
        return Some(PathBuf::from(path));
    }
    DEFAULT_CONFIG_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}
