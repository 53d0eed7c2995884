//! TOML configuration plus environment-sourced secrets.
//!
//! Non-secret settings live in the config file. Access tokens are read
//! from the environment exactly once, in [`load_config`], and carried on the
//! returned [`Config`]; nothing downstream looks at the environment.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `GITLAB_TOKEN` | `tracker.token` |
//! | `OPENAI_API_KEY` | `embedding.api_key` |
//! | `AZURE_SEARCH_API_KEY` | `search.api_key` |

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const TRACKER_TOKEN_ENV: &str = "GITLAB_TOKEN";
pub const EMBED_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const SEARCH_KEY_ENV: &str = "AZURE_SEARCH_API_KEY";

/// Largest page size the staging store can address (SQLite integers are i64).
pub const MAX_CHUNK_SIZE: usize = i64::MAX as usize;

/// GitLab silently caps `per_page` at this value.
pub const GITLAB_MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_url")]
    pub url: String,
    pub group_id: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(skip)]
    pub token: Option<String>,
}

fn default_tracker_url() -> String {
    "https://gitlab.com".to_string()
}
fn default_per_page() -> u32 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            dims: None,
            base_url: default_embedding_base_url(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
        }
    }
}

fn default_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    pub index: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_api_version() -> String {
    "2023-11-01".to_string()
}

impl SearchConfig {
    /// Base URL of the search service, e.g. `https://acme.search.windows.net`.
    pub fn resolved_endpoint(&self) -> Result<String> {
        match (&self.endpoint, &self.service_name) {
            (Some(endpoint), _) => Ok(endpoint.trim_end_matches('/').to_string()),
            (None, Some(name)) => Ok(format!("https://{}.search.windows.net", name)),
            (None, None) => bail!("search.endpoint or search.service_name must be set"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}

impl Config {
    /// Fill secrets from the process environment. Unset or empty variables
    /// leave the field as `None`.
    pub fn with_env_secrets(mut self) -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        self.tracker.token = var(TRACKER_TOKEN_ENV);
        self.embedding.api_key = var(EMBED_API_KEY_ENV);
        self.search.api_key = var(SEARCH_KEY_ENV);
        self
    }

    pub fn tracker_token(&self) -> Result<&str> {
        self.tracker
            .token
            .as_deref()
            .with_context(|| format!("{} environment variable not set", TRACKER_TOKEN_ENV))
    }

    pub fn embed_api_key(&self) -> Result<&str> {
        self.embedding
            .api_key
            .as_deref()
            .with_context(|| format!("{} environment variable not set", EMBED_API_KEY_ENV))
    }

    pub fn search_key(&self) -> Result<&str> {
        self.search
            .api_key
            .as_deref()
            .with_context(|| format!("{} environment variable not set", SEARCH_KEY_ENV))
    }
}

/// Parse and validate a config file from disk, then attach secrets from
/// the environment.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    Ok(config.with_env_secrets())
}

/// Parse and validate config text. Secrets are left unset.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.pipeline.chunk_size == 0 {
        bail!("pipeline.chunk_size must be > 0");
    }
    if config.pipeline.chunk_size > MAX_CHUNK_SIZE {
        bail!("pipeline.chunk_size must be <= {}", MAX_CHUNK_SIZE);
    }

    if config.tracker.group_id.trim().is_empty() {
        bail!("tracker.group_id must not be empty");
    }

    if config.tracker.per_page == 0 || config.tracker.per_page > GITLAB_MAX_PER_PAGE {
        bail!("tracker.per_page must be between 1 and {}", GITLAB_MAX_PER_PAGE);
    }

    if config.search.endpoint.is_some() && config.search.service_name.is_some() {
        bail!("set only one of search.endpoint and search.service_name");
    }
    config.search.resolved_endpoint()?;

    if config.search.index.trim().is_empty() {
        bail!("search.index must not be empty");
    }

    if config.embedding.dims == Some(0) {
        bail!("embedding.dims must be > 0 when set");
    }

    Ok(config)
}
