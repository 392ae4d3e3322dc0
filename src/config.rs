//! Runtime configuration, persisted as TOML.
//!
//! Every field has a default, so a missing or partial `config.toml` is fine.
//! A few settings can be overridden from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalize::{DEFAULT_NODE_NORM_URL, NodeNormClient};
use crate::paths::AppPaths;
use crate::pubmed::{DEFAULT_PUBMED_URL, PubmedClient};
use crate::query::{QueryClient, Target};

/// Overrides the cache directory.
pub const ENV_CACHE_DIR: &str = "KG_SUMMARIZER_CACHE_DIR";
/// Overrides the default query target.
pub const ENV_TARGET: &str = "KG_SUMMARIZER_TARGET";

/// Errors from loading or saving configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(kg::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(kg::config::parse),
        help("Check the TOML syntax. Unknown keys are rejected to catch typos.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(kg::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {key}: \"{value}\"")]
    #[diagnostic(
        code(kg::config::invalid_value),
        help("See `kg-summarizer --help` for accepted values.")
    )]
    InvalidValue { key: String, value: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Settings for the network collaborators and caches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SummarizerConfig {
    /// Node normalization `get_normalized_nodes` endpoint.
    #[serde(default = "default_node_norm_url")]
    pub node_norm_url: String,
    #[serde(default = "default_norm_timeout_secs")]
    pub norm_timeout_secs: u64,
    /// NCBI efetch endpoint.
    #[serde(default = "default_pubmed_url")]
    pub pubmed_url: String,
    /// Attempts per abstract before giving up.
    #[serde(default = "default_pubmed_retries")]
    pub pubmed_retries: usize,
    /// Timeout per efetch attempt.
    #[serde(default = "default_pubmed_timeout_secs")]
    pub pubmed_timeout_secs: u64,
    /// Timeout for reasoning-service queries.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Cache root. `None` means `$XDG_CACHE_HOME/kg-summarizer`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_target")]
    pub target: Target,
    /// OpenAI-compatible API base URL.
    #[serde(default = "default_llm_base_url")]
    pub llm_base_url: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default)]
    pub llm_temperature: f32,
}

fn default_node_norm_url() -> String {
    DEFAULT_NODE_NORM_URL.into()
}
fn default_norm_timeout_secs() -> u64 {
    60
}
fn default_pubmed_url() -> String {
    DEFAULT_PUBMED_URL.into()
}
fn default_pubmed_retries() -> usize {
    5
}
fn default_pubmed_timeout_secs() -> u64 {
    30
}
fn default_http_timeout_secs() -> u64 {
    600
}
fn default_target() -> Target {
    Target::Aragorn
}
fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_llm_model() -> String {
    "gpt-3.5-turbo-16k".into()
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            node_norm_url: default_node_norm_url(),
            norm_timeout_secs: default_norm_timeout_secs(),
            pubmed_url: default_pubmed_url(),
            pubmed_retries: default_pubmed_retries(),
            pubmed_timeout_secs: default_pubmed_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            cache_dir: None,
            target: default_target(),
            llm_base_url: default_llm_base_url(),
            llm_model: default_llm_model(),
            llm_temperature: 0.0,
        }
    }
}

impl SummarizerConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content, path)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    fn from_toml(content: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Apply overrides from the process environment.
    pub fn with_env(self) -> ConfigResult<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        if let Some(target) = lookup(ENV_TARGET) {
            self.target = target.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_TARGET.into(),
                value: target.clone(),
            })?;
        }
        Ok(self)
    }

    /// Cache root, falling back to the XDG cache directory.
    pub fn cache_root(&self, paths: &AppPaths) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| paths.cache_dir.clone())
    }

    pub fn node_norm_client(&self) -> NodeNormClient {
        NodeNormClient::new(
            self.node_norm_url.clone(),
            Duration::from_secs(self.norm_timeout_secs),
        )
    }

    pub fn pubmed_client(&self) -> PubmedClient {
        PubmedClient::new(
            self.pubmed_url.clone(),
            self.pubmed_retries,
            Duration::from_secs(self.pubmed_timeout_secs),
        )
    }

    pub fn query_client(&self) -> QueryClient {
        QueryClient::new(Duration::from_secs(self.http_timeout_secs))
    }
}
