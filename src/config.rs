//! Configuration file for mathnote.
//!
//! A single TOML file with `[search]`, `[credentials]` and `[history]`
//! sections. Every field has a default, so an empty file is valid. API
//! keys may also come from the environment; see
//! [`MathNoteConfig::apply_env_overrides`].

use std::path::{Path, PathBuf};

use mathnote_search::{GoogleCredentials, SearchConfig, SearchSource};
use serde::{Deserialize, Serialize};

use crate::error::{MathNoteError, Result};
use crate::history::HistoryOptions;

/// Environment variable holding the Google Custom Search API key.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";
/// Environment variable holding the Google programmable search engine id.
pub const GOOGLE_ENGINE_ID_ENV: &str = "GOOGLE_SEARCH_ENGINE_ID";
/// Environment variable holding the Bing Web Search subscription key.
pub const BING_API_KEY_ENV: &str = "BING_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MathNoteConfig {
    pub search: SearchSection,
    pub credentials: CredentialsSection,
    pub history: HistorySection,
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    /// Sources queried when a search names none.
    pub sources: Vec<SearchSource>,
    pub max_results: usize,
    /// Per-provider timeout.
    pub timeout_seconds: u64,
    /// 0 disables the result cache.
    pub cache_ttl_seconds: u64,
    pub math_boost_weight: f64,
    pub user_agent: Option<String>,
    /// Endpoint overrides, mainly for pointing at a mock server.
    pub google_base_url: Option<String>,
    pub bing_base_url: Option<String>,
    pub arxiv_base_url: Option<String>,
}

impl Default for SearchSection {
    fn default() -> Self {
        let defaults = SearchConfig::default();
        Self {
            sources: defaults.sources,
            max_results: defaults.max_results,
            timeout_seconds: defaults.timeout_seconds,
            cache_ttl_seconds: defaults.cache_ttl_seconds,
            math_boost_weight: defaults.math_boost_weight,
            user_agent: None,
            google_base_url: None,
            bing_base_url: None,
            arxiv_base_url: None,
        }
    }
}

/// `[credentials]` section. Values are redacted from `Debug` output.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsSection {
    pub google_api_key: Option<String>,
    pub google_engine_id: Option<String>,
    pub bing_api_key: Option<String>,
}

impl std::fmt::Debug for CredentialsSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("CredentialsSection")
            .field("google_api_key", &redact(&self.google_api_key))
            .field("google_engine_id", &self.google_engine_id)
            .field("bing_api_key", &redact(&self.bing_api_key))
            .finish()
    }
}

/// `[history]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySection {
    /// Database file. Defaults to `history.db` in the data directory.
    pub db_path: Option<PathBuf>,
    /// Age in days after which `prune` deletes rows.
    pub retention_days: u32,
    pub busy_retries: u32,
    pub busy_backoff_ms: u64,
}

impl Default for HistorySection {
    fn default() -> Self {
        let defaults = HistoryOptions::default();
        Self {
            db_path: None,
            retention_days: 30,
            busy_retries: defaults.busy_retries,
            busy_backoff_ms: u64::try_from(defaults.busy_backoff.as_millis()).unwrap_or(50),
        }
    }
}

impl MathNoteConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| MathNoteError::Config(e.to_string()))
    }

    /// Load `path` if given, otherwise the default config file if it
    /// exists, otherwise built-in defaults.
    ///
    /// # Errors
    ///
    /// An explicitly named file must exist and parse.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Self::default_config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)
                } else {
                    tracing::debug!(path = %default_path.display(), "no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MathNoteError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path, e.g. `~/.config/mathnote/config.toml`.
    pub fn default_config_path() -> PathBuf {
        crate::mathnote_dirs::config_file()
    }

    /// Fill credentials from `GOOGLE_API_KEY`, `GOOGLE_SEARCH_ENGINE_ID`
    /// and `BING_API_KEY`. Environment values win over the file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(key) = non_empty(GOOGLE_API_KEY_ENV) {
            self.credentials.google_api_key = Some(key);
        }
        if let Some(id) = non_empty(GOOGLE_ENGINE_ID_ENV) {
            self.credentials.google_engine_id = Some(id);
        }
        if let Some(key) = non_empty(BING_API_KEY_ENV) {
            self.credentials.bing_api_key = Some(key);
        }
    }

    /// Build the search library's configuration.
    ///
    /// Google is only configured when both its key and engine id are set.
    pub fn to_search_config(&self) -> SearchConfig {
        let defaults = SearchConfig::default();
        let present = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());

        let google = match (
            present(&self.credentials.google_api_key),
            present(&self.credentials.google_engine_id),
        ) {
            (Some(api_key), Some(engine_id)) => Some(GoogleCredentials { api_key, engine_id }),
            _ => None,
        };

        SearchConfig {
            sources: self.search.sources.clone(),
            max_results: self.search.max_results,
            timeout_seconds: self.search.timeout_seconds,
            cache_ttl_seconds: self.search.cache_ttl_seconds,
            math_boost_weight: self.search.math_boost_weight,
            user_agent: self.search.user_agent.clone(),
            google,
            bing_api_key: present(&self.credentials.bing_api_key),
            google_base_url: self
                .search
                .google_base_url
                .clone()
                .unwrap_or(defaults.google_base_url),
            bing_base_url: self
                .search
                .bing_base_url
                .clone()
                .unwrap_or(defaults.bing_base_url),
            arxiv_base_url: self
                .search
                .arxiv_base_url
                .clone()
                .unwrap_or(defaults.arxiv_base_url),
        }
    }

    /// Database file to open.
    pub fn db_path(&self) -> PathBuf {
        self.history
            .db_path
            .clone()
            .unwrap_or_else(crate::mathnote_dirs::history_db_file)
    }

    pub fn history_options(&self) -> HistoryOptions {
        HistoryOptions {
            busy_retries: self.history.busy_retries,
            busy_backoff: std::time::Duration::from_millis(self.history.busy_backoff_ms),
            ..HistoryOptions::default()
        }
    }

    /// Validate the search settings.
    ///
    /// # Errors
    ///
    /// Returns [`MathNoteError::Config`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.to_search_config()
            .validate()
            .map_err(|e| MathNoteError::Config(e.to_string()))
    }
}
