//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] is passed explicitly into [`crate::SearchManager`];
//! nothing in this crate reads ambient global state. It controls which
//! sources are queried, their credentials, timeouts, caching and the
//! math-domain boost weight.

use std::time::Duration;

use crate::error::SearchError;
use crate::types::SearchSource;

/// Default Google Custom Search endpoint.
pub const GOOGLE_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";
/// Default Bing Web Search endpoint.
pub const BING_BASE_URL: &str = "https://api.bing.microsoft.com/v7.0/search";
/// Default arXiv query endpoint.
pub const ARXIV_BASE_URL: &str = "http://export.arxiv.org/api/query";

/// Google Custom Search credentials.
#[derive(Clone, PartialEq)]
pub struct GoogleCredentials {
    pub api_key: String,
    /// Programmable search engine id (`cx`).
    pub engine_id: String,
}

impl std::fmt::Debug for GoogleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCredentials")
            .field("api_key", &"<redacted>")
            .field("engine_id", &self.engine_id)
            .finish()
    }
}

/// Configuration for the search manager.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Clone)]
pub struct SearchConfig {
    /// Sources queried when a search names none. Queried concurrently.
    pub sources: Vec<SearchSource>,
    /// Default maximum number of results after dedup and ranking.
    pub max_results: usize,
    /// Per-provider timeout in seconds.
    pub timeout_seconds: u64,
    /// How long to cache ranked results in seconds. 0 disables caching.
    pub cache_ttl_seconds: u64,
    /// Strength of the math-domain boost; see `RelevanceCalculator`.
    pub math_boost_weight: f64,
    /// Custom User-Agent for provider requests.
    pub user_agent: Option<String>,
    pub google: Option<GoogleCredentials>,
    pub bing_api_key: Option<String>,
    pub google_base_url: String,
    pub bing_base_url: String,
    pub arxiv_base_url: String,
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("sources", &self.sources)
            .field("max_results", &self.max_results)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("math_boost_weight", &self.math_boost_weight)
            .field("user_agent", &self.user_agent)
            .field("google", &self.google)
            .field("bing_api_key", &self.bing_api_key.as_ref().map(|_| "<redacted>"))
            .field("google_base_url", &self.google_base_url)
            .field("bing_base_url", &self.bing_base_url)
            .field("arxiv_base_url", &self.arxiv_base_url)
            .finish()
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            sources: SearchSource::requestable().to_vec(),
            max_results: 10,
            timeout_seconds: 10,
            cache_ttl_seconds: 600,
            math_boost_weight: 0.25,
            user_agent: None,
            google: None,
            bing_api_key: None,
            google_base_url: GOOGLE_BASE_URL.to_string(),
            bing_base_url: BING_BASE_URL.to_string(),
            arxiv_base_url: ARXIV_BASE_URL.to_string(),
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `max_results` must be greater than 0
    /// - `timeout_seconds` must be greater than 0
    /// - `sources` must not be empty and must not contain `other`
    /// - `math_boost_weight` must be finite and non-negative
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_results == 0 {
            return Err(SearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.sources.is_empty() {
            return Err(SearchError::Config(
                "at least one source must be enabled".into(),
            ));
        }
        if self.sources.contains(&SearchSource::Other) {
            return Err(SearchError::Config(
                "source 'other' cannot be enabled".into(),
            ));
        }
        if !self.math_boost_weight.is_finite() || self.math_boost_weight < 0.0 {
            return Err(SearchError::Config(
                "math_boost_weight must be a non-negative number".into(),
            ));
        }
        Ok(())
    }

    /// Per-provider timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
