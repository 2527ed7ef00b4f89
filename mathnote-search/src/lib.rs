//! # mathnote-search
//!
//! Relevance-ranked math search for mathnote.
//!
//! Queries Google Custom Search, Bing Web Search and arXiv concurrently,
//! merges and deduplicates their hits, ranks them with a TF-IDF style
//! relevance score that favours mathematical content, and hands each
//! completed search to a history store.
//!
//! ## Design
//!
//! - One [`SearchProvider`] trait per external API, selected through a
//!   source-to-provider map built at construction
//! - Every provider call is bounded by a timeout; a failing source is
//!   logged and skipped, and only all sources failing is an error
//! - Results are deduplicated by normalised URL, first occurrence wins
//! - [`RelevanceCalculator`] applies a single tunable math-domain boost
//! - In-memory result cache with configurable TTL
//! - History persistence goes through the [`HistoryStore`] trait and never
//!   fails a search
//!
//! ## Security
//!
//! - API keys are redacted from `Debug` output and error messages
//! - Search queries are logged only at trace level

pub mod cache;
pub mod config;
pub mod engine;
pub mod engines;
pub mod error;
pub mod http;
pub mod orchestrator;
pub mod text;
pub mod types;

pub use config::{GoogleCredentials, SearchConfig};
pub use engine::{HistoryStore, SearchProvider};
pub use error::{Result, SearchError};
pub use orchestrator::scoring::RelevanceCalculator;
pub use orchestrator::search::SearchManager;
pub use text::{KeywordMathDetector, MathDetection, MathDetector};
pub use types::{MathCategory, MathTerm, RawResult, SearchHistory, SearchResult, SearchSource};

/// Search the configured sources once, without recording history.
///
/// Builds a throwaway [`SearchManager`] from `config` and queries every
/// source it could configure, returning up to `config.max_results`
/// results.
///
/// # Errors
///
/// Returns [`SearchError::Config`] for an invalid configuration,
/// [`SearchError::InvalidInput`] for a blank query, and
/// [`SearchError::AllSourcesUnavailable`] if every source fails.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> mathnote_search::Result<()> {
/// let config = mathnote_search::SearchConfig::default();
/// let results = mathnote_search::search("eigenvalue bounds", &config).await?;
/// for result in &results {
///     println!("{:.2} {}: {}", result.relevance_score(), result.title(), result.url());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(query: &str, config: &SearchConfig) -> Result<Vec<SearchResult>> {
    let manager = SearchManager::from_config(config.clone(), None)?;
    manager.search(query, &[], config.max_results).await
}
