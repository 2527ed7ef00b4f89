//! Capability traits at the seams of the search pipeline.
//!
//! Each provider (Google, Bing, arXiv) implements [`SearchProvider`] so the
//! manager treats every source uniformly. [`HistoryStore`] is how the
//! manager persists a completed search without knowing the backing store.

use async_trait::async_trait;

use crate::error::SearchError;
use crate::types::{RawResult, SearchHistory, SearchSource};

/// A pluggable search provider.
///
/// Implementors call one external API and return its hits as
/// [`RawResult`] values. Each provider handles its own:
///
/// - URL construction and query encoding
/// - credentials and headers
/// - response parsing
/// - mapping rate limits and quota errors to [`SearchError`]
///
/// All implementations must be `Send + Sync` for concurrent fan-out.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Fetch up to `max_results` hits for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the request fails, the provider rejects
    /// it, or the response cannot be parsed.
    async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<RawResult>, SearchError>;

    /// Which source this provider represents.
    fn source(&self) -> SearchSource;
}

/// Sink for completed searches.
///
/// Called from a blocking task, so implementations may block (SQLite).
pub trait HistoryStore: Send + Sync {
    /// Persist `history` and return its assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::StoreUnavailable`] when the store cannot be
    /// written.
    fn save_history(&self, history: &SearchHistory) -> Result<i64, SearchError>;
}
