//! Search orchestration: concurrent queries, dedup, relevance, ranking.
//!
//! [`search::SearchManager`] fans a query out to the configured providers,
//! deduplicates their hits by normalised URL, and ranks them with
//! [`scoring::RelevanceCalculator`].

pub mod dedup;
pub mod scoring;
pub mod search;
pub mod url_normalize;
