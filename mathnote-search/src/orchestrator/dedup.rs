//! Result deduplication by normalised URL.
//!
//! Results that refer to the same page (after URL normalisation) collapse
//! to the first one seen. Merge order is source order, so the surviving
//! entry comes from the earliest source that returned the page.

use std::collections::HashSet;

use crate::types::SearchResult;

use super::url_normalize::normalize_url;

/// Deduplicate search results by normalised URL.
///
/// The first occurrence of each URL is kept and later duplicates are
/// dropped. Surviving results keep their input order.
pub fn deduplicate(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen: HashSet<String> = HashSet::with_capacity(results.len());
    let before = results.len();

    let unique: Vec<SearchResult> = results
        .into_iter()
        .filter(|result| seen.insert(normalize_url(result.url())))
        .collect();

    if unique.len() < before {
        tracing::debug!(
            dropped = before - unique.len(),
            kept = unique.len(),
            "duplicate URLs merged"
        );
    }
    unique
}
