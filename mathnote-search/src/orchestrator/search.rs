//! Search manager: concurrent multi-source fan-out, dedup, rank, record.
//!
//! Queries every selected provider concurrently, each bounded by the
//! configured timeout, validates and merges their hits in source order,
//! deduplicates by normalised URL, ranks with the relevance calculator,
//! and truncates to the requested maximum. Completed searches are
//! handed to the history store.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::{CacheKey, ResultCache};
use crate::config::SearchConfig;
use crate::engine::{HistoryStore, SearchProvider};
use crate::engines::{ArxivProvider, BingProvider, GoogleProvider};
use crate::error::SearchError;
use crate::text::{KeywordMathDetector, MathDetector};
use crate::types::{RawResult, SearchHistory, SearchResult, SearchSource};

use super::dedup::deduplicate;
use super::scoring::RelevanceCalculator;

/// Fans queries out to providers and returns ranked results.
///
/// All collaborators are injected at construction: the provider map
/// decides which sources exist, the detector feeds both scoring and
/// keyword extraction, and the optional history store receives one row
/// per successful search.
pub struct SearchManager {
    config: SearchConfig,
    providers: HashMap<SearchSource, Arc<dyn SearchProvider>>,
    detector: Arc<dyn MathDetector>,
    calculator: RelevanceCalculator,
    cache: ResultCache,
    history: Option<Arc<dyn HistoryStore>>,
}

impl std::fmt::Debug for SearchManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchManager")
            .field("config", &self.config)
            .field("sources", &self.configured_sources())
            .field("calculator", &self.calculator)
            .field("cache", &self.cache)
            .field("history", &self.history.is_some())
            .finish()
    }
}

impl SearchManager {
    /// Build a manager with real HTTP providers for every source in
    /// `config.sources` that has the credentials it needs.
    ///
    /// Google without credentials or Bing without a key is skipped with a
    /// warning; searching it later counts as a failed source.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the configuration is invalid, or
    /// [`SearchError::Http`] if an HTTP client cannot be built.
    pub fn from_config(
        config: SearchConfig,
        history: Option<Arc<dyn HistoryStore>>,
    ) -> Result<Self, SearchError> {
        config.validate()?;

        let mut providers: HashMap<SearchSource, Arc<dyn SearchProvider>> = HashMap::new();
        for &source in &config.sources {
            match source {
                SearchSource::Google => match &config.google {
                    Some(credentials) => {
                        let provider = GoogleProvider::new(credentials.clone(), &config)?;
                        providers.insert(source, Arc::new(provider));
                    }
                    None => tracing::warn!("google enabled without API key and engine id, skipping"),
                },
                SearchSource::Bing => match &config.bing_api_key {
                    Some(key) => {
                        providers.insert(source, Arc::new(BingProvider::new(key.clone(), &config)?));
                    }
                    None => tracing::warn!("bing enabled without API key, skipping"),
                },
                SearchSource::Arxiv => {
                    providers.insert(source, Arc::new(ArxivProvider::new(&config)?));
                }
                SearchSource::Other => {}
            }
        }

        Self::with_providers(config, providers, history)
    }

    /// Build a manager over an explicit source-to-provider map.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the configuration is invalid or a
    /// provider is registered under a source other than its own.
    pub fn with_providers(
        config: SearchConfig,
        providers: HashMap<SearchSource, Arc<dyn SearchProvider>>,
        history: Option<Arc<dyn HistoryStore>>,
    ) -> Result<Self, SearchError> {
        config.validate()?;
        for (&key, provider) in &providers {
            if provider.source() != key {
                return Err(SearchError::Config(format!(
                    "{} provider registered as {key}",
                    provider.source()
                )));
            }
        }
        let detector: Arc<dyn MathDetector> = Arc::new(KeywordMathDetector::new());
        Ok(Self {
            calculator: RelevanceCalculator::new(config.math_boost_weight, Arc::clone(&detector)),
            cache: ResultCache::new(config.cache_ttl_seconds),
            detector,
            providers,
            history,
            config,
        })
    }

    /// Replace the math detector used for scoring and keyword extraction.
    #[must_use]
    pub fn with_detector(mut self, detector: Arc<dyn MathDetector>) -> Self {
        self.calculator = RelevanceCalculator::new(self.config.math_boost_weight, Arc::clone(&detector));
        self.detector = detector;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Sources from the configuration that have a provider, in
    /// configuration order.
    pub fn configured_sources(&self) -> Vec<SearchSource> {
        self.config
            .sources
            .iter()
            .copied()
            .filter(|s| self.providers.contains_key(s))
            .collect()
    }

    /// Drop all cached result sets.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Search `sources` (all configured sources when empty) and return at
    /// most `max_results` results, best first.
    ///
    /// # Pipeline
    ///
    /// 1. Validate input; nothing else happens if this fails
    /// 2. Fan out to each source with [`futures::future::join_all`], every
    ///    call bounded by [`tokio::time::timeout`]
    /// 3. Log per-source failures at warn level; collect successful hits
    /// 4. Validate hits into [`SearchResult`]s and flag math content
    /// 5. Deduplicate by normalised URL, first occurrence wins
    /// 6. Rank by relevance, then truncate
    /// 7. Record one history row
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidInput`] for a blank query, `max_results == 0`
    ///   or a request for [`SearchSource::Other`]
    /// - [`SearchError::AllSourcesUnavailable`] if no source is configured
    ///   or every selected source failed
    pub async fn search(
        &self,
        query: &str,
        sources: &[SearchSource],
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidInput("query must not be empty".into()));
        }
        if max_results == 0 {
            return Err(SearchError::InvalidInput(
                "max_results must be greater than 0".into(),
            ));
        }
        if sources.contains(&SearchSource::Other) {
            return Err(SearchError::InvalidInput(
                "source 'other' cannot be searched".into(),
            ));
        }

        let selected = self.select_sources(sources)?;
        tracing::trace!(query, ?selected, max_results, "search requested");

        let key = CacheKey::new(query, &selected, max_results);
        if let Some(ranked) = self.cache.get(&key).await {
            tracing::debug!(count = ranked.len(), "search cache hit");
            self.record_history(query, &ranked).await;
            return Ok(truncated(ranked, max_results));
        }

        let FanOut { merged, failed } = self.fan_out(query, &selected, max_results).await?;
        let merged = deduplicate(merged);
        let ranked = self.calculator.rank(query, merged)?;

        // Only complete result sets are cached.
        if failed == 0 {
            self.cache.insert(key, ranked.clone()).await;
        } else {
            tracing::debug!(failed, "not caching results with failed sources");
        }
        self.record_history(query, &ranked).await;

        Ok(truncated(ranked, max_results))
    }

    /// Requested sources in request order without repeats, or every
    /// configured source when none were requested.
    fn select_sources(&self, requested: &[SearchSource]) -> Result<Vec<SearchSource>, SearchError> {
        if requested.is_empty() {
            let configured = self.configured_sources();
            if configured.is_empty() {
                return Err(SearchError::AllSourcesUnavailable(
                    "no search sources are configured".into(),
                ));
            }
            return Ok(configured);
        }

        let mut selected = Vec::with_capacity(requested.len());
        for source in requested {
            if !selected.contains(source) {
                selected.push(*source);
            }
        }
        Ok(selected)
    }

    /// Query every source concurrently and merge successful hits in
    /// source order.
    async fn fan_out(
        &self,
        query: &str,
        sources: &[SearchSource],
        max_results: usize,
    ) -> Result<FanOut, SearchError> {
        let timeout = self.config.timeout();

        let fetches = sources.iter().map(|&source| {
            let provider = self.providers.get(&source).cloned();
            async move {
                let outcome = match provider {
                    None => Err(SearchError::Config(format!("{source} is not configured"))),
                    Some(provider) => {
                        match tokio::time::timeout(timeout, provider.fetch(query, max_results)).await {
                            Ok(outcome) => outcome,
                            Err(_) => Err(SearchError::Timeout(format!(
                                "{source} did not answer within {}s",
                                timeout.as_secs()
                            ))),
                        }
                    }
                };
                (source, outcome)
            }
        });

        let outcomes = futures::future::join_all(fetches).await;

        let mut merged: Vec<SearchResult> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut healthy = 0usize;

        for (source, outcome) in outcomes {
            match outcome {
                Ok(raw) => {
                    healthy += 1;
                    tracing::debug!(source = %source, count = raw.len(), "source returned results");
                    merged.extend(self.validate_hits(source, raw));
                }
                Err(err) => {
                    if err.is_provider_failure() {
                        tracing::warn!(source = %source, error = %err, "source query failed");
                    } else {
                        tracing::warn!(source = %source, error = %err, "source unavailable");
                    }
                    errors.push(format!("{source}: {err}"));
                }
            }
        }

        if healthy == 0 {
            return Err(SearchError::AllSourcesUnavailable(errors.join("; ")));
        }
        Ok(FanOut {
            merged,
            failed: errors.len(),
        })
    }

    /// Turn raw hits into validated results, dropping the invalid ones.
    fn validate_hits(&self, source: SearchSource, raw: Vec<RawResult>) -> Vec<SearchResult> {
        raw.into_iter()
            .filter_map(|hit| {
                let math = hit.math_hint
                    || self
                        .detector
                        .detect_math(&format!("{} {}", hit.title, hit.snippet))
                        .math_content_detected;
                match SearchResult::new(hit.title, hit.url, hit.snippet, source, math) {
                    Ok(result) => Some(result),
                    Err(err) => {
                        tracing::debug!(source = %source, error = %err, "dropping invalid hit");
                        None
                    }
                }
            })
            .collect()
    }

    /// Persist one history row for a completed search. Failures are
    /// logged and never reach the caller.
    async fn record_history(&self, query: &str, ranked: &[SearchResult]) {
        let Some(store) = self.history.clone() else {
            return;
        };

        let history = SearchHistory::new(
            query,
            self.detector.extract_keywords(query),
            ranked.len(),
            ranked.first().map(|r| r.url().to_string()),
        );

        match tokio::task::spawn_blocking(move || store.save_history(&history)).await {
            Ok(Ok(id)) => tracing::debug!(id, "search history recorded"),
            Ok(Err(err)) => tracing::warn!(error = %err, "failed to record search history"),
            Err(err) => tracing::warn!(error = %err, "search history task failed"),
        }
    }
}

/// Merged hits from one fan-out and how many selected sources failed.
struct FanOut {
    merged: Vec<SearchResult>,
    failed: usize,
}

fn truncated(mut results: Vec<SearchResult>, max_results: usize) -> Vec<SearchResult> {
    results.truncate(max_results);
    results
}
