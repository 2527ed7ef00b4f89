//! Wiring between the search pipeline and the history store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mathnote_search::{HistoryStore, SearchHistory, SearchManager, SearchResult, SearchSource};

use crate::config::MathNoteConfig;
use crate::error::Result;
use crate::history::{HistoryStatistics, SqliteHistoryRepository};

/// One search manager and the history repository it records into.
#[derive(Debug)]
pub struct MathNoteService {
    manager: SearchManager,
    history: Arc<SqliteHistoryRepository>,
    default_max_results: usize,
    retention_days: u32,
}

impl MathNoteService {
    /// Open the history database and build real providers from `config`.
    ///
    /// # Errors
    ///
    /// Fails on an invalid configuration, an unopenable database, or an
    /// HTTP client that cannot be built.
    pub fn open(config: &MathNoteConfig) -> Result<Self> {
        config.validate()?;

        let db_path = config.db_path();
        let history = Arc::new(SqliteHistoryRepository::open_with_options(
            &db_path,
            config.history_options(),
        )?);
        let store: Arc<dyn HistoryStore> = history.clone();
        let manager = SearchManager::from_config(config.to_search_config(), Some(store))?;

        tracing::info!(
            db = %db_path.display(),
            sources = ?manager.configured_sources(),
            "mathnote service ready"
        );
        Ok(Self::from_parts(manager, history, config.history.retention_days))
    }

    /// Assemble a service from an already built manager and repository.
    ///
    /// The manager should record into `history` for searches to show up
    /// in the history queries.
    pub fn from_parts(
        manager: SearchManager,
        history: Arc<SqliteHistoryRepository>,
        retention_days: u32,
    ) -> Self {
        Self {
            default_max_results: manager.config().max_results,
            manager,
            history,
            retention_days,
        }
    }

    /// Run a search. `sources` empty means every configured source;
    /// `max_results` defaults to the configured value.
    ///
    /// # Errors
    ///
    /// See [`SearchManager::search`].
    pub async fn search(
        &self,
        query: &str,
        sources: &[SearchSource],
        max_results: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let max_results = max_results.unwrap_or(self.default_max_results);
        Ok(self.manager.search(query, sources, max_results).await?)
    }

    pub fn recent_history(&self, limit: usize) -> Result<Vec<SearchHistory>> {
        Ok(self.history.find_recent(limit)?)
    }

    pub fn history_for_keyword(&self, keyword: &str) -> Result<Vec<SearchHistory>> {
        Ok(self.history.find_by_keyword(keyword)?)
    }

    pub fn search_history_text(&self, text: &str, limit: usize) -> Result<Vec<SearchHistory>> {
        Ok(self.history.search_by_query(text, limit)?)
    }

    pub fn history_statistics(&self) -> Result<HistoryStatistics> {
        Ok(self.history.statistics()?)
    }

    /// Delete history older than `days` (the configured retention when
    /// `None`). Returns the number of rows removed.
    pub fn prune_history(&self, days: Option<u32>) -> Result<usize> {
        Ok(self
            .history
            .apply_retention_policy(days.unwrap_or(self.retention_days))?)
    }

    /// Delete history stamped strictly before `cutoff`.
    pub fn prune_history_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        Ok(self.history.delete_older_than(cutoff)?)
    }

    /// Remove one history row.
    pub fn forget(&self, id: i64) -> Result<()> {
        Ok(self.history.delete(id)?)
    }

    pub fn manager(&self) -> &SearchManager {
        &self.manager
    }

    pub fn history(&self) -> &SqliteHistoryRepository {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::error::MathNoteError;
    use mathnote_search::SearchError;

    fn config_in(dir: &tempfile::TempDir) -> MathNoteConfig {
        let mut config = MathNoteConfig::default();
        config.search.sources = vec![SearchSource::Arxiv];
        config.search.arxiv_base_url = Some("http://127.0.0.1:9/api/query".into());
        config.history.db_path = Some(dir.path().join("history.db"));
        config
    }

    #[test]
    fn open_creates_database() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = MathNoteService::open(&config_in(&dir)).unwrap();
        assert!(dir.path().join("history.db").exists());
        assert_eq!(service.manager().configured_sources(), vec![SearchSource::Arxiv]);
        assert!(service.recent_history(10).unwrap().is_empty());
    }

    #[test]
    fn open_rejects_invalid_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = config_in(&dir);
        config.search.timeout_seconds = 0;
        assert!(matches!(
            MathNoteService::open(&config),
            Err(MathNoteError::Config(_))
        ));
    }

    #[tokio::test]
    async fn blank_query_is_invalid_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = MathNoteService::open(&config_in(&dir)).unwrap();
        let err = service.search("   ", &[], None).await.unwrap_err();
        assert!(matches!(
            err,
            MathNoteError::Search(SearchError::InvalidInput(_))
        ));
        assert_eq!(service.history().count().unwrap(), 0);
    }

    #[test]
    fn prune_uses_configured_retention() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = MathNoteService::open(&config_in(&dir)).unwrap();
        let mut old = SearchHistory::new("old", vec![], 1, None);
        old.timestamp = Utc::now() - chrono::TimeDelta::days(31);
        service.history().save(&old).unwrap();
        service
            .history()
            .save(&SearchHistory::new("new", vec![], 1, None))
            .unwrap();

        assert_eq!(service.prune_history(None).unwrap(), 1);
        assert_eq!(service.prune_history(None).unwrap(), 0);
        assert_eq!(service.recent_history(10).unwrap()[0].query_text, "new");
    }

    #[test]
    fn forget_missing_row_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = MathNoteService::open(&config_in(&dir)).unwrap();
        assert!(matches!(
            service.forget(99),
            Err(MathNoteError::History(crate::history::HistoryError::NotFound(99)))
        ));
    }
}
