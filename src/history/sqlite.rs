//! SQLite-backed search history repository.
//!
//! One writer connection behind a `Mutex` serialises every mutation; reads
//! check out a connection from a small idle pool so they can run alongside
//! the writer under WAL. `SQLITE_BUSY` / `SQLITE_LOCKED` are retried with
//! exponential backoff before giving up with
//! [`HistoryError::StoreUnavailable`].

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use mathnote_search::{HistoryStore, SearchError, SearchHistory};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OpenFlags, params};
use serde::Serialize;

use super::schema::{apply_schema, read_schema_version};

/// Columns selected by every history query, in `row_to_history` order.
const HISTORY_COLUMNS: &str =
    "h.id, h.query_text, h.keywords, h.result_count, h.top_result_url, h.created_at";

/// Tuning for lock contention and the reader pool.
#[derive(Debug, Clone)]
pub struct HistoryOptions {
    /// Retries after the first busy/locked failure.
    pub busy_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub busy_backoff: Duration,
    /// Idle read connections kept open between queries.
    pub max_idle_readers: usize,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            busy_retries: 5,
            busy_backoff: Duration::from_millis(50),
            max_idle_readers: 4,
        }
    }
}

/// Aggregate figures over the whole history table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStatistics {
    pub total: u64,
    /// `0.0` when the table is empty.
    pub average_result_count: f64,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

/// SQLite-backed history repository.
///
/// `Send + Sync`; share it behind an `Arc`.
pub struct SqliteHistoryRepository {
    path: PathBuf,
    options: HistoryOptions,
    writer: Mutex<Connection>,
    readers: Mutex<Vec<Connection>>,
}

impl SqliteHistoryRepository {
    /// Open (or create) the database file at `path` with default options.
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        Self::open_with_options(path, HistoryOptions::default())
    }

    /// Open (or create) the database file at `path`, creating parent
    /// directories and applying the schema.
    pub fn open_with_options(path: &Path, options: HistoryOptions) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| HistoryError::Io(e.to_string()))?;
        }

        let conn = Connection::open(path).map_err(HistoryError::Sqlite)?;
        // Contention is handled by our own backoff loop.
        conn.busy_timeout(Duration::ZERO)
            .map_err(HistoryError::Sqlite)?;
        apply_schema(&conn).map_err(HistoryError::Sqlite)?;

        tracing::debug!(path = %path.display(), "history store opened");

        Ok(Self {
            path: path.to_path_buf(),
            options,
            writer: Mutex::new(conn),
            readers: Mutex::new(Vec::new()),
        })
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current schema version from the database.
    pub fn schema_version(&self) -> Result<Option<u32>, HistoryError> {
        self.read("schema_version", read_schema_version)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Persist `history` and return its assigned id.
    ///
    /// The row and its keyword index entries are written in one
    /// transaction.
    pub fn save(&self, history: &SearchHistory) -> Result<i64, HistoryError> {
        if history.query_text.trim().is_empty() {
            return Err(HistoryError::InvalidRecord(
                "query_text must not be empty".into(),
            ));
        }
        let result_count = i64::try_from(history.result_count).map_err(|_| {
            HistoryError::InvalidRecord(format!(
                "result_count {} does not fit the store",
                history.result_count
            ))
        })?;
        let keywords_json = serde_json::to_string(&history.extracted_keywords)
            .map_err(|e| HistoryError::InvalidRecord(e.to_string()))?;
        let created_at = history.timestamp.timestamp_millis();

        let mut conn = self.lock_writer()?;
        let id = self.with_retry("save", || {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO search_history \
                 (query_text, keywords, result_count, top_result_url, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    history.query_text,
                    keywords_json,
                    result_count,
                    history.top_result_url,
                    created_at
                ],
            )?;
            let id = tx.last_insert_rowid();
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO search_history_keywords (history_id, keyword) \
                     VALUES (?1, ?2)",
                )?;
                for keyword in &history.extracted_keywords {
                    let keyword = normalize_keyword(keyword);
                    if !keyword.is_empty() {
                        stmt.execute(params![id, keyword])?;
                    }
                }
            }
            tx.commit()?;
            Ok(id)
        })?;

        tracing::debug!(id, result_count, "search history saved");
        Ok(id)
    }

    /// Delete every row stamped strictly before `cutoff`. Returns the
    /// number of rows removed; a second call with the same cutoff
    /// returns 0.
    pub fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, HistoryError> {
        let cutoff_ms = cutoff.timestamp_millis();
        let conn = self.lock_writer()?;
        let deleted = self.with_retry("delete_older_than", || {
            conn.execute(
                "DELETE FROM search_history WHERE created_at < ?1",
                params![cutoff_ms],
            )
        })?;
        if deleted > 0 {
            tracing::info!(deleted, cutoff = %cutoff, "pruned search history");
        }
        Ok(deleted)
    }

    /// Delete rows older than `days` days.
    pub fn apply_retention_policy(&self, days: u32) -> Result<usize, HistoryError> {
        let cutoff = Utc::now() - TimeDelta::days(i64::from(days));
        self.delete_older_than(cutoff)
    }

    /// Delete a single row.
    pub fn delete(&self, id: i64) -> Result<(), HistoryError> {
        let conn = self.lock_writer()?;
        let deleted = self.with_retry("delete", || {
            conn.execute("DELETE FROM search_history WHERE id = ?1", params![id])
        })?;
        if deleted == 0 {
            return Err(HistoryError::NotFound(id));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The `limit` most recent rows, newest first. `limit == 0` yields an
    /// empty list.
    pub fn find_recent(&self, limit: usize) -> Result<Vec<SearchHistory>, HistoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = sql_limit(limit);
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM search_history h \
             ORDER BY h.created_at DESC, h.id DESC LIMIT ?1"
        );
        self.read("find_recent", |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params![limit], row_to_history)?;
            rows.collect()
        })
    }

    /// Rows whose extracted keywords contain `keyword`, compared
    /// case-insensitively, newest first.
    pub fn find_by_keyword(&self, keyword: &str) -> Result<Vec<SearchHistory>, HistoryError> {
        let keyword = normalize_keyword(keyword);
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM search_history h \
             JOIN search_history_keywords k ON k.history_id = h.id \
             WHERE k.keyword = ?1 \
             ORDER BY h.created_at DESC, h.id DESC"
        );
        self.read("find_by_keyword", |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params![keyword], row_to_history)?;
            rows.collect()
        })
    }

    /// Look up a single row.
    pub fn find_by_id(&self, id: i64) -> Result<Option<SearchHistory>, HistoryError> {
        let sql = format!("SELECT {HISTORY_COLUMNS} FROM search_history h WHERE h.id = ?1");
        self.read("find_by_id", |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let mut rows = stmt.query_map(params![id], row_to_history)?;
            rows.next().transpose()
        })
    }

    /// Rows whose query text contains `text` (ASCII case-insensitive),
    /// newest first.
    pub fn search_by_query(
        &self,
        text: &str,
        limit: usize,
    ) -> Result<Vec<SearchHistory>, HistoryError> {
        let text = text.trim();
        if text.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let pattern = format!("%{}%", escape_like(text));
        let limit = sql_limit(limit);
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM search_history h \
             WHERE h.query_text LIKE ?1 ESCAPE '\\' \
             ORDER BY h.created_at DESC, h.id DESC LIMIT ?2"
        );
        self.read("search_by_query", |conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params![pattern, limit], row_to_history)?;
            rows.collect()
        })
    }

    /// Total number of stored rows.
    pub fn count(&self) -> Result<u64, HistoryError> {
        let count: i64 = self.read("count", |conn| {
            conn.query_row("SELECT COUNT(*) FROM search_history", [], |row| row.get(0))
        })?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    pub fn statistics(&self) -> Result<HistoryStatistics, HistoryError> {
        self.read("statistics", |conn| {
            conn.query_row(
                "SELECT COUNT(*), AVG(result_count), MIN(created_at), MAX(created_at) \
                 FROM search_history",
                [],
                |row| {
                    let total: i64 = row.get(0)?;
                    let average: Option<f64> = row.get(1)?;
                    let earliest: Option<i64> = row.get(2)?;
                    let latest: Option<i64> = row.get(3)?;
                    Ok(HistoryStatistics {
                        total: u64::try_from(total).unwrap_or(0),
                        average_result_count: average.unwrap_or(0.0),
                        earliest: earliest.map(|ms| millis_to_datetime(2, ms)).transpose()?,
                        latest: latest.map(|ms| millis_to_datetime(3, ms)).transpose()?,
                    })
                },
            )
        })
    }

    // -----------------------------------------------------------------------
    // Connection handling
    // -----------------------------------------------------------------------

    fn lock_writer(&self) -> Result<MutexGuard<'_, Connection>, HistoryError> {
        self.writer
            .lock()
            .map_err(|e| HistoryError::Lock(e.to_string()))
    }

    /// Run `f` on a pooled read connection.
    fn read<T>(
        &self,
        op: &'static str,
        mut f: impl FnMut(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, HistoryError> {
        let conn = self.checkout_reader()?;
        let result = self.with_retry(op, || f(&conn));
        self.checkin_reader(conn);
        result
    }

    fn checkout_reader(&self) -> Result<Connection, HistoryError> {
        let idle = self
            .readers
            .lock()
            .map_err(|e| HistoryError::Lock(e.to_string()))?
            .pop();
        match idle {
            Some(conn) => Ok(conn),
            None => {
                let conn = Connection::open_with_flags(
                    &self.path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )
                .map_err(HistoryError::Sqlite)?;
                conn.busy_timeout(Duration::ZERO)
                    .map_err(HistoryError::Sqlite)?;
                Ok(conn)
            }
        }
    }

    fn checkin_reader(&self, conn: Connection) {
        if let Ok(mut idle) = self.readers.lock() {
            if idle.len() < self.options.max_idle_readers {
                idle.push(conn);
            }
        }
    }

    /// Run `f`, retrying busy/locked failures with exponential backoff.
    fn with_retry<T>(
        &self,
        op: &'static str,
        mut f: impl FnMut() -> rusqlite::Result<T>,
    ) -> Result<T, HistoryError> {
        let mut delay = self.options.busy_backoff;
        let mut attempt = 0u32;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(e) if is_busy(&e) => {
                    if attempt >= self.options.busy_retries {
                        tracing::warn!(op, attempts = attempt + 1, error = %e, "history store stayed busy");
                        return Err(HistoryError::StoreUnavailable(format!(
                            "{op}: database busy after {} attempts",
                            attempt + 1
                        )));
                    }
                    attempt += 1;
                    tracing::debug!(op, attempt, delay_ms = delay.as_millis() as u64, "history store busy, retrying");
                    std::thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                }
                Err(e) => return Err(HistoryError::Sqlite(e)),
            }
        }
    }
}

impl std::fmt::Debug for SqliteHistoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteHistoryRepository")
            .field("path", &self.path)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl HistoryStore for SqliteHistoryRepository {
    fn save_history(&self, history: &SearchHistory) -> Result<i64, SearchError> {
        self.save(history)
            .map_err(|e| SearchError::StoreUnavailable(e.to_string()))
    }
}

/// Errors from the SQLite history backend.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("history store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("lock poisoned: {0}")]
    Lock(String),

    #[error("history record not found: {0}")]
    NotFound(i64),

    #[error("invalid history record: {0}")]
    InvalidRecord(String),
}

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

fn row_to_history(row: &rusqlite::Row<'_>) -> rusqlite::Result<SearchHistory> {
    let keywords_json: String = row.get(2)?;
    let result_count: i64 = row.get(3)?;
    let created_at: i64 = row.get(5)?;

    Ok(SearchHistory {
        id: Some(row.get(0)?),
        query_text: row.get(1)?,
        extracted_keywords: serde_json::from_str(&keywords_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e))
        })?,
        result_count: usize::try_from(result_count)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(3, result_count))?,
        top_result_url: row.get(4)?,
        timestamp: millis_to_datetime(5, created_at)?,
    })
}

fn millis_to_datetime(column: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(column, ms))
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
