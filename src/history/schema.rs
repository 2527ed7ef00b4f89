//! SQLite DDL for the search history store.
//!
//! All `CREATE TABLE` / `CREATE INDEX` statements live here so they are
//! reviewable and testable in isolation.

use rusqlite::Connection;

/// Current on-disk schema version, stamped into `schema_meta`.
pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Complete DDL for the history database.
///
/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
-- WAL lets the reader pool run while the writer commits.
PRAGMA journal_mode = WAL;

-- Needed for ON DELETE CASCADE on the keyword table.
PRAGMA foreign_keys = ON;

-- Schema version tracking.
CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per completed search.
CREATE TABLE IF NOT EXISTS search_history (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    query_text     TEXT NOT NULL,
    keywords       TEXT NOT NULL DEFAULT '[]',   -- JSON array, original casing
    result_count   INTEGER NOT NULL CHECK (result_count >= 0),
    top_result_url TEXT,
    created_at     INTEGER NOT NULL              -- unix epoch millis
);

CREATE INDEX IF NOT EXISTS idx_history_created_at ON search_history(created_at);

-- Lowercased keywords, one row per distinct keyword of a search.
CREATE TABLE IF NOT EXISTS search_history_keywords (
    history_id INTEGER NOT NULL REFERENCES search_history(id) ON DELETE CASCADE,
    keyword    TEXT NOT NULL,
    PRIMARY KEY (history_id, keyword)
);

CREATE INDEX IF NOT EXISTS idx_history_keyword ON search_history_keywords(keyword);
"#;

/// Apply the full schema to an open connection.
///
/// Safe to call multiple times. Seeds the schema version on a fresh
/// database.
pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        rusqlite::params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Read the stored schema version, if any.
pub(crate) fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let value: String = row.get(0)?;
            Ok(value.parse().ok())
        }
        None => Ok(None),
    }
}
