//! Persisted search history.
//!
//! Every completed search is stored as one row in a local SQLite file so
//! it can be listed, looked up by keyword, and pruned by age.

mod schema;
pub mod sqlite;

pub use sqlite::{HistoryError, HistoryOptions, HistoryStatistics, SqliteHistoryRepository};
