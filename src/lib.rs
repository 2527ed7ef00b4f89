//! mathnote: relevance-ranked math search with a persisted history.
//!
//! The search pipeline itself lives in [`mathnote_search`]. This crate adds
//! what an application needs around it:
//!
//! - **Config**: a TOML file plus environment overrides for API keys
//! - **History**: a SQLite repository that records every completed search
//! - **Service**: one object wiring the search manager to the repository
//!
//! The `mathnote` binary exposes the service on the command line.

pub mod config;
pub mod error;
pub mod history;
pub mod mathnote_dirs;
pub mod service;

pub use config::MathNoteConfig;
pub use error::{MathNoteError, Result};
pub use history::{HistoryError, SqliteHistoryRepository};
pub use service::MathNoteService;
