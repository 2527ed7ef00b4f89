//! Error types for the mathnote application.

use mathnote_search::SearchError;

use crate::history::HistoryError;

/// Top-level error type for the mathnote application.
#[derive(Debug, thiserror::Error)]
pub enum MathNoteError {
    /// Configuration file or value error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Search pipeline error.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// History store error.
    #[error("history error: {0}")]
    History(#[from] HistoryError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, MathNoteError>;
