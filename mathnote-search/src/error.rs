//! Error types for the mathnote-search crate.
//!
//! All errors use stable string messages suitable for display to users
//! and programmatic handling. No API keys appear in error messages.

/// Errors that can occur during a search or while persisting its history.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SearchError {
    /// Bad query or parameters. Raised before any side effect.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Every requested source failed (or none is configured).
    #[error("no sources available: {0}")]
    AllSourcesUnavailable(String),

    /// A provider did not answer within its timeout.
    #[error("search timed out: {0}")]
    Timeout(String),

    /// An HTTP request to a provider failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider rejected the request for quota or key reasons.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Failed to parse a provider response body.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The history store could not be written after retries.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl SearchError {
    /// Whether this error describes a single provider failing, which the
    /// search manager absorbs instead of propagating.
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Http(_) | Self::QuotaExceeded(_) | Self::Parse(_)
        )
    }
}

/// Convenience type alias for mathnote-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
