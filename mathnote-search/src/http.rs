//! Shared HTTP client construction and response status mapping.

use std::time::Duration;

use reqwest::StatusCode;

use crate::config::SearchConfig;
use crate::error::SearchError;

/// User-Agent sent when the config does not override it.
const DEFAULT_USER_AGENT: &str = concat!("mathnote-search/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for provider API calls.
///
/// The client has:
/// - Timeout from config (the manager also bounds each provider call)
/// - Custom User-Agent if configured
/// - gzip decompression
///
/// # Errors
///
/// Returns [`SearchError::Http`] if the client cannot be constructed.
pub fn build_client(config: &SearchConfig) -> Result<reqwest::Client, SearchError> {
    let ua = config
        .user_agent
        .clone()
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_owned());

    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(ua)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))
}

/// Map a non-success status to the matching provider error.
///
/// 429 and 403 mean the key is throttled or out of quota; everything else
/// is a plain HTTP failure.
pub fn check_status(provider: &str, status: StatusCode) -> Result<(), SearchError> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN => Err(SearchError::QuotaExceeded(
            format!("{provider} returned {status}"),
        )),
        _ => Err(SearchError::Http(format!("{provider} returned {status}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_client_with_default_config() {
        let config = SearchConfig::default();
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn build_client_with_custom_ua() {
        let config = SearchConfig {
            user_agent: Some("CustomBot/1.0".into()),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn default_user_agent_names_crate() {
        assert!(DEFAULT_USER_AGENT.starts_with("mathnote-search/"));
    }

    #[test]
    fn status_mapping() {
        assert!(check_status("Google", StatusCode::OK).is_ok());
        assert!(matches!(
            check_status("Google", StatusCode::TOO_MANY_REQUESTS),
            Err(SearchError::QuotaExceeded(_))
        ));
        assert!(matches!(
            check_status("Bing", StatusCode::FORBIDDEN),
            Err(SearchError::QuotaExceeded(_))
        ));
        let err = check_status("arXiv", StatusCode::BAD_GATEWAY).unwrap_err();
        assert!(matches!(err, SearchError::Http(_)));
        assert!(err.to_string().contains("arXiv"));
    }
}
