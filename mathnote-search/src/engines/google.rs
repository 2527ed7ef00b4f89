//! Google Custom Search JSON API provider.
//!
//! Requires an API key and a programmable search engine id (`cx`). The API
//! returns at most 10 items per request.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{GoogleCredentials, SearchConfig};
use crate::engine::SearchProvider;
use crate::error::SearchError;
use crate::http;
use crate::types::{RawResult, SearchSource};

/// Hard page-size limit of the Custom Search API.
const GOOGLE_MAX_PAGE: usize = 10;

/// Google Custom Search client.
pub struct GoogleProvider {
    client: reqwest::Client,
    base_url: String,
    credentials: GoogleCredentials,
}

impl GoogleProvider {
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(credentials: GoogleCredentials, config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
            base_url: config.google_base_url.clone(),
            credentials,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchProvider for GoogleProvider {
    async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<RawResult>, SearchError> {
        tracing::trace!(query, "Google search");

        let num = max_results.clamp(1, GOOGLE_MAX_PAGE).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("key", self.credentials.api_key.as_str()),
                ("cx", self.credentials.engine_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Google request failed: {}", e.without_url())))?;

        http::check_status("Google", response.status())?;

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("Google response read failed: {e}")))?;

        tracing::trace!(bytes = body.len(), "Google response received");

        parse_google_json(&body, max_results)
    }

    fn source(&self) -> SearchSource {
        SearchSource::Google
    }
}

/// Parse a Custom Search response body.
///
/// Extracted as a separate function for testability with canned JSON.
fn parse_google_json(body: &str, max_results: usize) -> Result<Vec<RawResult>, SearchError> {
    let parsed: GoogleResponse = serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("Google response is not valid JSON: {e}")))?;

    let results: Vec<RawResult> = parsed
        .items
        .into_iter()
        .take(max_results)
        .map(|item| RawResult {
            title: item.title,
            url: item.link,
            snippet: item.snippet,
            math_hint: false,
        })
        .collect();

    tracing::debug!(count = results.len(), "Google results parsed");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOCK_GOOGLE_JSON: &str = r#"{
        "kind": "customsearch#search",
        "items": [
            {"title": "Linear algebra - Wikipedia", "link": "https://en.wikipedia.org/wiki/Linear_algebra", "snippet": "Linear algebra is the branch of mathematics concerning linear equations."},
            {"title": "Linear Algebra | MIT OpenCourseWare", "link": "https://ocw.mit.edu/courses/18-06", "snippet": "Matrix theory and linear algebra."},
            {"title": "No link"}
        ]
    }"#;

    fn credentials() -> GoogleCredentials {
        GoogleCredentials {
            api_key: "test-key".into(),
            engine_id: "test-cx".into(),
        }
    }

    #[test]
    fn parse_mock_json_returns_results() {
        let results = parse_google_json(MOCK_GOOGLE_JSON, 10).expect("should parse");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Linear algebra - Wikipedia");
        assert_eq!(results[0].url, "https://en.wikipedia.org/wiki/Linear_algebra");
        assert!(results[1].snippet.contains("Matrix theory"));
        // Missing link survives parsing; the manager drops it during validation.
        assert!(results[2].url.is_empty());
    }

    #[test]
    fn parse_respects_max_results() {
        let results = parse_google_json(MOCK_GOOGLE_JSON, 1).expect("should parse");
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn parse_without_items_is_empty() {
        let results = parse_google_json(r#"{"kind": "customsearch#search"}"#, 10)
            .expect("should parse");
        assert!(results.is_empty());
    }

    #[test]
    fn parse_garbage_is_parse_error() {
        let err = parse_google_json("<html>oops</html>", 10).unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[tokio::test]
    async fn fetch_sends_credentials_and_parses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/customsearch/v1"))
            .and(query_param("key", "test-key"))
            .and(query_param("cx", "test-cx"))
            .and(query_param("q", "linear algebra"))
            .and(query_param("num", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOCK_GOOGLE_JSON))
            .mount(&server)
            .await;

        let config = SearchConfig {
            google_base_url: format!("{}/customsearch/v1", server.uri()),
            ..Default::default()
        };
        let provider = GoogleProvider::new(credentials(), &config).expect("provider");
        let results = provider.fetch("linear algebra", 2).await.expect("fetch");
        assert_eq!(results.len(), 2);
        assert_eq!(provider.source(), SearchSource::Google);
    }

    #[tokio::test]
    async fn fetch_maps_quota_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let config = SearchConfig {
            google_base_url: server.uri(),
            ..Default::default()
        };
        let provider = GoogleProvider::new(credentials(), &config).expect("provider");
        let err = provider.fetch("anything", 5).await.unwrap_err();
        assert!(matches!(err, SearchError::QuotaExceeded(_)));
    }

    #[test]
    fn is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GoogleProvider>();
    }
}
