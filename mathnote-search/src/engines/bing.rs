//! Bing Web Search API (v7) provider.
//!
//! Authenticates with the `Ocp-Apim-Subscription-Key` header. Organic hits
//! live under `webPages.value`; a response without that block simply has no
//! web results.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SearchConfig;
use crate::engine::SearchProvider;
use crate::error::SearchError;
use crate::http;
use crate::types::{RawResult, SearchSource};

/// Hard page-size limit of the Web Search API.
const BING_MAX_PAGE: usize = 50;

/// Bing Web Search client.
pub struct BingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BingProvider {
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
            base_url: config.bing_base_url.clone(),
            api_key: api_key.into(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct BingResponse {
    #[serde(rename = "webPages")]
    web_pages: Option<BingWebPages>,
}

#[derive(Debug, Deserialize)]
struct BingWebPages {
    #[serde(default)]
    value: Vec<BingPage>,
}

#[derive(Debug, Deserialize)]
struct BingPage {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchProvider for BingProvider {
    async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<RawResult>, SearchError> {
        tracing::trace!(query, "Bing search");

        let count = max_results.clamp(1, BING_MAX_PAGE).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Bing request failed: {e}")))?;

        http::check_status("Bing", response.status())?;

        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("Bing response read failed: {e}")))?;

        tracing::trace!(bytes = body.len(), "Bing response received");

        parse_bing_json(&body, max_results)
    }

    fn source(&self) -> SearchSource {
        SearchSource::Bing
    }
}

/// Parse a Web Search response body.
fn parse_bing_json(body: &str, max_results: usize) -> Result<Vec<RawResult>, SearchError> {
    let parsed: BingResponse = serde_json::from_str(body)
        .map_err(|e| SearchError::Parse(format!("Bing response is not valid JSON: {e}")))?;

    let results: Vec<RawResult> = parsed
        .web_pages
        .map(|pages| pages.value)
        .unwrap_or_default()
        .into_iter()
        .take(max_results)
        .map(|page| RawResult {
            title: page.name,
            url: page.url,
            snippet: page.snippet,
            math_hint: false,
        })
        .collect();

    tracing::debug!(count = results.len(), "Bing results parsed");
    Ok(results)
}
