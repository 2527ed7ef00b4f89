//! arXiv query API provider.
//!
//! Needs no credentials. The API answers with an Atom feed; each `<entry>`
//! carries the abstract page URL in `<id>`, the title, and the abstract in
//! `<summary>`. Every arXiv hit is treated as math content.

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::config::SearchConfig;
use crate::engine::SearchProvider;
use crate::error::SearchError;
use crate::http;
use crate::types::{RawResult, SearchSource};

/// Abstracts longer than this many characters are cut and suffixed `...`.
const SUMMARY_MAX_CHARS: usize = 200;

/// arXiv Atom API client.
pub struct ArxivProvider {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivProvider {
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            client: http::build_client(config)?,
            base_url: config.arxiv_base_url.clone(),
        })
    }
}

#[async_trait]
impl SearchProvider for ArxivProvider {
    async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<RawResult>, SearchError> {
        tracing::trace!(query, "arXiv search");

        let search_query = format!("all:{query}");
        let max = max_results.max(1).to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("arXiv request failed: {e}")))?;

        http::check_status("arXiv", response.status())?;

        let feed = response
            .text()
            .await
            .map_err(|e| SearchError::Http(format!("arXiv response read failed: {e}")))?;

        tracing::trace!(bytes = feed.len(), "arXiv response received");

        parse_arxiv_feed(&feed, max_results)
    }

    fn source(&self) -> SearchSource {
        SearchSource::Arxiv
    }
}

/// Parse an arXiv Atom feed into raw results.
///
/// Entries without a title or id are skipped.
fn parse_arxiv_feed(feed: &str, max_results: usize) -> Result<Vec<RawResult>, SearchError> {
    if !feed.contains("<feed") {
        return Err(SearchError::Parse("arXiv response is not an Atom feed".into()));
    }

    let document = Html::parse_document(feed);

    let entry_sel = Selector::parse("entry")
        .map_err(|e| SearchError::Parse(format!("invalid entry selector: {e:?}")))?;
    let title_sel = Selector::parse("title")
        .map_err(|e| SearchError::Parse(format!("invalid title selector: {e:?}")))?;
    let id_sel = Selector::parse("id")
        .map_err(|e| SearchError::Parse(format!("invalid id selector: {e:?}")))?;
    let summary_sel = Selector::parse("summary")
        .map_err(|e| SearchError::Parse(format!("invalid summary selector: {e:?}")))?;

    let mut results = Vec::new();

    for entry in document.select(&entry_sel) {
        let text_of = |sel: &Selector| {
            entry
                .select(sel)
                .next()
                .map(|el| collapse_whitespace(&el.text().collect::<String>()))
                .unwrap_or_default()
        };

        let title = text_of(&title_sel);
        let url = text_of(&id_sel);
        if title.is_empty() || url.is_empty() {
            continue;
        }

        results.push(RawResult {
            title,
            url,
            snippet: truncate_summary(&text_of(&summary_sel)),
            math_hint: true,
        });

        if results.len() >= max_results {
            break;
        }
    }

    tracing::debug!(count = results.len(), "arXiv results parsed");
    Ok(results)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_summary(summary: &str) -> String {
    if summary.chars().count() <= SUMMARY_MAX_CHARS {
        return summary.to_string();
    }
    let mut cut: String = summary.chars().take(SUMMARY_MAX_CHARS).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOCK_ARXIV_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <link href="http://arxiv.org/api/query?search_query%3Dall%3Aeigenvalue" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query: search_query=all:eigenvalue</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v1</id>
    <published>2021-01-01T00:00:00Z</published>
    <title>Bounds on the Largest
      Eigenvalue of Random Matrices</title>
    <summary>  We prove sharp bounds on the spectral radius of Wigner matrices.
    </summary>
    <author><name>A. Author</name></author>
    <link href="http://arxiv.org/abs/2101.00001v1" rel="alternate" type="text/html"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2101.00002v2</id>
    <title>Eigenvalue Problems for the p-Laplacian</title>
    <summary>LONG_SUMMARY</summary>
  </entry>
  <entry>
    <id></id>
    <title>Entry without an id</title>
    <summary>skipped</summary>
  </entry>
</feed>"#;

    fn feed() -> String {
        MOCK_ARXIV_FEED.replace("LONG_SUMMARY", &"x".repeat(250))
    }

    #[test]
    fn parse_mock_feed_returns_entries() {
        let results = parse_arxiv_feed(&feed(), 10).expect("should parse");
        assert_eq!(results.len(), 2);

        assert_eq!(
            results[0].title,
            "Bounds on the Largest Eigenvalue of Random Matrices"
        );
        assert_eq!(results[0].url, "http://arxiv.org/abs/2101.00001v1");
        assert_eq!(
            results[0].snippet,
            "We prove sharp bounds on the spectral radius of Wigner matrices."
        );
        assert!(results.iter().all(|r| r.math_hint));
    }

    #[test]
    fn long_summary_truncated() {
        let results = parse_arxiv_feed(&feed(), 10).expect("should parse");
        assert_eq!(results[1].snippet.chars().count(), SUMMARY_MAX_CHARS + 3);
        assert!(results[1].snippet.ends_with("..."));
    }

    #[test]
    fn parse_respects_max_results() {
        let results = parse_arxiv_feed(&feed(), 1).expect("should parse");
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn empty_feed_is_empty() {
        let empty = r#"<?xml version="1.0"?><feed xmlns="http://www.w3.org/2005/Atom"><title>none</title></feed>"#;
        assert!(parse_arxiv_feed(empty, 10).expect("parse").is_empty());
    }

    #[test]
    fn non_feed_is_parse_error() {
        let err = parse_arxiv_feed("Rate exceeded.", 10).unwrap_err();
        assert!(matches!(err, SearchError::Parse(_)));
    }

    #[test]
    fn truncate_keeps_short_summaries() {
        assert_eq!(truncate_summary("short"), "short");
    }

    #[tokio::test]
    async fn fetch_builds_arxiv_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("search_query", "all:eigenvalue"))
            .and(query_param("start", "0"))
            .and(query_param("max_results", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_string(feed()))
            .mount(&server)
            .await;

        let config = SearchConfig {
            arxiv_base_url: server.uri(),
            ..Default::default()
        };
        let provider = ArxivProvider::new(&config).expect("provider");
        let results = provider.fetch("eigenvalue", 5).await.expect("fetch");
        assert_eq!(results.len(), 2);
        assert_eq!(provider.source(), SearchSource::Arxiv);
    }

    #[tokio::test]
    #[ignore] // Live test — run with `cargo test -- --ignored`
    async fn live_arxiv_search() {
        let provider = ArxivProvider::new(&SearchConfig::default()).expect("provider");
        let results = provider.fetch("eigenvalue", 5).await.expect("live search");
        assert!(!results.is_empty());
        for r in &results {
            assert!(!r.title.is_empty());
            assert!(r.url.contains("arxiv.org"));
        }
    }
}
