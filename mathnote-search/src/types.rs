//! Core data entities: search results, history rows, math terms and
//! source identification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SearchError;

/// External search provider a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchSource {
    /// Google Custom Search JSON API.
    Google,
    /// Bing Web Search API.
    Bing,
    /// arXiv Atom query API.
    Arxiv,
    /// Anything else. Can label a result but can never be requested.
    Other,
}

impl SearchSource {
    /// Returns the lowercase identifier used in config files and the CLI.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Bing => "bing",
            Self::Arxiv => "arxiv",
            Self::Other => "other",
        }
    }

    /// Sources that a caller may ask the search manager to query.
    pub fn requestable() -> &'static [SearchSource] {
        &[Self::Google, Self::Bing, Self::Arxiv]
    }
}

impl fmt::Display for SearchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SearchSource {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "bing" => Ok(Self::Bing),
            "arxiv" => Ok(Self::Arxiv),
            "other" => Ok(Self::Other),
            other => Err(SearchError::InvalidInput(format!(
                "unknown search source: {other}"
            ))),
        }
    }
}

/// One hit as returned by a provider, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
    /// The provider knows its content is mathematical (arXiv).
    pub math_hint: bool,
}

/// A single validated search hit.
///
/// Immutable once constructed: fields are private and the only way to
/// change the relevance score is [`SearchResult::with_relevance_score`],
/// which returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SearchResultRecord")]
pub struct SearchResult {
    title: String,
    url: String,
    snippet: String,
    source: SearchSource,
    relevance_score: f64,
    timestamp: DateTime<Utc>,
    math_content_detected: bool,
}

impl SearchResult {
    /// Build a result stamped with the current time and a zero score.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidInput`] if the title or url is empty
    /// (after trimming) or the url is not an absolute URL.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
        source: SearchSource,
        math_content_detected: bool,
    ) -> Result<Self, SearchError> {
        let title = title.into().trim().to_string();
        let url = url.into().trim().to_string();
        validate_title_and_url(&title, &url)?;
        Ok(Self {
            title,
            url,
            snippet: snippet.into().trim().to_string(),
            source,
            relevance_score: 0.0,
            timestamp: Utc::now(),
            math_content_detected,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn snippet(&self) -> &str {
        &self.snippet
    }

    pub fn source(&self) -> SearchSource {
        self.source
    }

    /// Relevance in `[0, 1]`, higher is better.
    pub fn relevance_score(&self) -> f64 {
        self.relevance_score
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn math_content_detected(&self) -> bool {
        self.math_content_detected
    }

    /// Returns a copy carrying `score`, clamped to `[0, 1]` (NaN becomes 0).
    #[must_use]
    pub fn with_relevance_score(self, score: f64) -> Self {
        Self {
            relevance_score: clamp_unit(score),
            ..self
        }
    }
}

fn validate_title_and_url(title: &str, url: &str) -> Result<(), SearchError> {
    if title.is_empty() {
        return Err(SearchError::InvalidInput("result title must not be empty".into()));
    }
    if url.is_empty() {
        return Err(SearchError::InvalidInput("result url must not be empty".into()));
    }
    url::Url::parse(url)
        .map_err(|e| SearchError::InvalidInput(format!("result url {url:?} is not a URL: {e}")))?;
    Ok(())
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Wire form of [`SearchResult`]; deserialization re-runs validation.
#[derive(Deserialize)]
struct SearchResultRecord {
    title: String,
    url: String,
    #[serde(default)]
    snippet: String,
    source: SearchSource,
    relevance_score: f64,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    math_content_detected: bool,
}

impl TryFrom<SearchResultRecord> for SearchResult {
    type Error = SearchError;

    fn try_from(record: SearchResultRecord) -> Result<Self, Self::Error> {
        validate_title_and_url(&record.title, &record.url)?;
        if !(0.0..=1.0).contains(&record.relevance_score) {
            return Err(SearchError::InvalidInput(format!(
                "relevance_score {} outside [0, 1]",
                record.relevance_score
            )));
        }
        Ok(Self {
            title: record.title,
            url: record.url,
            snippet: record.snippet,
            source: record.source,
            relevance_score: record.relevance_score,
            timestamp: record.timestamp,
            math_content_detected: record.math_content_detected,
        })
    }
}

/// One completed search, as persisted by the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistory {
    /// Assigned by the store on save; `None` before that.
    pub id: Option<i64>,
    pub query_text: String,
    pub extracted_keywords: Vec<String>,
    pub result_count: usize,
    pub top_result_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SearchHistory {
    /// Create an unsaved history row stamped with the current time.
    pub fn new(
        query_text: impl Into<String>,
        extracted_keywords: Vec<String>,
        result_count: usize,
        top_result_url: Option<String>,
    ) -> Self {
        Self {
            id: None,
            query_text: query_text.into(),
            extracted_keywords,
            result_count,
            top_result_url,
            timestamp: Utc::now(),
        }
    }

    /// One-line description for history listings.
    pub fn summary(&self) -> String {
        let mut keywords = self
            .extracted_keywords
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ");
        if self.extracted_keywords.len() > 3 {
            keywords.push_str("...");
        }

        let mut query: String = self.query_text.chars().take(50).collect();
        if self.query_text.chars().count() > 50 {
            query.push_str("...");
        }

        format!(
            "query: {query} | keywords: {keywords} | results: {}",
            self.result_count
        )
    }
}

/// Branch of mathematics a recognised term belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MathCategory {
    Algebra,
    Calculus,
    Geometry,
    Statistics,
    LinearAlgebra,
    DifferentialEquations,
    Topology,
    NumberTheory,
    DiscreteMath,
    Analysis,
    Other,
}

/// A mathematical term recognised in free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathTerm {
    pub term: String,
    pub latex_representation: String,
    pub category: MathCategory,
    pub confidence: f64,
}

impl MathTerm {
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidInput`] for an empty term or a
    /// confidence outside `[0, 1]`.
    pub fn new(
        term: impl Into<String>,
        latex_representation: impl Into<String>,
        category: MathCategory,
        confidence: f64,
    ) -> Result<Self, SearchError> {
        let term = term.into();
        if term.trim().is_empty() {
            return Err(SearchError::InvalidInput("math term must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(SearchError::InvalidInput(format!(
                "math term confidence {confidence} outside [0, 1]"
            )));
        }
        Ok(Self {
            term,
            latex_representation: latex_representation.into(),
            category,
            confidence,
        })
    }

    pub fn is_high_confidence(&self) -> bool {
        self.confidence >= 0.8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> SearchResult {
        SearchResult::new(
            "Linear algebra",
            "https://example.com/la",
            "Vectors and matrices",
            SearchSource::Google,
            false,
        )
        .expect("valid result")
    }

    #[test]
    fn empty_title_rejected() {
        let err = SearchResult::new("  ", "https://a.com", "", SearchSource::Bing, false)
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn empty_url_rejected() {
        let err = SearchResult::new("Title", "", "", SearchSource::Bing, false).unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn relative_url_rejected() {
        let err =
            SearchResult::new("Title", "/not/absolute", "", SearchSource::Bing, false).unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
    }

    #[test]
    fn new_result_starts_at_zero_score() {
        let r = result();
        assert_eq!(r.relevance_score(), 0.0);
        assert_eq!(r.source(), SearchSource::Google);
        assert_eq!(r.title(), "Linear algebra");
    }

    #[test]
    fn relevance_score_is_clamped() {
        assert_eq!(result().with_relevance_score(1.7).relevance_score(), 1.0);
        assert_eq!(result().with_relevance_score(-0.3).relevance_score(), 0.0);
        assert_eq!(result().with_relevance_score(f64::NAN).relevance_score(), 0.0);
        let r = result().with_relevance_score(0.42);
        assert!((r.relevance_score() - 0.42).abs() < f64::EPSILON);
    }

    #[test]
    fn deserialize_revalidates() {
        let value = serde_json::to_value(result().with_relevance_score(0.5)).expect("serialize");
        let decoded: SearchResult = serde_json::from_value(value.clone()).expect("deserialize");
        assert_eq!(decoded.url(), "https://example.com/la");

        let mut bad = value.clone();
        bad["url"] = serde_json::json!("");
        assert!(serde_json::from_value::<SearchResult>(bad).is_err());

        let mut out_of_range = value;
        out_of_range["relevance_score"] = serde_json::json!(1.5);
        assert!(serde_json::from_value::<SearchResult>(out_of_range).is_err());
    }

    #[test]
    fn source_parse_and_display() {
        for source in SearchSource::requestable() {
            let parsed: SearchSource = source.id().parse().expect("parse");
            assert_eq!(parsed, *source);
        }
        assert_eq!("ArXiv".parse::<SearchSource>().ok(), Some(SearchSource::Arxiv));
        assert!("yahoo".parse::<SearchSource>().is_err());
        assert_eq!(SearchSource::Bing.to_string(), "bing");
        assert!(!SearchSource::requestable().contains(&SearchSource::Other));
    }

    #[test]
    fn history_summary_truncates() {
        let history = SearchHistory::new(
            "a".repeat(60),
            vec!["matrix".into(), "vector".into(), "eigenvalue".into(), "basis".into()],
            5,
            None,
        );
        let summary = history.summary();
        assert!(summary.contains(&format!("{}...", "a".repeat(50))));
        assert!(summary.contains("matrix, vector, eigenvalue..."));
        assert!(summary.ends_with("results: 5"));
        assert!(history.id.is_none());
    }

    #[test]
    fn math_term_validation() {
        assert!(MathTerm::new("", "", MathCategory::Other, 0.5).is_err());
        assert!(MathTerm::new("integral", "\\int", MathCategory::Calculus, 1.2).is_err());
        let term = MathTerm::new("integral", "\\int", MathCategory::Calculus, 0.9)
            .expect("valid term");
        assert!(term.is_high_confidence());
    }

    #[test]
    fn math_category_serde_snake_case() {
        let json = serde_json::to_string(&MathCategory::LinearAlgebra).expect("serialize");
        assert_eq!(json, "\"linear_algebra\"");
    }
}
