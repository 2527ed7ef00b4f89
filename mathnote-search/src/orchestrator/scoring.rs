//! Relevance scoring and ranking of search results against a query.
//!
//! # Scoring Formula
//!
//! ```text
//! base   = 0.4 * similarity + 0.4 * overlap + 0.2 * title_coverage
//! signal = 1                       if the result is flagged as math content
//!        = max term confidence     if the detector finds math terms in it
//!        = 0                       otherwise
//! score  = min(1, base * (1 + boost_weight * signal))
//! ```
//!
//! - `similarity`: cosine of TF-IDF vectors of the query and
//!   `title + " " + snippet`, with a two-document IDF `ln(2 / df)` and
//!   weights `tf * (1 + idf)`.
//! - `overlap`: share of distinct query tokens present in the result text,
//!   multiplied by the weight of every math vocabulary token in the
//!   intersection, capped at 1.
//! - `title_coverage`: share of distinct query tokens present in the title.
//!
//! Every component lies in `[0, 1]` so `base` does too, and the boost can
//! only push the score up towards the cap.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::SearchError;
use crate::text::{is_stop_word, tokenize, MathDetector};
use crate::types::{clamp_unit, SearchResult};

const SIMILARITY_WEIGHT: f64 = 0.4;
const OVERLAP_WEIGHT: f64 = 0.4;
const TITLE_WEIGHT: f64 = 0.2;

/// Scores results with the formula above.
///
/// `boost_weight` is the single tunable; 0 disables the math boost.
#[derive(Clone)]
pub struct RelevanceCalculator {
    boost_weight: f64,
    detector: Arc<dyn MathDetector>,
}

impl std::fmt::Debug for RelevanceCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelevanceCalculator")
            .field("boost_weight", &self.boost_weight)
            .finish_non_exhaustive()
    }
}

impl RelevanceCalculator {
    /// Negative or non-finite weights are treated as 0.
    pub fn new(boost_weight: f64, detector: Arc<dyn MathDetector>) -> Self {
        let boost_weight = if boost_weight.is_finite() {
            boost_weight.max(0.0)
        } else {
            0.0
        };
        Self {
            boost_weight,
            detector,
        }
    }

    pub fn boost_weight(&self) -> f64 {
        self.boost_weight
    }

    /// Relevance of `result` to `query`, in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidInput`] if `query` is blank. Result
    /// content never causes an error.
    pub fn score(&self, query: &str, result: &SearchResult) -> Result<f64, SearchError> {
        let query_tokens = query_tokens(query)?;
        Ok(self.score_tokens(&query_tokens, result))
    }

    /// Score every result and order them by descending score.
    ///
    /// The sort is stable, so results with equal scores keep their input
    /// order. The output is a permutation of the input.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidInput`] if `query` is blank.
    pub fn rank(
        &self,
        query: &str,
        results: Vec<SearchResult>,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let query_tokens = query_tokens(query)?;

        let mut scored: Vec<SearchResult> = results
            .into_iter()
            .map(|r| {
                let score = self.score_tokens(&query_tokens, &r);
                r.with_relevance_score(score)
            })
            .collect();

        scored.sort_by(|a, b| b.relevance_score().total_cmp(&a.relevance_score()));
        Ok(scored)
    }

    fn score_tokens(&self, query_tokens: &[String], result: &SearchResult) -> f64 {
        let text = format!("{} {}", result.title(), result.snippet());
        let text_tokens = content_tokens(&text);

        let similarity = tfidf_cosine(query_tokens, &text_tokens);
        let overlap = weighted_overlap(query_tokens, &text_tokens);
        let title_coverage = coverage(query_tokens, &content_tokens(result.title()));

        let base = SIMILARITY_WEIGHT * similarity
            + OVERLAP_WEIGHT * overlap
            + TITLE_WEIGHT * title_coverage;

        let signal = if result.math_content_detected() {
            1.0
        } else {
            self.detector
                .detect_math(&text)
                .max_confidence()
                .unwrap_or(0.0)
        };

        clamp_unit(base * (1.0 + self.boost_weight * signal))
    }
}

fn query_tokens(query: &str) -> Result<Vec<String>, SearchError> {
    if query.trim().is_empty() {
        return Err(SearchError::InvalidInput("query must not be empty".into()));
    }
    Ok(content_tokens(query))
}

fn content_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !is_stop_word(t))
        .collect()
}

fn term_frequencies(tokens: &[String]) -> HashMap<&str, f64> {
    let mut tf: HashMap<&str, f64> = HashMap::new();
    for token in tokens {
        *tf.entry(token.as_str()).or_default() += 1.0;
    }
    let total = tokens.len() as f64;
    for count in tf.values_mut() {
        *count /= total;
    }
    tf
}

fn tfidf_cosine(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let tf_a = term_frequencies(a);
    let tf_b = term_frequencies(b);
    let vocabulary: HashSet<&str> = tf_a.keys().chain(tf_b.keys()).copied().collect();

    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for word in vocabulary {
        let in_a = tf_a.get(word).copied().unwrap_or(0.0);
        let in_b = tf_b.get(word).copied().unwrap_or(0.0);
        let df = f64::from(u8::from(in_a > 0.0) + u8::from(in_b > 0.0));
        let idf = (2.0 / df).ln();
        let wa = in_a * (1.0 + idf);
        let wb = in_b * (1.0 + idf);
        dot += wa * wb;
        norm_a += wa * wa;
        norm_b += wb * wb;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    clamp_unit(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

fn weighted_overlap(query: &[String], text: &[String]) -> f64 {
    let query: HashSet<&str> = query.iter().map(String::as_str).collect();
    if query.is_empty() {
        return 0.0;
    }
    let text: HashSet<&str> = text.iter().map(String::as_str).collect();
    let shared: Vec<&str> = query.intersection(&text).copied().collect();

    let ratio = shared.len() as f64 / query.len() as f64;
    let boost: f64 = shared.iter().filter_map(|t| math_term_weight(t)).product();
    (ratio * boost).min(1.0)
}

fn coverage(query: &[String], title: &[String]) -> f64 {
    let query: HashSet<&str> = query.iter().map(String::as_str).collect();
    if query.is_empty() {
        return 0.0;
    }
    let title: HashSet<&str> = title.iter().map(String::as_str).collect();
    query.intersection(&title).count() as f64 / query.len() as f64
}

/// Weight of a math vocabulary token in keyword overlap, `None` for
/// ordinary words.
fn math_term_weight(token: &str) -> Option<f64> {
    MATH_TERM_WEIGHTS
        .iter()
        .find(|(term, _)| *term == token)
        .map(|(_, weight)| *weight)
}

const MATH_TERM_WEIGHTS: &[(&str, f64)] = &[
    ("algebra", 1.6),
    ("calculus", 1.6),
    ("geometry", 1.6),
    ("topology", 1.7),
    ("analysis", 1.7),
    ("statistics", 1.5),
    ("probability", 1.5),
    ("combinatorics", 1.6),
    ("theorem", 1.4),
    ("lemma", 1.3),
    ("corollary", 1.3),
    ("proof", 1.3),
    ("axiom", 1.4),
    ("conjecture", 1.5),
    ("function", 1.3),
    ("derivative", 1.4),
    ("integral", 1.4),
    ("limit", 1.4),
    ("matrix", 1.3),
    ("vector", 1.3),
    ("polynomial", 1.3),
    ("logarithm", 1.3),
    ("series", 1.4),
    ("convergence", 1.4),
    ("equation", 1.3),
    ("inequality", 1.3),
    ("eigenvalue", 1.5),
    ("eigenvector", 1.5),
    ("manifold", 1.8),
    ("homomorphism", 1.8),
    ("isomorphism", 1.8),
    ("fourier", 1.6),
    ("laplace", 1.6),
    ("代数", 1.6),
    ("几何", 1.6),
    ("概率", 1.5),
    ("拓扑", 1.7),
    ("定理", 1.4),
    ("证明", 1.3),
    ("函数", 1.3),
    ("导数", 1.4),
    ("积分", 1.4),
    ("极限", 1.4),
    ("矩阵", 1.3),
    ("向量", 1.3),
    ("方程", 1.3),
    ("特征", 1.3),
];
