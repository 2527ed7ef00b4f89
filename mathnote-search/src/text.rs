//! Math-content detection, tokenization and keyword extraction.
//!
//! [`KeywordMathDetector`] recognises a fixed English and Chinese math
//! vocabulary, LaTeX markup and Unicode math symbols. It feeds two
//! consumers: the relevance calculator (as a boost signal) and the search
//! manager (keywords stored with each history row).

use std::collections::HashSet;

use crate::types::{MathCategory, MathTerm};

/// Upper bound on keywords extracted from one text.
pub const MAX_KEYWORDS: usize = 10;

/// Detected terms below this confidence are not used as keywords.
const KEYWORD_MIN_CONFIDENCE: f64 = 0.6;

const BASE_CONFIDENCE: f64 = 0.7;
const KNOWN_TERM_BONUS: f64 = 0.2;
const CONTEXT_BONUS: f64 = 0.1;
const SYMBOL_CONFIDENCE: f64 = 0.9;

/// Outcome of running a detector over a piece of text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MathDetection {
    pub math_content_detected: bool,
    /// Recognised terms, highest confidence first.
    pub terms: Vec<MathTerm>,
}

impl MathDetection {
    /// Highest term confidence, if any term was found.
    pub fn max_confidence(&self) -> Option<f64> {
        self.terms.iter().map(|t| t.confidence).reduce(f64::max)
    }
}

/// Finds mathematical content in free text.
pub trait MathDetector: Send + Sync {
    fn detect_math(&self, text: &str) -> MathDetection;

    /// Search keywords for `text`: recognised math terms first, then the
    /// remaining content words of three or more characters.
    ///
    /// Order preserving, case-insensitively unique, at most
    /// [`MAX_KEYWORDS`] entries.
    fn extract_keywords(&self, text: &str) -> Vec<String> {
        let detection = self.detect_math(text);

        let math_terms = detection
            .terms
            .iter()
            .filter(|t| t.confidence >= KEYWORD_MIN_CONFIDENCE)
            .map(|t| t.term.as_str());
        let content_words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= 3 && w.chars().any(char::is_alphabetic))
            .filter(|w| !is_stop_word(&w.to_lowercase()));

        let mut seen = HashSet::new();
        let mut keywords = Vec::new();
        for candidate in math_terms.chain(content_words) {
            if keywords.len() >= MAX_KEYWORDS {
                break;
            }
            if seen.insert(candidate.to_lowercase()) {
                keywords.push(candidate.to_string());
            }
        }
        keywords
    }
}

/// Vocabulary and symbol based detector. Stateless and cheap to share.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordMathDetector;

impl KeywordMathDetector {
    pub fn new() -> Self {
        Self
    }
}

impl MathDetector for KeywordMathDetector {
    fn detect_math(&self, text: &str) -> MathDetection {
        let lower = text.to_lowercase();
        let has_latex = LATEX_MARKERS.iter().any(|m| text.contains(m));
        let has_symbols = text.chars().any(is_math_symbol);
        let context = has_latex || has_symbols;

        let confidence = if context {
            (BASE_CONFIDENCE + KNOWN_TERM_BONUS + CONTEXT_BONUS).min(1.0)
        } else {
            BASE_CONFIDENCE + KNOWN_TERM_BONUS
        };

        // (position in `lower`, term); sorted by position for stable output.
        let mut found: Vec<(usize, MathTerm)> = Vec::new();

        for (surface, category) in ENGLISH_TERMS {
            if let Some(pos) = find_word(&lower, surface) {
                found.push((pos, vocabulary_term(surface, *category, confidence)));
            }
        }
        for (surface, category) in CHINESE_TERMS {
            if let Some(pos) = lower.find(surface) {
                found.push((pos, vocabulary_term(surface, *category, confidence)));
            }
        }
        for (pos, ch) in lower.char_indices().filter(|(_, c)| is_math_symbol(*c)) {
            let symbol = ch.to_string();
            found.push((
                pos,
                MathTerm {
                    term: symbol.clone(),
                    latex_representation: symbol,
                    category: MathCategory::Other,
                    confidence: SYMBOL_CONFIDENCE,
                },
            ));
        }

        found.sort_by_key(|(pos, _)| *pos);

        let mut seen = HashSet::new();
        let mut terms: Vec<MathTerm> = found
            .into_iter()
            .map(|(_, term)| term)
            .filter(|t| seen.insert((t.term.to_lowercase(), t.category)))
            .collect();
        terms.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        MathDetection {
            math_content_detected: has_latex || !terms.is_empty(),
            terms,
        }
    }
}

fn vocabulary_term(surface: &str, category: MathCategory, confidence: f64) -> MathTerm {
    MathTerm {
        term: surface.to_string(),
        latex_representation: latex_for(surface).unwrap_or(surface).to_string(),
        category,
        confidence,
    }
}

/// First occurrence of `needle` in `haystack` at word boundaries. A single
/// trailing `s` is accepted so plurals match.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    haystack.match_indices(needle).map(|(pos, _)| pos).find(|&pos| {
        let before_ok = haystack[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let mut after = haystack[pos + needle.len()..].chars();
        let after_ok = match after.next() {
            None => true,
            Some('s') => after.next().is_none_or(|c| !c.is_alphanumeric()),
            Some(c) => !c.is_alphanumeric(),
        };
        before_ok && after_ok
    })
}

/// Lowercased tokens of `text`.
///
/// Alphanumeric runs become one token each. Runs of CJK ideographs have no
/// word separators, so they are split into overlapping character bigrams
/// (a lone ideograph stays a unigram).
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut cjk_run: Vec<char> = Vec::new();

    for ch in text.chars() {
        if is_cjk(ch) {
            flush_word(&mut word, &mut tokens);
            cjk_run.push(ch);
        } else if ch.is_alphanumeric() {
            flush_cjk(&mut cjk_run, &mut tokens);
            word.extend(ch.to_lowercase());
        } else {
            flush_word(&mut word, &mut tokens);
            flush_cjk(&mut cjk_run, &mut tokens);
        }
    }
    flush_word(&mut word, &mut tokens);
    flush_cjk(&mut cjk_run, &mut tokens);

    tokens
}

fn flush_word(word: &mut String, tokens: &mut Vec<String>) {
    if !word.is_empty() {
        tokens.push(std::mem::take(word));
    }
}

fn flush_cjk(run: &mut Vec<char>, tokens: &mut Vec<String>) {
    match run.len() {
        0 => {}
        1 => tokens.push(run[0].to_string()),
        _ => tokens.extend(run.windows(2).map(|pair| pair.iter().collect::<String>())),
    }
    run.clear();
}

fn is_cjk(ch: char) -> bool {
    matches!(ch,
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}

/// True for English function words that carry no search meaning.
/// Expects a lowercased token.
pub fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

fn is_math_symbol(ch: char) -> bool {
    MATH_SYMBOLS.contains(&ch)
}

fn latex_for(term: &str) -> Option<&'static str> {
    LATEX_FORMS
        .iter()
        .find(|(t, _)| *t == term)
        .map(|(_, latex)| *latex)
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "each", "for", "from", "had",
    "has", "have", "he", "if", "in", "is", "it", "its", "of", "on", "or", "said", "that",
    "the", "their", "they", "this", "to", "was", "what", "which", "will", "with",
];

const LATEX_MARKERS: &[&str] = &[
    "$", "\\frac", "\\sum", "\\int", "\\lim", "\\sqrt", "\\begin{", "_{", "^{",
];

const MATH_SYMBOLS: &[char] = &[
    '∀', '∃', '∈', '∉', '⊂', '⊃', '⊆', '⊇', '∪', '∩', '∅', '∫', '∮', '∑', '∏', '∂', '∇',
    '∆', '≤', '≥', '≠', '≈', '≡', '∞', '±', '×', '÷', '√', 'α', 'β', 'γ', 'δ', 'ε', 'ζ',
    'η', 'θ', 'κ', 'λ', 'μ', 'ν', 'ξ', 'π', 'ρ', 'σ', 'τ', 'φ', 'χ', 'ψ', 'ω', 'Γ', 'Δ',
    'Θ', 'Λ', 'Ξ', 'Π', 'Σ', 'Φ', 'Ψ', 'Ω',
];

const LATEX_FORMS: &[(&str, &str)] = &[
    ("integral", "\\int"),
    ("derivative", "\\frac{d}{dx}"),
    ("limit", "\\lim"),
    ("infinity", "\\infty"),
    ("summation", "\\sum"),
    ("gradient", "\\nabla"),
    ("partial derivative", "\\partial"),
    ("determinant", "\\det"),
    ("积分", "\\int"),
    ("导数", "\\frac{d}{dx}"),
    ("极限", "\\lim"),
    ("无穷", "\\infty"),
    ("求和", "\\sum"),
    ("梯度", "\\nabla"),
    ("行列式", "\\det"),
];

use MathCategory::{
    Algebra, Analysis, Calculus, DifferentialEquations, DiscreteMath, Geometry, LinearAlgebra,
    NumberTheory, Statistics, Topology,
};

const ENGLISH_TERMS: &[(&str, MathCategory)] = &[
    ("linear algebra", LinearAlgebra),
    ("matrix", LinearAlgebra),
    ("matrices", LinearAlgebra),
    ("determinant", LinearAlgebra),
    ("eigenvalue", LinearAlgebra),
    ("eigenvector", LinearAlgebra),
    ("vector", LinearAlgebra),
    ("vector space", LinearAlgebra),
    ("linear transformation", LinearAlgebra),
    ("algebra", Algebra),
    ("polynomial", Algebra),
    ("equation", Algebra),
    ("coefficient", Algebra),
    ("quadratic", Algebra),
    ("homomorphism", Algebra),
    ("isomorphism", Algebra),
    ("group theory", Algebra),
    ("calculus", Calculus),
    ("derivative", Calculus),
    ("integral", Calculus),
    ("limit", Calculus),
    ("antiderivative", Calculus),
    ("partial derivative", Calculus),
    ("gradient", Calculus),
    ("divergence", Calculus),
    ("laplacian", Calculus),
    ("summation", Calculus),
    ("infinity", Calculus),
    ("geometry", Geometry),
    ("triangle", Geometry),
    ("ellipse", Geometry),
    ("parabola", Geometry),
    ("hyperbola", Geometry),
    ("polygon", Geometry),
    ("perpendicular", Geometry),
    ("statistics", Statistics),
    ("probability", Statistics),
    ("variance", Statistics),
    ("standard deviation", Statistics),
    ("correlation", Statistics),
    ("binomial", Statistics),
    ("poisson", Statistics),
    ("hypothesis test", Statistics),
    ("differential equation", DifferentialEquations),
    ("ode", DifferentialEquations),
    ("pde", DifferentialEquations),
    ("topology", Topology),
    ("manifold", Topology),
    ("homeomorphism", Topology),
    ("number theory", NumberTheory),
    ("prime number", NumberTheory),
    ("congruence", NumberTheory),
    ("combinatorics", DiscreteMath),
    ("graph theory", DiscreteMath),
    ("permutation", DiscreteMath),
    ("analysis", Analysis),
    ("convergence", Analysis),
    ("exponential", Analysis),
    ("logarithm", Analysis),
    ("trigonometric", Analysis),
    ("fourier", Analysis),
    ("theorem", MathCategory::Other),
    ("lemma", MathCategory::Other),
    ("corollary", MathCategory::Other),
    ("proof", MathCategory::Other),
    ("axiom", MathCategory::Other),
];

const CHINESE_TERMS: &[(&str, MathCategory)] = &[
    ("线性代数", LinearAlgebra),
    ("矩阵", LinearAlgebra),
    ("行列式", LinearAlgebra),
    ("特征值", LinearAlgebra),
    ("特征向量", LinearAlgebra),
    ("向量", LinearAlgebra),
    ("线性", Algebra),
    ("代数", Algebra),
    ("多项式", Algebra),
    ("方程", Algebra),
    ("函数", Algebra),
    ("微积分", Calculus),
    ("导数", Calculus),
    ("积分", Calculus),
    ("极限", Calculus),
    ("偏导数", Calculus),
    ("梯度", Calculus),
    ("无穷", Calculus),
    ("求和", Calculus),
    ("几何", Geometry),
    ("三角形", Geometry),
    ("椭圆", Geometry),
    ("抛物线", Geometry),
    ("双曲线", Geometry),
    ("概率", Statistics),
    ("统计", Statistics),
    ("方差", Statistics),
    ("正态分布", Statistics),
    ("微分方程", DifferentialEquations),
    ("拓扑", Topology),
    ("流形", Topology),
    ("数论", NumberTheory),
    ("素数", NumberTheory),
    ("组合数学", DiscreteMath),
    ("图论", DiscreteMath),
    ("数学分析", Analysis),
    ("级数", Analysis),
    ("定理", MathCategory::Other),
    ("证明", MathCategory::Other),
];
