//! URL normalisation for search result deduplication.
//!
//! Canonicalises URLs so that equivalent pages compare as equal. Besides
//! the usual cosmetic differences (query order, tracking parameters,
//! fragments, capitalisation) this folds together the forms under which
//! the same paper shows up across providers: `http` vs `https`, a `www.`
//! prefix, and arXiv's versioned or PDF links.

use url::Url;

/// Tracking query parameters that are stripped during normalisation.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "msclkid",
    "ref",
];

const ARXIV_HOSTS: &[&str] = &["arxiv.org", "export.arxiv.org"];

/// Normalise a URL for deduplication comparison.
///
/// 1. Lowercase scheme and host (path is preserved as-is).
/// 2. Treat `http` as `https` and drop default ports.
/// 3. Strip a leading `www.` from the host.
/// 4. Rewrite arXiv `abs`/`pdf` links to the unversioned `abs` form.
/// 5. Strip tracking parameters and sort the rest by key.
/// 6. Remove the fragment and any trailing slash (except a bare `/`).
///
/// If the input cannot be parsed as a valid URL, it is returned unchanged.
///
/// # Examples
///
/// ```
/// use mathnote_search::orchestrator::url_normalize::normalize_url;
///
/// let a = normalize_url("http://www.arxiv.org/pdf/2101.00001v2.pdf");
/// let b = normalize_url("https://arxiv.org/abs/2101.00001");
/// assert_eq!(a, b);
/// ```
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    parsed.set_fragment(None);

    if is_default_port(&parsed) {
        let _ = parsed.set_port(None);
    }
    if parsed.scheme() == "http" {
        let _ = parsed.set_scheme("https");
    }

    if let Some(bare) = parsed
        .host_str()
        .and_then(|h| h.strip_prefix("www."))
        .map(str::to_owned)
    {
        let _ = parsed.set_host(Some(&bare));
    }

    if parsed
        .host_str()
        .is_some_and(|h| ARXIV_HOSTS.contains(&h))
    {
        let _ = parsed.set_host(Some("arxiv.org"));
        if let Some(id) = arxiv_id(parsed.path()) {
            parsed.set_path(&format!("/abs/{id}"));
        }
    }

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    if params.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(params.iter());
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(&path[..path.len() - 1]);
    }

    parsed.to_string()
}

/// Returns `true` if the URL uses the default port for its scheme.
fn is_default_port(url: &Url) -> bool {
    matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    )
}

/// Paper id from an arXiv `/abs/...` or `/pdf/...` path, without the
/// version suffix or `.pdf` extension.
fn arxiv_id(path: &str) -> Option<&str> {
    let rest = path
        .strip_prefix("/abs/")
        .or_else(|| path.strip_prefix("/pdf/"))?;
    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".pdf").unwrap_or(rest);

    let unversioned = match rest.rfind('v') {
        Some(pos)
            if pos > 0
                && rest[pos + 1..].chars().all(|c| c.is_ascii_digit())
                && pos + 1 < rest.len()
                && rest[..pos].ends_with(|c: char| c.is_ascii_digit()) =>
        {
            &rest[..pos]
        }
        _ => rest,
    };

    (!unversioned.is_empty()).then_some(unversioned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_scheme_and_host() {
        assert_eq!(
            normalize_url("HTTPS://Example.COM/Path"),
            "https://example.com/Path"
        );
    }

    #[test]
    fn removes_trailing_slash() {
        assert_eq!(
            normalize_url("https://example.com/path/"),
            "https://example.com/path"
        );
    }

    #[test]
    fn preserves_root_slash() {
        assert_eq!(normalize_url("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn http_folds_into_https() {
        assert_eq!(
            normalize_url("http://example.com:80/path"),
            "https://example.com/path"
        );
        assert_eq!(
            normalize_url("http://example.com/a"),
            normalize_url("https://example.com/a")
        );
    }

    #[test]
    fn preserves_non_default_port() {
        assert_eq!(
            normalize_url("https://example.com:8080/path"),
            "https://example.com:8080/path"
        );
    }

    #[test]
    fn strips_www_prefix() {
        assert_eq!(
            normalize_url("https://www.mathworld.wolfram.com/Matrix.html"),
            "https://mathworld.wolfram.com/Matrix.html"
        );
    }

    #[test]
    fn sorts_query_params() {
        assert_eq!(
            normalize_url("https://example.com/search?z=1&a=2&m=3"),
            "https://example.com/search?a=2&m=3&z=1"
        );
    }

    #[test]
    fn removes_tracking_params() {
        let result =
            normalize_url("https://example.com/page?q=rust&utm_source=google&fbclid=abc&gclid=xyz");
        assert_eq!(result, "https://example.com/page?q=rust");
    }

    #[test]
    fn tracking_keys_compared_case_insensitively() {
        assert_eq!(
            normalize_url("https://example.com/page?q=test&UTM_Source=twitter"),
            "https://example.com/page?q=test"
        );
    }

    #[test]
    fn removes_fragment() {
        assert_eq!(
            normalize_url("https://example.com/page#section"),
            "https://example.com/page"
        );
    }

    #[test]
    fn arxiv_versions_and_pdf_links_fold_together() {
        let canonical = "https://arxiv.org/abs/2101.00001";
        assert_eq!(normalize_url("http://arxiv.org/abs/2101.00001v1"), canonical);
        assert_eq!(normalize_url("https://arxiv.org/pdf/2101.00001v3"), canonical);
        assert_eq!(normalize_url("https://arxiv.org/pdf/2101.00001.pdf"), canonical);
        assert_eq!(normalize_url("http://export.arxiv.org/abs/2101.00001"), canonical);
    }

    #[test]
    fn arxiv_old_style_ids() {
        assert_eq!(
            normalize_url("http://arxiv.org/abs/math/0601001v2"),
            "https://arxiv.org/abs/math/0601001"
        );
    }

    #[test]
    fn arxiv_non_paper_paths_untouched() {
        assert_eq!(
            normalize_url("https://arxiv.org/list/math.AG/recent"),
            "https://arxiv.org/list/math.AG/recent"
        );
    }

    #[test]
    fn arxiv_id_parsing() {
        assert_eq!(arxiv_id("/abs/2101.00001v12"), Some("2101.00001"));
        assert_eq!(arxiv_id("/abs/2101.00001"), Some("2101.00001"));
        assert_eq!(arxiv_id("/abs/solv-int/9901001"), Some("solv-int/9901001"));
        assert_eq!(arxiv_id("/abs/"), None);
        assert_eq!(arxiv_id("/list/x"), None);
    }

    #[test]
    fn invalid_url_returned_unchanged() {
        let input = "not a url at all";
        assert_eq!(normalize_url(input), input);
        assert_eq!(normalize_url(""), "");
    }

    #[test]
    fn query_values_reencoded_consistently() {
        let a = normalize_url("https://example.com/search?q=hello+world&lang=en");
        let b = normalize_url("https://example.com/search?lang=en&q=hello%20world");
        assert_eq!(a, b);
        assert!(a.contains("lang=en"));
    }
}
