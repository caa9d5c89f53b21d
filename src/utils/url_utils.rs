//! URL validation and domain-extraction helpers shared across the pipeline.

use url::Url;

/// Check whether a string is a well-formed absolute HTTP(S) URL.
///
/// Used to enforce the URL-record invariant in §3 ("well-formed absolute
/// URL") before a URL is admitted into the extraction stage.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// Extract the lower-cased host from a URL string.
///
/// Returns `None` for unparsable URLs or URLs without a host component.
#[must_use]
pub fn extract_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(is_valid_url("https://example.com/sitemap.xml"));
        assert!(is_valid_url("http://example.com/a"));
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(!is_valid_url("ftp://example.com/a"));
        assert!(!is_valid_url("data:text/plain,hi"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn extracts_host() {
        assert_eq!(
            extract_host("https://Example.COM:8080/path").as_deref(),
            Some("example.com")
        );
        assert_eq!(extract_host("not a url"), None);
    }
}
