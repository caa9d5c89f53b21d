//! Newline-separated plain-text sitemap parsing.

use crate::models::UrlRecord;
use crate::utils::is_valid_url;

/// Parse a `.txt` sitemap: one absolute URL per line, blank lines and
/// malformed entries dropped silently (there is no structure to recover).
#[must_use]
pub fn parse_txt_sitemap(text: &str, url_cap: usize) -> Vec<UrlRecord> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| is_valid_url(line))
        .take(url_cap)
        .map(UrlRecord::new)
        .collect()
}
