//! Shared sitemap parsing types.

pub use crate::models::{SitemapFormat, UrlRecord};

/// Detect the likely format of a sitemap source from its URL, per the
/// factory dispatch rules in §4.7.
#[must_use]
pub fn detect_format(url: &str) -> SitemapFormat {
    let lower = url.to_lowercase();
    if lower.ends_with(".xml.gz") || lower.ends_with(".gz") {
        SitemapFormat::XmlGz
    } else if lower.ends_with(".txt") {
        SitemapFormat::Txt
    } else if lower.contains("rss") || lower.contains("feed") {
        SitemapFormat::Rss
    } else if lower.ends_with(".xml") {
        SitemapFormat::Unknown // resolved to Xml vs Index by root-element sniffing during parse
    } else {
        SitemapFormat::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_gzip_and_txt_and_rss_by_suffix() {
        assert_eq!(detect_format("https://example.com/sitemap.xml.gz"), SitemapFormat::XmlGz);
        assert_eq!(detect_format("https://example.com/urls.txt"), SitemapFormat::Txt);
        assert_eq!(detect_format("https://example.com/feed/rss"), SitemapFormat::Rss);
    }
}
