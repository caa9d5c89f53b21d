//! Sitemap parser trait and factory dispatch (§4.7).

use async_trait::async_trait;

use crate::errors::PipelineError;
use crate::models::{SitemapFormat, UrlRecord};
use crate::sitemap::types::detect_format;
use crate::sitemap::xml::XmlSitemapKind;

/// Parse result before index-expansion is resolved: either a flat list of
/// URLs, or a list of child sitemap URLs for the caller to recurse into.
pub enum ParseOutcome {
    Urls(Vec<UrlRecord>),
    ChildSitemaps(Vec<String>),
}

/// One fetch-and-parse strategy for a single sitemap source (§4.7 contract:
/// `parse(ctx, sourceURL) -> [URL] | error`).
#[async_trait]
pub trait SitemapParser: Send + Sync {
    async fn parse(&self, body: &[u8], url_cap: usize) -> Result<ParseOutcome, PipelineError>;
}

pub struct XmlParser;
pub struct GzipXmlParser;
pub struct TxtParser;
pub struct RssParser;

#[async_trait]
impl SitemapParser for XmlParser {
    async fn parse(&self, body: &[u8], url_cap: usize) -> Result<ParseOutcome, PipelineError> {
        match crate::sitemap::xml::parse_xml_sitemap(body, url_cap)? {
            XmlSitemapKind::UrlSet(urls) => Ok(ParseOutcome::Urls(urls)),
            XmlSitemapKind::Index(locs) => Ok(ParseOutcome::ChildSitemaps(locs)),
        }
    }
}

#[async_trait]
impl SitemapParser for GzipXmlParser {
    async fn parse(&self, body: &[u8], url_cap: usize) -> Result<ParseOutcome, PipelineError> {
        match crate::sitemap::gzip::parse_gzip_sitemap(body, url_cap)? {
            XmlSitemapKind::UrlSet(urls) => Ok(ParseOutcome::Urls(urls)),
            XmlSitemapKind::Index(locs) => Ok(ParseOutcome::ChildSitemaps(locs)),
        }
    }
}

#[async_trait]
impl SitemapParser for TxtParser {
    async fn parse(&self, body: &[u8], url_cap: usize) -> Result<ParseOutcome, PipelineError> {
        let text = String::from_utf8_lossy(body);
        Ok(ParseOutcome::Urls(crate::sitemap::txt::parse_txt_sitemap(&text, url_cap)))
    }
}

#[async_trait]
impl SitemapParser for RssParser {
    async fn parse(&self, body: &[u8], url_cap: usize) -> Result<ParseOutcome, PipelineError> {
        Ok(ParseOutcome::Urls(crate::sitemap::rss::parse_rss_feed(body, url_cap)?))
    }
}

/// Select a parser for `url` by suffix and (when ambiguous) let the XML
/// parser's own root-element sniffing distinguish urlset from sitemapindex.
#[must_use]
pub fn select_parser(url: &str) -> Box<dyn SitemapParser> {
    match detect_format(url) {
        SitemapFormat::XmlGz => Box::new(GzipXmlParser),
        SitemapFormat::Txt => Box::new(TxtParser),
        SitemapFormat::Rss => Box::new(RssParser),
        SitemapFormat::Xml | SitemapFormat::Index | SitemapFormat::Unknown => Box::new(XmlParser),
    }
}
