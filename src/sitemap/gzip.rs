//! Gzip-wrapped XML sitemap decompression, then delegation to [`super::xml`].

use flate2::read::GzDecoder;
use std::io::Read;

use crate::errors::PipelineError;
use crate::sitemap::xml::{self, XmlSitemapKind};

/// # Errors
/// Returns [`PipelineError::Parse`] if decompression fails, or propagates
/// the inner XML parser's error once decompressed.
pub fn parse_gzip_sitemap(bytes: &[u8], url_cap: usize) -> Result<XmlSitemapKind, PipelineError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| PipelineError::Parse(format!("gzip decompression failed: {e}")))?;
    xml::parse_xml_sitemap(&decompressed, url_cap)
}
