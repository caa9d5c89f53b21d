//! Resilient, multi-format sitemap acquisition and parsing (C7).

pub mod gzip;
pub mod index;
pub mod parser;
pub mod rss;
pub mod txt;
pub mod types;
pub mod xml;

pub use index::expand_source;
pub use parser::{select_parser, ParseOutcome, SitemapParser};
pub use types::detect_format;
