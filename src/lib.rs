//! Periodic sitemap-to-keyword harvesting and enrichment pipeline.
//!
//! Harvests URLs from configured sitemap feeds, extracts normalized search
//! keywords, enriches them via upstream keyword APIs, and submits the
//! enriched records in batches to a downstream ingestion service.

pub mod config;
pub mod errors;
pub mod keyword_extractor;
pub mod models;
pub mod pipeline;
pub mod sitemap;
pub mod utils;

pub use errors::PipelineError;
pub use models::RunSummary;
pub use pipeline::Orchestrator;
