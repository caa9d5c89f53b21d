//! Core configuration type for the keyword harvest pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client tuning preset (§4.5 / §4.13): two named profiles ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpClientProfile {
    /// Conservative pool sizing, safe for small sitemap counts.
    Default,
    /// Larger connection pool and idle limits for wide sitemap fan-out.
    HighThroughput,
}

impl Default for HttpClientProfile {
    fn default() -> Self {
        Self::Default
    }
}

/// Process-wide configuration for a single pipeline run.
///
/// Assembled either via [`super::builder::PipelineConfigBuilder`] or
/// [`PipelineConfig::from_env`] (§6's environment-variable table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub(crate) sitemap_urls: Vec<String>,
    pub(crate) trends_api_urls: Vec<String>,
    pub(crate) backend_url: String,
    pub(crate) backend_api_key: Option<String>,
    pub(crate) trends_api_key: Option<String>,
    #[serde(skip)]
    pub(crate) encryption_key: Option<Vec<u8>>,
    pub(crate) sitemap_workers: usize,
    pub(crate) api_workers: usize,
    pub(crate) api_rate_limit: f64,
    pub(crate) sitemap_rate_limit: f64,
    pub(crate) batch_size: usize,
    pub(crate) query_batch_size: usize,
    pub(crate) max_urls_per_sitemap: usize,
    pub(crate) api_timeout: Option<Duration>,
    pub(crate) debug: bool,
    pub(crate) http_profile: HttpClientProfile,
    pub(crate) run_budget: Duration,
    pub(crate) retry_queue_path: std::path::PathBuf,
    pub(crate) gzip_submissions: bool,
}

impl PipelineConfig {
    /// Create a builder for configuring a [`PipelineConfig`] with a fluent,
    /// compile-time-checked interface.
    #[must_use]
    pub fn builder() -> super::builder::PipelineConfigBuilder<()> {
        super::builder::PipelineConfigBuilder::default()
    }
}
