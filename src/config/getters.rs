//! Accessor methods for `PipelineConfig`.

use std::path::Path;
use std::time::Duration;

use super::types::{HttpClientProfile, PipelineConfig};

impl PipelineConfig {
    #[must_use]
    pub fn sitemap_urls(&self) -> &[String] {
        &self.sitemap_urls
    }

    #[must_use]
    pub fn trends_api_urls(&self) -> &[String] {
        &self.trends_api_urls
    }

    #[must_use]
    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }

    #[must_use]
    pub fn backend_api_key(&self) -> Option<&str> {
        self.backend_api_key.as_deref()
    }

    #[must_use]
    pub fn trends_api_key(&self) -> Option<&str> {
        self.trends_api_key.as_deref()
    }

    #[must_use]
    pub fn encryption_key(&self) -> Option<&[u8]> {
        self.encryption_key.as_deref()
    }

    #[must_use]
    pub fn sitemap_workers(&self) -> usize {
        self.sitemap_workers
    }

    #[must_use]
    pub fn api_workers(&self) -> usize {
        self.api_workers
    }

    #[must_use]
    pub fn api_rate_limit(&self) -> f64 {
        self.api_rate_limit
    }

    #[must_use]
    pub fn sitemap_rate_limit(&self) -> f64 {
        self.sitemap_rate_limit
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn query_batch_size(&self) -> usize {
        self.query_batch_size
    }

    #[must_use]
    pub fn max_urls_per_sitemap(&self) -> usize {
        self.max_urls_per_sitemap
    }

    #[must_use]
    pub fn api_timeout(&self) -> Option<Duration> {
        self.api_timeout
    }

    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub fn http_profile(&self) -> HttpClientProfile {
        self.http_profile
    }

    #[must_use]
    pub fn run_budget(&self) -> Duration {
        self.run_budget
    }

    #[must_use]
    pub fn retry_queue_path(&self) -> &Path {
        &self.retry_queue_path
    }

    #[must_use]
    pub fn gzip_submissions(&self) -> bool {
        self.gzip_submissions
    }
}
