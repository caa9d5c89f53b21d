//! Type-safe builder for `PipelineConfig` using the typestate pattern.
//!
//! Mirrors the teacher's `CrawlConfigBuilder<State>`: two required fields
//! (at least one sitemap URL, a backend URL) are threaded through distinct
//! marker states so `.build()` only becomes callable once both are set.

use crate::utils::{
    DEFAULT_API_RATE_LIMIT, DEFAULT_API_WORKERS, DEFAULT_BATCH_SIZE, DEFAULT_MAX_URLS_PER_SITEMAP,
    DEFAULT_QUERY_BATCH_SIZE, DEFAULT_RUN_BUDGET_SECS, DEFAULT_SITEMAP_RATE_LIMIT,
    DEFAULT_SITEMAP_WORKERS,
};
use anyhow::{anyhow, Result};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::time::Duration;

use super::types::{HttpClientProfile, PipelineConfig};

// Type states for the builder.
pub struct WithSitemapUrls;
pub struct Complete;

pub struct PipelineConfigBuilder<State = ()> {
    pub(crate) sitemap_urls: Option<Vec<String>>,
    pub(crate) trends_api_urls: Vec<String>,
    pub(crate) backend_url: Option<String>,
    pub(crate) backend_api_key: Option<String>,
    pub(crate) trends_api_key: Option<String>,
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
    pub(crate) retry_queue_path: PathBuf,
    pub(crate) gzip_submissions: bool,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for PipelineConfigBuilder<()> {
    fn default() -> Self {
        Self {
            sitemap_urls: None,
            trends_api_urls: Vec::new(),
            backend_url: None,
            backend_api_key: None,
            trends_api_key: None,
            encryption_key: None,
            sitemap_workers: DEFAULT_SITEMAP_WORKERS,
            api_workers: DEFAULT_API_WORKERS,
            api_rate_limit: DEFAULT_API_RATE_LIMIT,
            sitemap_rate_limit: DEFAULT_SITEMAP_RATE_LIMIT,
            batch_size: DEFAULT_BATCH_SIZE,
            query_batch_size: DEFAULT_QUERY_BATCH_SIZE,
            max_urls_per_sitemap: DEFAULT_MAX_URLS_PER_SITEMAP,
            api_timeout: None,
            debug: false,
            http_profile: HttpClientProfile::Default,
            run_budget: Duration::from_secs(DEFAULT_RUN_BUDGET_SECS),
            retry_queue_path: PathBuf::from("failed_keywords.enc"),
            gzip_submissions: false,
            _phantom: PhantomData,
        }
    }
}

impl PipelineConfigBuilder<()> {
    /// Set the sitemap roots to harvest (§3 Sitemap source, `SITEMAP_URLS`).
    ///
    /// # Errors
    /// Returns an error if `urls` is empty.
    pub fn sitemap_urls(
        self,
        urls: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<PipelineConfigBuilder<WithSitemapUrls>> {
        let urls: Vec<String> = urls.into_iter().map(Into::into).collect();
        if urls.is_empty() {
            return Err(anyhow!("sitemap_urls must contain at least one URL"));
        }
        Ok(PipelineConfigBuilder {
            sitemap_urls: Some(urls),
            trends_api_urls: self.trends_api_urls,
            backend_url: self.backend_url,
            backend_api_key: self.backend_api_key,
            trends_api_key: self.trends_api_key,
            encryption_key: self.encryption_key,
            sitemap_workers: self.sitemap_workers,
            api_workers: self.api_workers,
            api_rate_limit: self.api_rate_limit,
            sitemap_rate_limit: self.sitemap_rate_limit,
            batch_size: self.batch_size,
            query_batch_size: self.query_batch_size,
            max_urls_per_sitemap: self.max_urls_per_sitemap,
            api_timeout: self.api_timeout,
            debug: self.debug,
            http_profile: self.http_profile,
            run_budget: self.run_budget,
            retry_queue_path: self.retry_queue_path,
            gzip_submissions: self.gzip_submissions,
            _phantom: PhantomData,
        })
    }
}

impl PipelineConfigBuilder<WithSitemapUrls> {
    /// Set the downstream ingestion endpoint (`BACKEND_URL`).
    #[must_use]
    pub fn backend_url(self, url: impl Into<String>) -> PipelineConfigBuilder<Complete> {
        PipelineConfigBuilder {
            sitemap_urls: self.sitemap_urls,
            trends_api_urls: self.trends_api_urls,
            backend_url: Some(url.into()),
            backend_api_key: self.backend_api_key,
            trends_api_key: self.trends_api_key,
            encryption_key: self.encryption_key,
            sitemap_workers: self.sitemap_workers,
            api_workers: self.api_workers,
            api_rate_limit: self.api_rate_limit,
            sitemap_rate_limit: self.sitemap_rate_limit,
            batch_size: self.batch_size,
            query_batch_size: self.query_batch_size,
            max_urls_per_sitemap: self.max_urls_per_sitemap,
            api_timeout: self.api_timeout,
            debug: self.debug,
            http_profile: self.http_profile,
            run_budget: self.run_budget,
            retry_queue_path: self.retry_queue_path,
            gzip_submissions: self.gzip_submissions,
            _phantom: PhantomData,
        }
    }
}

impl PipelineConfigBuilder<Complete> {
    /// Build the final, validated [`PipelineConfig`].
    ///
    /// # Errors
    /// Returns an error if any configured URL fails to parse, or if
    /// numeric fields are out of the accepted range.
    pub fn build(self) -> Result<PipelineConfig> {
        let sitemap_urls = self
            .sitemap_urls
            .ok_or_else(|| anyhow!("sitemap_urls is required"))?;
        let backend_url = self
            .backend_url
            .ok_or_else(|| anyhow!("backend_url is required"))?;

        for url in sitemap_urls.iter().chain(self.trends_api_urls.iter()).chain(std::iter::once(&backend_url)) {
            url::Url::parse(url).map_err(|e| anyhow!("invalid URL '{url}': {e}"))?;
        }

        if self.sitemap_workers == 0 || self.api_workers == 0 {
            return Err(anyhow!("worker pool sizes must be greater than zero"));
        }
        if self.batch_size == 0 || self.query_batch_size == 0 {
            return Err(anyhow!("batch sizes must be greater than zero"));
        }

        Ok(PipelineConfig {
            sitemap_urls,
            trends_api_urls: self.trends_api_urls,
            backend_url,
            backend_api_key: self.backend_api_key,
            trends_api_key: self.trends_api_key,
            encryption_key: self.encryption_key,
            sitemap_workers: self.sitemap_workers,
            api_workers: self.api_workers,
            api_rate_limit: self.api_rate_limit,
            sitemap_rate_limit: self.sitemap_rate_limit,
            batch_size: self.batch_size,
            query_batch_size: self.query_batch_size,
            max_urls_per_sitemap: self.max_urls_per_sitemap,
            api_timeout: self.api_timeout,
            debug: self.debug,
            http_profile: self.http_profile,
            run_budget: self.run_budget,
            retry_queue_path: self.retry_queue_path,
            gzip_submissions: self.gzip_submissions,
        })
    }
}

// Builder methods available at any state.
impl<State> PipelineConfigBuilder<State> {
    #[must_use]
    pub fn trends_api_urls(mut self, urls: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.trends_api_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn backend_api_key(mut self, key: impl Into<String>) -> Self {
        self.backend_api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn trends_api_key(mut self, key: impl Into<String>) -> Self {
        self.trends_api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn encryption_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn sitemap_workers(mut self, n: usize) -> Self {
        self.sitemap_workers = n;
        self
    }

    #[must_use]
    pub fn api_workers(mut self, n: usize) -> Self {
        self.api_workers = n;
        self
    }

    #[must_use]
    pub fn api_rate_limit(mut self, rps: f64) -> Self {
        self.api_rate_limit = rps;
        self
    }

    #[must_use]
    pub fn sitemap_rate_limit(mut self, rps: f64) -> Self {
        self.sitemap_rate_limit = rps;
        self
    }

    #[must_use]
    pub fn batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    #[must_use]
    pub fn query_batch_size(mut self, n: usize) -> Self {
        self.query_batch_size = n;
        self
    }

    #[must_use]
    pub fn max_urls_per_sitemap(mut self, n: usize) -> Self {
        self.max_urls_per_sitemap = n;
        self
    }

    #[must_use]
    pub fn api_timeout(mut self, timeout: Duration) -> Self {
        self.api_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn http_profile(mut self, profile: HttpClientProfile) -> Self {
        self.http_profile = profile;
        self
    }

    #[must_use]
    pub fn run_budget(mut self, budget: Duration) -> Self {
        self.run_budget = budget;
        self
    }

    #[must_use]
    pub fn retry_queue_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.retry_queue_path = path.into();
        self
    }

    #[must_use]
    pub fn gzip_submissions(mut self, enabled: bool) -> Self {
        self.gzip_submissions = enabled;
        self
    }
}
