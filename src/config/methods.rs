//! Environment-variable config loading (§6's configuration table).
//!
//! Config *file* loading is an out-of-scope external collaborator (§1);
//! this module reads the recognized environment variables directly.

use anyhow::{anyhow, Result};
use std::time::Duration;

use super::types::PipelineConfig;

fn env_usize(name: &str, default: usize) -> Result<usize> {
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .map_err(|e| anyhow!("invalid {name}: {e}")),
        Err(_) => Ok(default),
    }
}

/// Decode `ENCRYPTION_KEY` as a hex string into the 32 raw bytes C10's
/// AES-256-GCM cipher needs; hex keeps the env var printable regardless of
/// the key's byte content, unlike passing the raw bytes through directly.
fn decode_encryption_key(value: &str) -> Result<Vec<u8>> {
    hex::decode(value.trim()).map_err(|e| anyhow!("ENCRYPTION_KEY must be a hex-encoded string: {e}"))
}

fn env_f64(name: &str, default: f64) -> Result<f64> {
    match std::env::var(name) {
        Ok(v) => v.parse().map_err(|e| anyhow!("invalid {name}: {e}")),
        Err(_) => Ok(default),
    }
}

impl PipelineConfig {
    /// Build a [`PipelineConfig`] from the recognized environment variables
    /// in §6: `SITEMAP_URLS`, `TRENDS_API_URL`, `BACKEND_URL`,
    /// `BACKEND_API_KEY`, `ENCRYPTION_KEY`, `SITEMAP_WORKERS`, `API_WORKERS`,
    /// `API_RATE_LIMIT`, `SITEMAP_RATE_LIMIT`, `BATCH_SIZE`,
    /// `MAX_URLS_PER_SITEMAP`, `API_TIMEOUT`, `DEBUG`. `ENCRYPTION_KEY` is a
    /// hex-encoded 32-byte AES-256 key.
    ///
    /// # Errors
    /// Returns [`PipelineError::Config`](crate::errors::PipelineError::Config)
    /// (wrapped as `anyhow::Error`) when a required variable is missing or a
    /// numeric variable fails to parse.
    pub fn from_env() -> Result<Self> {
        let sitemap_urls: Vec<String> = std::env::var("SITEMAP_URLS")
            .map_err(|_| anyhow!("SITEMAP_URLS is required"))?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let backend_url =
            std::env::var("BACKEND_URL").map_err(|_| anyhow!("BACKEND_URL is required"))?;

        let trends_api_urls: Vec<String> = std::env::var("TRENDS_API_URL")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let mut builder = PipelineConfig::builder()
            .sitemap_urls(sitemap_urls)?
            .backend_url(backend_url)
            .trends_api_urls(trends_api_urls)
            .sitemap_workers(env_usize("SITEMAP_WORKERS", crate::utils::DEFAULT_SITEMAP_WORKERS)?)
            .api_workers(env_usize("API_WORKERS", crate::utils::DEFAULT_API_WORKERS)?)
            .api_rate_limit(env_f64("API_RATE_LIMIT", crate::utils::DEFAULT_API_RATE_LIMIT)?)
            .sitemap_rate_limit(env_f64(
                "SITEMAP_RATE_LIMIT",
                crate::utils::DEFAULT_SITEMAP_RATE_LIMIT,
            )?)
            .batch_size(env_usize("BATCH_SIZE", crate::utils::DEFAULT_BATCH_SIZE)?)
            .max_urls_per_sitemap(env_usize(
                "MAX_URLS_PER_SITEMAP",
                crate::utils::DEFAULT_MAX_URLS_PER_SITEMAP,
            )?)
            .debug(std::env::var("DEBUG").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")));

        if let Ok(key) = std::env::var("BACKEND_API_KEY") {
            builder = builder.backend_api_key(key);
        }
        if let Ok(key) = std::env::var("TRENDS_API_KEY") {
            builder = builder.trends_api_key(key);
        }
        if let Ok(key) = std::env::var("ENCRYPTION_KEY") {
            builder = builder.encryption_key(decode_encryption_key(&key)?);
        }
        if let Ok(secs) = std::env::var("API_TIMEOUT") {
            let secs: u64 = secs.parse().map_err(|e| anyhow!("invalid API_TIMEOUT: {e}"))?;
            builder = builder.api_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }
}
