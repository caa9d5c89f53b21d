//! Shared configuration constants for the keyword harvest pipeline
//!
//! Defaults mirror the environment-variable table in the specification;
//! keeping them centralized avoids magic numbers scattered through the
//! config, orchestrator, and client modules.

/// Default number of sitemap-parse workers (`SITEMAP_WORKERS`)
pub const DEFAULT_SITEMAP_WORKERS: usize = 15;

/// Default number of upstream-query workers (`API_WORKERS`)
pub const DEFAULT_API_WORKERS: usize = 2;

/// Default upstream keyword-API rate limit, requests/sec (`API_RATE_LIMIT`)
pub const DEFAULT_API_RATE_LIMIT: f64 = 1.0;

/// Default sitemap-fetch rate limit, requests/sec (`SITEMAP_RATE_LIMIT`)
pub const DEFAULT_SITEMAP_RATE_LIMIT: f64 = 30.0;

/// Default submission batch size (`BATCH_SIZE`)
pub const DEFAULT_BATCH_SIZE: usize = 300;

/// Default keyword-query batch size (keywords per upstream call)
pub const DEFAULT_QUERY_BATCH_SIZE: usize = 8;

/// Default per-sitemap URL cap (`MAX_URLS_PER_SITEMAP`)
pub const DEFAULT_MAX_URLS_PER_SITEMAP: usize = 100_000;

/// Default overall wall-clock run budget, seconds
pub const DEFAULT_RUN_BUDGET_SECS: u64 = 15 * 60;

/// Minimum keyword length (§3 Keyword constraints)
pub const KEYWORD_MIN_LEN: usize = 3;

/// Maximum keyword length (§3 Keyword constraints)
pub const KEYWORD_MAX_LEN: usize = 50;

/// Default consecutive-failure threshold before a URL-pool endpoint is
/// marked unhealthy
pub const DEFAULT_HEALTH_FAILURE_THRESHOLD: u32 = 3;

/// Default recovery window before an unhealthy endpoint is re-admitted, seconds
pub const DEFAULT_HEALTH_RECOVERY_SECS: u64 = 5 * 60;

/// Default max retries for the retry/backoff component
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default initial backoff delay, milliseconds
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 200;

/// Default backoff multiplier (range 1.5-2.0)
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Circuit breaker half-open probe limit
pub const DEFAULT_HALF_OPEN_LIMIT: u32 = 1;

/// User-Agent sent on upstream HTTP requests
pub const PIPELINE_USER_AGENT: &str = concat!("keyword-harvest-pipeline/", env!("CARGO_PKG_VERSION"));
