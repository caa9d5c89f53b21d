//! Orchestrator (C11): drives the end-to-end pipeline (§4.11).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;
use crate::errors::PipelineError;
use crate::keyword_extractor;
use crate::models::{EnrichedKeyword, FailedKeyword, RunSummary, SourceOutcome};
use crate::pipeline::circuit_breaker::CircuitBreaker;
use crate::pipeline::http_client;
use crate::pipeline::keyword_api_client::KeywordApiClient;
use crate::pipeline::persistence::EncryptedStore;
use crate::pipeline::rate_limiter::RateLimiter;
use crate::pipeline::retry::RetryPolicy;
use crate::pipeline::submission;
use crate::pipeline::url_pool::UrlPool;
use crate::pipeline::worker_pool::WorkerPool;
use crate::sitemap;

/// Drives the full pipeline for one invocation: ingest sitemaps, extract
/// keywords, deduplicate, merge the retry queue, query upstream in
/// batches, submit downstream in batches, persist the updated retry
/// queue, and return a [`RunSummary`] (§4.11 steps 1-7).
pub struct Orchestrator {
    config: PipelineConfig,
    http: reqwest::Client,
}

impl Orchestrator {
    /// # Errors
    /// Returns [`PipelineError::Config`] if the HTTP client fails to build.
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let http = http_client::build_client(config.http_profile(), config.api_timeout())
            .map_err(|e| PipelineError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Run the pipeline to completion or until the configured wall-clock
    /// budget expires.
    pub async fn run(&self) -> RunSummary {
        let root_token = CancellationToken::new();
        let budget = self.config.run_budget();
        let deadline_token = root_token.clone();
        let deadline_guard = tokio::spawn(async move {
            tokio::time::sleep(budget).await;
            deadline_token.cancel();
        });

        let summary = self.run_with_token(&root_token).await;
        deadline_guard.abort();
        summary
    }

    async fn run_with_token(&self, token: &CancellationToken) -> RunSummary {
        let mut summary = RunSummary::new();

        // Step 1-2: ingest sitemaps via C9/C7, extract keywords via C8.
        let sitemap_pool = WorkerPool::spawn(self.config.sitemap_workers(), 64, {
            let http = self.http.clone();
            let rate_limiter = Arc::new(RateLimiter::new(self.config.sitemap_rate_limit()));
            let token = token.clone();
            let url_cap = self.config.max_urls_per_sitemap();
            move |sitemap_url: String| {
                let http = http.clone();
                let rate_limiter = Arc::clone(&rate_limiter);
                let token = token.clone();
                async move {
                    let outcome = ingest_sitemap(&http, &rate_limiter, &sitemap_url, url_cap, &token).await;
                    (sitemap_url, outcome)
                }
            }
        });

        let mut sitemap_pool = sitemap_pool;
        let mut submitted = 0usize;
        for sitemap_url in self.config.sitemap_urls() {
            if sitemap_pool.submit(sitemap_url.clone()).await.is_err() {
                break;
            }
            submitted += 1;
        }

        let mut keyword_to_source: HashMap<String, String> = HashMap::new();
        let mut urls_total = 0usize;

        for _ in 0..submitted {
            let Some((sitemap_url, outcome)) = sitemap_pool.recv().await else { break };
            match outcome {
                Ok(urls) => {
                    urls_total += urls.len();
                    for url_record in &urls {
                        let extraction = keyword_extractor::extract(&url_record.url);
                        if let Some(primary) = extraction.primary {
                            keyword_to_source
                                .entry(primary.as_str().to_string())
                                .or_insert_with(|| sitemap_url.clone());
                        }
                    }
                    summary.sources.push(SourceOutcome {
                        sitemap_url,
                        succeeded: true,
                        urls_found: urls.len(),
                        error: None,
                    });
                }
                Err(err) => {
                    summary.sources.push(SourceOutcome {
                        sitemap_url,
                        succeeded: false,
                        urls_found: 0,
                        error: Some(err.to_string()),
                    });
                }
            }
        }
        sitemap_pool.stop().await;

        // Step 3: deduplicate globally (already guaranteed by the HashMap above).
        summary.urls_total = urls_total;
        summary.keywords_deduplicated = keyword_to_source.len();

        // Step 4: load retry queue and merge (excluding not-yet-due items).
        let store = self.open_store();
        let now_unix = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        let mut deferred: Vec<FailedKeyword> = Vec::new();
        let mut retry_info: HashMap<String, FailedKeyword> = HashMap::new();

        if let Some(store) = &store {
            match store.load() {
                Ok(previous) => {
                    for item in previous {
                        if item.is_due(now_unix) {
                            keyword_to_source
                                .entry(item.keyword.clone())
                                .or_insert_with(|| item.source_sitemap.clone());
                            retry_info.insert(item.keyword.clone(), item);
                        } else {
                            deferred.push(item);
                        }
                    }
                }
                Err(err) => log::warn!("failed to load retry queue, starting fresh: {err}"),
            }
        }

        if token.is_cancelled() {
            self.persist_and_summarize(&store, deferred, &mut summary);
            return summary;
        }

        // Step 5: query upstream in batches of query_batch_size.
        let keywords: Vec<String> = keyword_to_source.keys().cloned().collect();
        let enriched = self
            .enrich_keywords(&keywords, &keyword_to_source, &retry_info, token, &mut deferred, now_unix)
            .await;

        // Step 6: submit enriched records downstream in batches of batch_size.
        self.submit_all(&enriched, token, &mut summary).await;

        // Step 7: persist and summarize.
        self.persist_and_summarize(&store, deferred, &mut summary);
        summary
    }

    fn open_store(&self) -> Option<EncryptedStore> {
        let key = self.config.encryption_key()?;
        match EncryptedStore::new(self.config.retry_queue_path(), key) {
            Ok(store) => Some(store),
            Err(err) => {
                log::error!("failed to initialize encrypted retry-queue store: {err}");
                None
            }
        }
    }

    /// Queries upstream in batches of `query_batch_size`, fanned out across
    /// the C9 worker pool with concurrency capped by `API_WORKERS` and
    /// paced per endpoint by C4 (§4.11 step 5).
    async fn enrich_keywords(
        &self,
        keywords: &[String],
        keyword_to_source: &HashMap<String, String>,
        retry_info: &HashMap<String, FailedKeyword>,
        token: &CancellationToken,
        deferred: &mut Vec<FailedKeyword>,
        now_unix: u64,
    ) -> Vec<EnrichedKeyword> {
        let pool = match UrlPool::from_config_str(&self.config.trends_api_urls().join(",")) {
            Ok(pool) => Arc::new(pool),
            Err(err) => {
                log::error!("no upstream trends API configured, skipping enrichment: {err}");
                return Vec::new();
            }
        };
        let breaker = Arc::new(CircuitBreaker::new());
        let rate_limiter = Arc::new(RateLimiter::new(self.config.api_rate_limit()));
        let client = Arc::new(KeywordApiClient::new(
            self.http.clone(),
            pool,
            breaker,
            rate_limiter,
            RetryPolicy::default(),
            self.config.trends_api_key().map(str::to_string),
            self.config.debug(),
        ));

        let chunks: Vec<Vec<String>> =
            keywords.chunks(self.config.query_batch_size()).map(<[String]>::to_vec).collect();

        let mut query_pool = WorkerPool::spawn(self.config.api_workers(), 64, {
            let client = Arc::clone(&client);
            let token = token.clone();
            move |chunk: Vec<String>| {
                let client = Arc::clone(&client);
                let token = token.clone();
                async move {
                    let result = client.query(&chunk, &token).await;
                    (chunk, result)
                }
            }
        });

        let mut submitted = 0usize;
        for chunk in chunks {
            if token.is_cancelled() || query_pool.submit(chunk).await.is_err() {
                break;
            }
            submitted += 1;
        }

        let mut enriched = Vec::new();
        for _ in 0..submitted {
            let Some((chunk, result)) = query_pool.recv().await else { break };
            match result {
                Ok(results) => {
                    let returned: std::collections::HashSet<&str> =
                        results.iter().map(|r| r.keyword.as_str()).collect();
                    for keyword in &chunk {
                        if !returned.contains(keyword.as_str()) {
                            defer_keyword(
                                deferred,
                                keyword_to_source,
                                retry_info,
                                keyword,
                                "no data in upstream response",
                                now_unix,
                            );
                        }
                    }
                    enriched.extend(results);
                }
                Err(err) => {
                    for keyword in &chunk {
                        defer_keyword(deferred, keyword_to_source, retry_info, keyword, &err.to_string(), now_unix);
                    }
                }
            }
        }
        query_pool.stop().await;
        enriched
    }

    async fn submit_all(&self, enriched: &[EnrichedKeyword], token: &CancellationToken, summary: &mut RunSummary) {
        let backend_key = self.config.backend_api_key();
        for batch in enriched.chunks(self.config.batch_size()) {
            if token.is_cancelled() {
                break;
            }
            let result = submission::submit_batch(
                &self.http,
                self.config.backend_url(),
                backend_key,
                batch,
                self.config.gzip_submissions(),
                RetryPolicy::default(),
                token,
            )
            .await;

            match result {
                Ok(()) => summary.batches_submitted += 1,
                Err(err) => {
                    log::error!("submission batch exhausted retries: {err}");
                    summary.batches_failed += 1;
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    fn persist_and_summarize(&self, store: &Option<EncryptedStore>, deferred: Vec<FailedKeyword>, summary: &mut RunSummary) {
        summary.keywords_deferred = deferred.len();
        if let Some(store) = store {
            if let Err(err) = store.save(&deferred) {
                log::error!("failed to persist retry queue: {err}");
            }
        }
        log::info!(
            "run summary: {} sources, {} urls, {} unique keywords, {} batches submitted, {} batches failed, {} deferred",
            summary.sources.len(),
            summary.urls_total,
            summary.keywords_deduplicated,
            summary.batches_submitted,
            summary.batches_failed,
            summary.keywords_deferred,
        );
    }
}

/// Pushes a renewed failure for `keyword` onto `deferred`, incrementing its
/// retry count from whatever it previously was in the retry queue (0 for a
/// keyword failing for the first time) rather than resetting to 1 every
/// time (§4.11 step 5, scenario E6).
fn defer_keyword(
    deferred: &mut Vec<FailedKeyword>,
    keyword_to_source: &HashMap<String, String>,
    retry_info: &HashMap<String, FailedKeyword>,
    keyword: &str,
    error: &str,
    now_unix: u64,
) {
    let previous = retry_info.get(keyword);
    let retry_count = previous.map_or(0, |p| p.retry_count) + 1;
    let first_failed_at_unix = previous.map_or(now_unix, |p| p.first_failed_at_unix);
    let backoff_secs = 60u64.saturating_mul(1u64 << retry_count.min(10));
    deferred.push(FailedKeyword {
        keyword: keyword.to_string(),
        source_sitemap: keyword_to_source.get(keyword).cloned().unwrap_or_default(),
        first_failed_at_unix,
        retry_count,
        last_error: error.to_string(),
        next_retry_at_unix: now_unix + backoff_secs,
    });
}

async fn ingest_sitemap(
    http: &reqwest::Client,
    rate_limiter: &RateLimiter,
    sitemap_url: &str,
    url_cap: usize,
    token: &CancellationToken,
) -> Result<Vec<crate::models::UrlRecord>, PipelineError> {
    let http = http.clone();
    let fetch = move |url: String| {
        let http = http.clone();
        async move {
            http.get(&url)
                .send()
                .await
                .map_err(|e| PipelineError::classify_transport(&e))?
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| PipelineError::classify_transport(&e))
        }
    };

    rate_limiter
        .execute(sitemap_url, token, || sitemap::expand_source(sitemap_url, url_cap, &fetch))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn e1_two_hyphenated_urls_yield_expected_primary_keywords() {
        let a = keyword_extractor::extract("https://example.com/games/action/super-mario-bros");
        let b = keyword_extractor::extract("https://example.com/puzzle/tetris-classic");
        assert_eq!(a.primary.unwrap().as_str(), "super mario bros");
        assert_eq!(b.primary.unwrap().as_str(), "tetris classic");
    }

    #[test]
    fn defer_keyword_sets_a_future_retry_time() {
        let mut deferred = Vec::new();
        let mut sources = HashMap::new();
        sources.insert("tetris classic".to_string(), "https://example.com/sitemap.xml".to_string());
        defer_keyword(&mut deferred, &sources, &HashMap::new(), "tetris classic", "server error", 1_000);
        assert_eq!(deferred.len(), 1);
        assert_eq!(deferred[0].retry_count, 1);
        assert!(deferred[0].next_retry_at_unix > 1_000);
    }

    #[test]
    fn defer_keyword_increments_retry_count_from_the_retry_queue() {
        let mut deferred = Vec::new();
        let mut sources = HashMap::new();
        sources.insert("tetris classic".to_string(), "https://example.com/sitemap.xml".to_string());

        let mut retry_info = HashMap::new();
        retry_info.insert(
            "tetris classic".to_string(),
            FailedKeyword {
                keyword: "tetris classic".to_string(),
                source_sitemap: "https://example.com/sitemap.xml".to_string(),
                first_failed_at_unix: 500,
                retry_count: 2,
                last_error: "server error: status 503".to_string(),
                next_retry_at_unix: 900,
            },
        );

        defer_keyword(&mut deferred, &sources, &retry_info, "tetris classic", "server error", 1_000);
        assert_eq!(deferred.len(), 1);
        assert_eq!(deferred[0].retry_count, 3);
        assert_eq!(deferred[0].first_failed_at_unix, 500);
    }
}
