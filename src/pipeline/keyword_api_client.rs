//! Keyword API client (C6): batches keyword queries against the upstream
//! trends API and normalizes the response into internal [`EnrichedKeyword`]
//! records.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{ErrorCategory, PipelineError};
use crate::models::{Competition, DataQuality, EnrichedKeyword, KeywordMetrics, MonthlySearch};
use crate::pipeline::circuit_breaker::CircuitBreaker;
use crate::pipeline::rate_limiter::RateLimiter;
use crate::pipeline::retry::{self, RetryPolicy};
use crate::pipeline::url_pool::UrlPool;

#[derive(Debug, Deserialize)]
struct UpstreamResponse {
    status: String,
    #[serde(default)]
    data: Vec<UpstreamKeyword>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamKeyword {
    keyword: String,
    metrics: UpstreamMetrics,
}

#[derive(Debug, Deserialize)]
struct UpstreamMetrics {
    avg_monthly_searches: i64,
    competition: UpstreamCompetition,
    latest_searches: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum UpstreamCompetition {
    Low,
    Medium,
    High,
    #[serde(other)]
    Unknown,
}

impl From<UpstreamCompetition> for Competition {
    fn from(c: UpstreamCompetition) -> Self {
        match c {
            UpstreamCompetition::Low => Competition::Low,
            UpstreamCompetition::Medium | UpstreamCompetition::Unknown => Competition::Medium,
            UpstreamCompetition::High => Competition::High,
        }
    }
}

/// Client over a [`UrlPool`] of upstream trends-API bases (§4.6).
pub struct KeywordApiClient {
    http: reqwest::Client,
    pool: Arc<UrlPool>,
    breaker: Arc<CircuitBreaker>,
    rate_limiter: Arc<RateLimiter>,
    retry_policy: RetryPolicy,
    api_key: Option<String>,
    debug: bool,
}

impl KeywordApiClient {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        pool: Arc<UrlPool>,
        breaker: Arc<CircuitBreaker>,
        rate_limiter: Arc<RateLimiter>,
        retry_policy: RetryPolicy,
        api_key: Option<String>,
        debug: bool,
    ) -> Self {
        Self { http, pool, breaker, rate_limiter, retry_policy, api_key, debug }
    }

    /// Query a batch of keywords against the upstream API, returning one
    /// [`EnrichedKeyword`] per keyword the upstream actually enriched.
    ///
    /// Keywords the upstream omits from its response simply do not appear
    /// in the result; the caller (orchestrator) treats their absence as a
    /// per-keyword enrichment failure to spill into the retry queue.
    pub async fn query(
        &self,
        keywords: &[String],
        token: &tokio_util::sync::CancellationToken,
    ) -> Result<Vec<EnrichedKeyword>, PipelineError> {
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let joined = keywords.join(",");
        let encoded = urlencoding::encode(&joined).into_owned();

        retry::execute_with_failover(self.retry_policy, token, &self.pool, |base| {
            let encoded = encoded.clone();
            async move {
                let category = ErrorCategory::Http;
                if !self.breaker.should_attempt(base, category) {
                    return Err(PipelineError::CircuitOpen(self.breaker.retry_after(base, category)));
                }

                let full_url = if base.contains("?keyword=") {
                    format!("{base}{encoded}")
                } else {
                    format!("{base}?keyword={encoded}")
                };

                let result = self
                    .rate_limiter
                    .execute(base, token, || self.fetch(&full_url))
                    .await;

                match &result {
                    Ok(_) => self.breaker.record_success(base, category),
                    Err(err) => {
                        if let Some(cat) = err.breaker_category() {
                            self.breaker.record_failure(base, cat);
                        }
                    }
                }
                result
            }
        })
        .await
    }

    async fn fetch(&self, url: &str) -> Result<Vec<EnrichedKeyword>, PipelineError> {
        let mut request = self.http.get(url).header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let status_code = status.as_u16();
            if self.debug {
                let body = response.text().await.unwrap_or_default();
                log::debug!("upstream keyword API returned status {status_code}, body: {body}");
            }
            return Err(PipelineError::from_status(status_code));
        }

        let parsed: UpstreamResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::classify_transport(&e))?;

        if parsed.status != "success" {
            let message = parsed.message.unwrap_or_else(|| "upstream reported non-success status".into());
            log::warn!("upstream keyword API returned non-success status: {message}");
            return Ok(Vec::new());
        }

        Ok(parsed.data.into_iter().map(map_upstream_keyword).collect())
    }
}

fn map_upstream_keyword(upstream: UpstreamKeyword) -> EnrichedKeyword {
    let competition: Competition = upstream.metrics.competition.into();
    EnrichedKeyword {
        keyword: upstream.keyword,
        url: None,
        metrics: KeywordMetrics {
            avg_monthly_searches: upstream.metrics.avg_monthly_searches,
            latest_searches: upstream.metrics.latest_searches,
            max_monthly_searches: upstream.metrics.avg_monthly_searches.max(upstream.metrics.latest_searches),
            competition,
            competition_index: (competition.score() * 100.0) as u8,
            low_top_of_page_bid_micro: 0,
            high_top_of_page_bid_micro: 0,
            monthly_searches: Vec::<MonthlySearch>::new(),
            data_quality: DataQuality {
                has_missing_months: true,
                only_last_month_has_data: false,
                total_months: 0,
                available_months: 0,
                missing_months_count: 0,
                missing_months: Vec::new(),
                warnings: vec!["upstream does not provide monthly history".into()],
                status: "partial".into(),
                complete: false,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::circuit_breaker::CircuitBreaker;
    use crate::pipeline::rate_limiter::RateLimiter;

    fn make_client(base_url: &str) -> KeywordApiClient {
        KeywordApiClient::new(
            reqwest::Client::new(),
            Arc::new(UrlPool::from_config_str(base_url).unwrap()),
            Arc::new(CircuitBreaker::new()),
            Arc::new(RateLimiter::new(1000.0)),
            RetryPolicy { max_retries: 1, initial_delay: Duration::from_millis(1), multiplier: 1.0 },
            None,
            false,
        )
    }

    #[tokio::test]
    async fn query_returns_empty_vec_for_empty_keyword_list() {
        let client = make_client("https://api.example.com/trends");
        let token = tokio_util::sync::CancellationToken::new();
        let result = client.query(&[], &token).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn maps_competition_tiers_to_spec_scores() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/trends.*".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"status":"success","data":[
                    {"keyword":"tetris classic","metrics":{"avg_monthly_searches":1000,"competition":"HIGH","latest_searches":900}}
                ]}"#,
            )
            .create_async()
            .await;

        let client = make_client(&format!("{}/trends?keyword=", server.url()));
        let token = tokio_util::sync::CancellationToken::new();
        let result = client.query(&["tetris classic".into()], &token).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].metrics.competition_index, 80);
    }

    #[tokio::test]
    async fn non_success_status_yields_empty_list() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/trends.*".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"error","data":[],"message":"no data available"}"#)
            .create_async()
            .await;

        let client = make_client(&format!("{}/trends?keyword=", server.url()));
        let token = tokio_util::sync::CancellationToken::new();
        let result = client.query(&["tetris classic".into()], &token).await.unwrap();
        assert!(result.is_empty());
    }
}
