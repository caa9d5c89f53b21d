//! Downstream submission client: batches enriched keywords to the
//! ingestion endpoint (§4.11 step 6, §6).

use std::io::Write;

use crate::errors::PipelineError;
use crate::models::EnrichedKeyword;
use crate::pipeline::retry::{self, RetryPolicy};

/// POST one batch of enriched records to the downstream ingestion
/// endpoint, optionally gzip-compressed (§6).
///
/// # Errors
/// Returns the underlying [`PipelineError`] once retries are exhausted;
/// the caller (orchestrator) treats a failed batch as non-fatal to the run.
pub async fn submit_batch(
    http: &reqwest::Client,
    backend_url: &str,
    api_key: Option<&str>,
    batch: &[EnrichedKeyword],
    gzip: bool,
    retry_policy: RetryPolicy,
    token: &tokio_util::sync::CancellationToken,
) -> Result<(), PipelineError> {
    let body = serde_json::to_vec(batch)
        .map_err(|e| PipelineError::Data(format!("serializing submission batch: {e}")))?;

    let payload = if gzip { gzip_compress(&body)? } else { body };

    retry::execute(retry_policy, token, || {
        let payload = payload.clone();
        async move {
            let mut request = http
                .post(backend_url)
                .header("Content-Type", "application/json");
            if let Some(key) = api_key {
                request = request.header("X-API-Key", key);
            }
            if gzip {
                request = request.header("Content-Encoding", "gzip");
            }

            let response = request
                .body(payload)
                .send()
                .await
                .map_err(|e| PipelineError::classify_transport(&e))?;

            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(PipelineError::from_status(status.as_u16()))
            }
        }
    })
    .await
}

fn gzip_compress(body: &[u8]) -> Result<Vec<u8>, PipelineError> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder
        .write_all(body)
        .map_err(|e| PipelineError::Data(format!("gzip-compressing submission batch: {e}")))?;
    encoder
        .finish()
        .map_err(|e| PipelineError::Data(format!("finishing gzip stream: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Competition, DataQuality, KeywordMetrics};

    fn sample_batch() -> Vec<EnrichedKeyword> {
        vec![EnrichedKeyword {
            keyword: "tetris classic".into(),
            url: None,
            metrics: KeywordMetrics {
                avg_monthly_searches: 1000,
                latest_searches: 900,
                max_monthly_searches: 1000,
                competition: Competition::High,
                competition_index: 80,
                low_top_of_page_bid_micro: 0,
                high_top_of_page_bid_micro: 0,
                monthly_searches: Vec::new(),
                data_quality: DataQuality {
                    has_missing_months: true,
                    only_last_month_has_data: false,
                    total_months: 0,
                    available_months: 0,
                    missing_months_count: 0,
                    missing_months: Vec::new(),
                    warnings: Vec::new(),
                    status: "partial".into(),
                    complete: false,
                },
            },
        }]
    }

    #[tokio::test]
    async fn submits_batch_successfully() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/keyword-metrics/batch")
            .with_status(200)
            .create_async()
            .await;

        let http = reqwest::Client::new();
        let token = tokio_util::sync::CancellationToken::new();
        let result = submit_batch(
            &http,
            &format!("{}/api/v1/keyword-metrics/batch", server.url()),
            Some("test-key"),
            &sample_batch(),
            false,
            RetryPolicy { max_retries: 1, initial_delay: std::time::Duration::from_millis(1), multiplier: 1.0 },
            &token,
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn batch_exhausting_retries_surfaces_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/keyword-metrics/batch")
            .with_status(500)
            .expect_at_least(2)
            .create_async()
            .await;

        let http = reqwest::Client::new();
        let token = tokio_util::sync::CancellationToken::new();
        let result = submit_batch(
            &http,
            &format!("{}/api/v1/keyword-metrics/batch", server.url()),
            None,
            &sample_batch(),
            false,
            RetryPolicy { max_retries: 1, initial_delay: std::time::Duration::from_millis(1), multiplier: 1.0 },
            &token,
        )
        .await;

        assert!(result.is_err());
    }
}
