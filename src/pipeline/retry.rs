//! Retry/backoff executor (C2) and its SmartRetryWithFailover variant.
//!
//! Grounded on the teacher's `FailureKind::classify`/`is_retryable`/
//! `delay_multiplier` trio in `crawl_types.rs`, adapted to operate on
//! [`PipelineError`] directly rather than a secondary classification enum,
//! since the taxonomy itself already carries retryability.

use std::future::Future;
use std::time::Duration;

use crate::errors::PipelineError;
use crate::pipeline::url_pool::UrlPool;

/// Retry policy: max attempts beyond the first, initial delay, and the
/// exponential multiplier applied between attempts (§4.2).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::utils::DEFAULT_MAX_RETRIES,
            initial_delay: Duration::from_millis(crate::utils::DEFAULT_INITIAL_BACKOFF_MS),
            multiplier: crate::utils::DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

/// Run `op` until it succeeds or the policy is exhausted.
///
/// Non-retryable errors (see [`PipelineError::is_retryable`]) abort after
/// exactly one attempt. A cancelled `token` aborts promptly, even
/// mid-backoff-sleep, with the cancellation surfaced as `PipelineError::Cancelled`.
pub async fn execute<T, F, Fut>(
    policy: RetryPolicy,
    token: &tokio_util::sync::CancellationToken,
    mut op: F,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled("retry aborted before attempt".into()));
        }

        let result = op().await;
        match result {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) if attempt >= policy.max_retries => return Err(err),
            Err(err) => {
                log::warn!("attempt {attempt} failed, retrying in {delay:?}: {err}");
                tokio::select! {
                    () = token.cancelled() => {
                        return Err(PipelineError::Cancelled(format!("cancelled mid-backoff after: {err}")));
                    }
                    () = tokio::time::sleep(delay) => {}
                }
                delay = delay.mul_f64(policy.multiplier);
                attempt += 1;
            }
        }
    }
}

/// Like [`execute`], but errors classified as *endpoint-suggestive*
/// (§4.2: 429, 502/503/504, connection-refused, timeout) trigger an
/// immediate switch to the next pool endpoint instead of a backoff sleep,
/// up to `pool.len()` attempts total.
pub async fn execute_with_failover<T, F, Fut>(
    policy: RetryPolicy,
    token: &tokio_util::sync::CancellationToken,
    pool: &UrlPool,
    mut op: F,
) -> Result<T, PipelineError>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<T, PipelineError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;
    let max_failover_attempts = pool.len().max(1) as u32;

    loop {
        if token.is_cancelled() {
            return Err(PipelineError::Cancelled("retry aborted before attempt".into()));
        }

        let endpoint = pool.next().ok_or_else(|| {
            PipelineError::Config("endpoint pool is empty".into())
        })?.to_string();

        match op(&endpoint).await {
            Ok(value) => {
                pool.record_success(&endpoint);
                return Ok(value);
            }
            Err(err) if !err.is_retryable() => {
                pool.record_failure(&endpoint);
                return Err(err);
            }
            Err(err) if err.is_endpoint_suggestive() && attempt < max_failover_attempts => {
                pool.record_failure(&endpoint);
                log::warn!("endpoint {endpoint} failed ({err}), failing over without backoff");
                attempt += 1;
            }
            Err(err) if attempt >= policy.max_retries.max(max_failover_attempts) => {
                pool.record_failure(&endpoint);
                return Err(err);
            }
            Err(err) => {
                pool.record_failure(&endpoint);
                log::warn!("attempt {attempt} failed, retrying in {delay:?}: {err}");
                tokio::select! {
                    () = token.cancelled() => {
                        return Err(PipelineError::Cancelled(format!("cancelled mid-backoff after: {err}")));
                    }
                    () = tokio::time::sleep(delay) => {}
                }
                delay = delay.mul_f64(policy.multiplier);
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn non_retryable_error_aborts_after_one_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = tokio_util::sync::CancellationToken::new();
        let calls_clone = Arc::clone(&calls);

        let result: Result<(), PipelineError> = execute(RetryPolicy::default(), &token, || {
            let calls = Arc::clone(&calls_clone);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PipelineError::Auth(401))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retryable_error_exhausts_max_retries_plus_one_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = tokio_util::sync::CancellationToken::new();
        let calls_clone = Arc::clone(&calls);
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            multiplier: 1.0,
        };

        let result: Result<(), PipelineError> = execute(policy, &token, || {
            let calls = Arc::clone(&calls_clone);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(PipelineError::Server(503))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn success_after_transient_failures_returns_value() {
        let calls = Arc::new(AtomicU32::new(0));
        let token = tokio_util::sync::CancellationToken::new();
        let calls_clone = Arc::clone(&calls);
        let policy = RetryPolicy {
            max_retries: 5,
            initial_delay: Duration::from_millis(1),
            multiplier: 1.0,
        };

        let result: Result<u32, PipelineError> = execute(policy, &token, || {
            let calls = Arc::clone(&calls_clone);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(PipelineError::Timeout(Duration::from_secs(1)))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_aborts_promptly_mid_backoff() {
        let token = tokio_util::sync::CancellationToken::new();
        let token_clone = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            token_clone.cancel();
        });

        let policy = RetryPolicy {
            max_retries: 10,
            initial_delay: Duration::from_secs(30),
            multiplier: 2.0,
        };

        let start = std::time::Instant::now();
        let result: Result<(), PipelineError> =
            execute(policy, &token, || async { Err(PipelineError::Server(503)) }).await;

        assert!(matches!(result, Err(PipelineError::Cancelled(_))));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn failover_switches_endpoints_without_backoff_on_suggestive_errors() {
        let pool = UrlPool::from_config_str("https://a,https://b").unwrap();
        let token = tokio_util::sync::CancellationToken::new();
        let attempts: Arc<std::sync::Mutex<Vec<String>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<&str, PipelineError> =
            execute_with_failover(RetryPolicy::default(), &token, &pool, |endpoint| {
                let attempts = Arc::clone(&attempts_clone);
                let endpoint = endpoint.to_string();
                async move {
                    attempts.lock().unwrap().push(endpoint.clone());
                    if endpoint == "https://a" {
                        Err(PipelineError::RateLimited)
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(attempts.lock().unwrap().len(), 2);
    }
}
