//! Unified error taxonomy for the pipeline.
//!
//! Mirrors the teacher's `CrawlError`/`FailureKind` split: a typed enum for
//! the boundary surface (`Display` + `std::error::Error` + `From<anyhow::Error>`),
//! with classification of loosely-typed upstream failures (HTTP status, transport
//! error text) folded in as associated functions rather than a parallel enum,
//! since here the categories themselves carry the retry/breaker policy.

use std::time::Duration;

/// The kind of failure a component-boundary operation produced.
///
/// Each variant corresponds to one row of the error taxonomy: whether it is
/// fatal to the whole run, retryable, and whether it should count against a
/// circuit breaker category.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or invalid configuration. Fatal to the whole run.
    #[error("configuration error: {0}")]
    Config(String),

    /// Sitemap or response parsing failed after every resilience strategy.
    #[error("parse error: {0}")]
    Parse(String),

    /// Connect, TLS, DNS, or read/write transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Context deadline or transport-level timeout.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Upstream responded 5xx.
    #[error("server error: status {0}")]
    Server(u16),

    /// Upstream responded 429.
    #[error("rate limited")]
    RateLimited,

    /// Upstream responded 4xx, not 401/403/429.
    #[error("client error: status {0}")]
    Client(u16),

    /// Upstream responded 401/403.
    #[error("auth error: status {0}")]
    Auth(u16),

    /// The circuit breaker refused the call.
    #[error("circuit open, retry after {0:?}")]
    CircuitOpen(Duration),

    /// The driving context was cancelled.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Well-formed but semantically empty upstream response.
    #[error("empty data: {0}")]
    Data(String),

    /// Catch-all for interior errors carrying free-form context.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Whether this error is eligible for a retry attempt (§4.2, §7).
    ///
    /// Non-retryable classes abort immediately: Config, Client, Auth, Data,
    /// Cancelled. Everything else (Transport, Timeout, Server, RateLimited,
    /// Parse failures surfaced mid-retry, CircuitOpen) is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            PipelineError::Config(_)
                | PipelineError::Client(_)
                | PipelineError::Auth(_)
                | PipelineError::Data(_)
                | PipelineError::Cancelled(_)
        )
    }

    /// Whether this error should trigger immediate endpoint failover rather
    /// than a backoff sleep (§4.2 SmartRetryWithFailover: 429, 502/503/504,
    /// connection-refused, timeout).
    #[must_use]
    pub fn is_endpoint_suggestive(&self) -> bool {
        matches!(
            self,
            PipelineError::RateLimited | PipelineError::Timeout(_) | PipelineError::Transport(_)
        ) || matches!(self, PipelineError::Server(status) if matches!(status, 502 | 503 | 504))
    }

    /// Map this error onto a circuit-breaker category, or `None` if it
    /// should not count toward any breaker (Config/Client/Data/Cancelled
    /// are caller mistakes or terminal outcomes, not endpoint health signals).
    #[must_use]
    pub fn breaker_category(&self) -> Option<ErrorCategory> {
        match self {
            PipelineError::Transport(_) => Some(ErrorCategory::Network),
            PipelineError::Server(_) => Some(ErrorCategory::Http),
            PipelineError::Data(_) => Some(ErrorCategory::Data),
            PipelineError::Timeout(_) => Some(ErrorCategory::Timeout),
            PipelineError::Auth(_) => Some(ErrorCategory::Auth),
            PipelineError::RateLimited => Some(ErrorCategory::RateLimit),
            _ => None,
        }
    }

    /// Classify a loosely-typed upstream failure by HTTP status code, the
    /// way the downstream client sees it before it has a typed error.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => PipelineError::Auth(status),
            429 => PipelineError::RateLimited,
            400 | 404 => PipelineError::Client(status),
            s if (400..500).contains(&s) => PipelineError::Client(s),
            s if (500..600).contains(&s) => PipelineError::Server(s),
            s => PipelineError::Client(s),
        }
    }

    /// Structural-then-textual classification of a transport-layer error,
    /// mirroring the teacher's `FailureKind::classify` substring fallback.
    #[must_use]
    pub fn classify_transport(err: &(dyn std::error::Error + 'static)) -> Self {
        if let Some(reqwest_err) = find_reqwest_error(err) {
            if reqwest_err.is_timeout() {
                return PipelineError::Timeout(Duration::default());
            }
            if let Some(status) = reqwest_err.status() {
                return Self::from_status(status.as_u16());
            }
        }

        let message = err.to_string().to_lowercase();
        if message.contains("timeout") || message.contains("timed out") {
            PipelineError::Timeout(Duration::default())
        } else if message.contains("429") || message.contains("rate limit") {
            PipelineError::RateLimited
        } else if message.contains("401") || message.contains("unauthorized") {
            PipelineError::Auth(401)
        } else if message.contains("403") || message.contains("forbidden") {
            PipelineError::Auth(403)
        } else if message.contains("500")
            || message.contains("502")
            || message.contains("503")
            || message.contains("504")
        {
            PipelineError::Server(500)
        } else if message.contains("dns")
            || message.contains("connection refused")
            || message.contains("network")
        {
            PipelineError::Transport(err.to_string())
        } else if message.contains("parse") || message.contains("decode") || message.contains("unmarshal") {
            PipelineError::Parse(err.to_string())
        } else {
            PipelineError::Transport(err.to_string())
        }
    }
}

fn find_reqwest_error(err: &(dyn std::error::Error + 'static)) -> Option<&reqwest::Error> {
    let mut current: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = current {
        if let Some(reqwest_err) = e.downcast_ref::<reqwest::Error>() {
            return Some(reqwest_err);
        }
        current = e.source();
    }
    None
}

/// Circuit-breaker error category (§4.3); drives per-category thresholds
/// and recovery timeouts rather than a single per-endpoint count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Network,
    Http,
    Data,
    Timeout,
    Auth,
    RateLimit,
}

impl ErrorCategory {
    /// Default consecutive-failure threshold before the breaker opens (§4.3).
    #[must_use]
    pub fn default_threshold(self) -> u32 {
        match self {
            ErrorCategory::Network => 3,
            ErrorCategory::Http => 5,
            ErrorCategory::Data => 8,
            ErrorCategory::Timeout => 2,
            ErrorCategory::Auth => 2,
            ErrorCategory::RateLimit => 1,
        }
    }

    /// Default recovery timeout before Open transitions to HalfOpen (§4.3).
    #[must_use]
    pub fn default_recovery_timeout(self) -> Duration {
        match self {
            ErrorCategory::RateLimit => Duration::from_secs(120),
            ErrorCategory::Auth => Duration::from_secs(300),
            ErrorCategory::Network => Duration::from_secs(60),
            ErrorCategory::Timeout => Duration::from_secs(30),
            ErrorCategory::Http | ErrorCategory::Data => Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_and_auth_errors_are_not_retryable() {
        assert!(!PipelineError::Client(404).is_retryable());
        assert!(!PipelineError::Auth(401).is_retryable());
        assert!(!PipelineError::Config("missing BACKEND_URL".into()).is_retryable());
    }

    #[test]
    fn server_and_timeout_errors_are_retryable() {
        assert!(PipelineError::Server(503).is_retryable());
        assert!(PipelineError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(PipelineError::RateLimited.is_retryable());
    }

    #[test]
    fn status_classification_matches_taxonomy() {
        assert!(matches!(PipelineError::from_status(401), PipelineError::Auth(401)));
        assert!(matches!(PipelineError::from_status(429), PipelineError::RateLimited));
        assert!(matches!(PipelineError::from_status(404), PipelineError::Client(404)));
        assert!(matches!(PipelineError::from_status(503), PipelineError::Server(503)));
    }

    #[test]
    fn endpoint_suggestive_errors_trigger_failover() {
        assert!(PipelineError::RateLimited.is_endpoint_suggestive());
        assert!(PipelineError::Server(502).is_endpoint_suggestive());
        assert!(!PipelineError::Server(500).is_endpoint_suggestive());
        assert!(!PipelineError::Client(404).is_endpoint_suggestive());
    }

    #[test]
    fn category_thresholds_match_spec_defaults() {
        assert_eq!(ErrorCategory::RateLimit.default_threshold(), 1);
        assert_eq!(ErrorCategory::Timeout.default_threshold(), 2);
        assert_eq!(ErrorCategory::Auth.default_recovery_timeout(), Duration::from_secs(300));
        assert_eq!(ErrorCategory::RateLimit.default_recovery_timeout(), Duration::from_secs(120));
    }
}
