//! Circuit breaker (C3), per-endpoint and per-error-category.
//!
//! Grounded on the teacher's `CircuitBreaker` in `crawl_engine/circuit_breaker.rs`:
//! a `DashMap<String, DomainHealth>` keyed by endpoint with `should_attempt`/
//! `record_success`/`record_failure`, generalized here so each endpoint tracks
//! one [`CategoryHealth`] per [`ErrorCategory`] rather than a single failure
//! count, since thresholds and recovery timeouts are category-dependent (§4.3).

use dashmap::DashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::errors::ErrorCategory;
use crate::models::CircuitState;

struct CategoryHealth {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
}

impl CategoryHealth {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            half_open_successes: 0,
            opened_at: None,
        }
    }
}

/// One breaker per endpoint URL, internally split by error category.
///
/// The whole per-category state lives behind a single `RwLock` per
/// `(endpoint, category)` pair rather than a lock per field, so the
/// Closed→Open transition is never performed under a read lock that is
/// then upgraded — the named invariant of §4.3: `should_attempt` takes the
/// write lock directly when a transition is possible, instead of reading
/// then re-acquiring optimistically.
pub struct CircuitBreaker {
    endpoints: DashMap<(String, CategoryKey), RwLock<CategoryHealth>>,
    half_open_limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CategoryKey(u8);

impl From<ErrorCategory> for CategoryKey {
    fn from(c: ErrorCategory) -> Self {
        CategoryKey(match c {
            ErrorCategory::Network => 0,
            ErrorCategory::Http => 1,
            ErrorCategory::Data => 2,
            ErrorCategory::Timeout => 3,
            ErrorCategory::Auth => 4,
            ErrorCategory::RateLimit => 5,
        })
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreaker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoints: DashMap::new(),
            half_open_limit: crate::utils::DEFAULT_HALF_OPEN_LIMIT,
        }
    }

    /// Whether a call to `endpoint` for `category` should be attempted.
    ///
    /// Performs the Open→HalfOpen transition under a single write-lock
    /// acquisition when the recovery timeout has elapsed, rather than
    /// reading the state and upgrading afterward.
    #[must_use]
    pub fn should_attempt(&self, endpoint: &str, category: ErrorCategory) -> bool {
        let entry = self
            .endpoints
            .entry((endpoint.to_string(), category.into()))
            .or_insert_with(|| RwLock::new(CategoryHealth::new()));
        let mut health = entry.write().expect("circuit breaker lock poisoned");

        match health.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = health.opened_at.is_some_and(|t| {
                    t.elapsed() >= category.default_recovery_timeout()
                });
                if elapsed {
                    health.state = CircuitState::HalfOpen;
                    health.half_open_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self, endpoint: &str, category: ErrorCategory) {
        let entry = self
            .endpoints
            .entry((endpoint.to_string(), category.into()))
            .or_insert_with(|| RwLock::new(CategoryHealth::new()));
        let mut health = entry.write().expect("circuit breaker lock poisoned");

        match health.state {
            CircuitState::Closed => {
                health.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                health.half_open_successes += 1;
                if health.half_open_successes >= self.half_open_limit {
                    health.state = CircuitState::Closed;
                    health.consecutive_failures = 0;
                    health.half_open_successes = 0;
                    health.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self, endpoint: &str, category: ErrorCategory) {
        let entry = self
            .endpoints
            .entry((endpoint.to_string(), category.into()))
            .or_insert_with(|| RwLock::new(CategoryHealth::new()));
        let mut health = entry.write().expect("circuit breaker lock poisoned");

        match health.state {
            CircuitState::HalfOpen => {
                health.state = CircuitState::Open;
                health.opened_at = Some(Instant::now());
                health.half_open_successes = 0;
            }
            CircuitState::Closed => {
                health.consecutive_failures += 1;
                if health.consecutive_failures >= category.default_threshold() {
                    health.state = CircuitState::Open;
                    health.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }

    #[must_use]
    pub fn state(&self, endpoint: &str, category: ErrorCategory) -> CircuitState {
        self.endpoints
            .get(&(endpoint.to_string(), category.into()))
            .map(|e| e.read().expect("circuit breaker lock poisoned").state)
            .unwrap_or(CircuitState::Closed)
    }

    /// Remaining time until an Open breaker is eligible for a HalfOpen
    /// probe, or `Duration::ZERO` if it is not currently Open.
    #[must_use]
    pub fn retry_after(&self, endpoint: &str, category: ErrorCategory) -> Duration {
        self.endpoints
            .get(&(endpoint.to_string(), category.into()))
            .and_then(|e| {
                let health = e.read().expect("circuit breaker lock poisoned");
                if health.state != CircuitState::Open {
                    return None;
                }
                let elapsed = health.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                Some(category.default_recovery_timeout().saturating_sub(elapsed))
            })
            .unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn opens_after_category_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new();
        for _ in 0..(ErrorCategory::Timeout.default_threshold() - 1) {
            breaker.record_failure("https://api.example.com", ErrorCategory::Timeout);
            assert!(breaker.should_attempt("https://api.example.com", ErrorCategory::Timeout));
        }
        breaker.record_failure("https://api.example.com", ErrorCategory::Timeout);
        assert!(!breaker.should_attempt("https://api.example.com", ErrorCategory::Timeout));
    }

    #[test]
    fn rate_limit_category_opens_on_single_failure() {
        let breaker = CircuitBreaker::new();
        breaker.record_failure("https://api.example.com", ErrorCategory::RateLimit);
        assert!(!breaker.should_attempt("https://api.example.com", ErrorCategory::RateLimit));
    }

    #[test]
    fn categories_are_independent_per_endpoint() {
        let breaker = CircuitBreaker::new();
        breaker.record_failure("https://api.example.com", ErrorCategory::RateLimit);
        assert!(breaker.should_attempt("https://api.example.com", ErrorCategory::Network));
    }

    #[test]
    fn half_open_failure_reopens_with_fresh_timeout() {
        let breaker = CircuitBreaker::new();
        breaker.record_failure("https://api.example.com", ErrorCategory::RateLimit);
        assert_eq!(breaker.state("https://api.example.com", ErrorCategory::RateLimit), CircuitState::Open);

        {
            let entry = breaker
                .endpoints
                .get(&("https://api.example.com".to_string(), ErrorCategory::RateLimit.into()))
                .unwrap();
            let mut health = entry.write().unwrap();
            health.state = CircuitState::HalfOpen;
        }

        breaker.record_failure("https://api.example.com", ErrorCategory::RateLimit);
        assert_eq!(breaker.state("https://api.example.com", ErrorCategory::RateLimit), CircuitState::Open);
    }

    #[test]
    fn half_open_successes_close_breaker_and_reset_counters() {
        let breaker = CircuitBreaker::new();
        breaker.record_failure("https://api.example.com", ErrorCategory::Network);
        breaker.record_failure("https://api.example.com", ErrorCategory::Network);
        breaker.record_failure("https://api.example.com", ErrorCategory::Network);
        assert_eq!(breaker.state("https://api.example.com", ErrorCategory::Network), CircuitState::Open);

        {
            let entry = breaker
                .endpoints
                .get(&("https://api.example.com".to_string(), ErrorCategory::Network.into()))
                .unwrap();
            let mut health = entry.write().unwrap();
            health.state = CircuitState::HalfOpen;
        }

        breaker.record_success("https://api.example.com", ErrorCategory::Network);
        assert_eq!(breaker.state("https://api.example.com", ErrorCategory::Network), CircuitState::Closed);
    }

    #[test]
    fn concurrent_failures_cause_exactly_one_observed_transition() {
        let breaker = Arc::new(CircuitBreaker::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let breaker = Arc::clone(&breaker);
            handles.push(thread::spawn(move || {
                breaker.record_failure("https://api.example.com", ErrorCategory::RateLimit);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(breaker.state("https://api.example.com", ErrorCategory::RateLimit), CircuitState::Open);
    }
}
