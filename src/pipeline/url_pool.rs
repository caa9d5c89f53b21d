//! Round-robin endpoint pool (C1).
//!
//! Grounded on the teacher's `CircuitBreaker`/`CrawlRateLimiter` use of an
//! atomic counter guarded by `DashMap`-backed side state, generalized here
//! to the single canonical variant the specification calls for: an unsigned
//! monotonically increasing counter modulo pool size, which sidesteps
//! signed-overflow bugs entirely (§9).

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::models::EndpointHealth;

/// Thread-safe round-robin pool over a fixed set of endpoint base URLs.
///
/// Single-URL pools take a fast path with no atomic increment (§4.1);
/// multi-URL pools use a wrapping `u64` counter so wraparound near the
/// numeric maximum never produces a negative or out-of-range index.
pub struct UrlPool {
    endpoints: Vec<String>,
    counter: AtomicU64,
    health: Option<Arc<DashMap<String, EndpointHealth>>>,
    failure_threshold: u32,
    recovery_window: Duration,
}

impl UrlPool {
    /// Parse a comma-separated configuration string into a pool.
    ///
    /// # Errors
    /// Returns an error if `config` yields zero non-empty entries.
    pub fn from_config_str(config: &str) -> anyhow::Result<Self> {
        let endpoints: Vec<String> = config
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if endpoints.is_empty() {
            anyhow::bail!("endpoint pool configuration yielded no URLs");
        }
        Ok(Self {
            endpoints,
            counter: AtomicU64::new(0),
            health: None,
            failure_threshold: crate::utils::DEFAULT_HEALTH_FAILURE_THRESHOLD,
            recovery_window: Duration::from_secs(crate::utils::DEFAULT_HEALTH_RECOVERY_SECS),
        })
    }

    /// Enable health-aware selection: `next()` prefers endpoints currently
    /// flagged healthy, falling back to strict round-robin if none are.
    #[must_use]
    pub fn with_health_tracking(mut self) -> Self {
        let health = DashMap::new();
        for endpoint in &self.endpoints {
            health.insert(endpoint.clone(), EndpointHealth::new());
        }
        self.health = Some(Arc::new(health));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Yield the next endpoint in round-robin order.
    ///
    /// The pool is constructed non-empty, so this never returns `None` in
    /// practice; the `Option` return keeps the contract honest for callers
    /// that may hold a pool across teardown.
    #[must_use]
    pub fn next(&self) -> Option<&str> {
        if self.endpoints.len() == 1 {
            return Some(self.endpoints[0].as_str());
        }
        if let Some(health) = &self.health {
            if let Some(url) = self.next_healthy(health) {
                return Some(url);
            }
        }
        Some(self.round_robin())
    }

    fn round_robin(&self) -> &str {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let len = self.endpoints.len() as u64;
        let index = wrapping_mod(n, len);
        &self.endpoints[index as usize]
    }

    fn next_healthy(&self, health: &DashMap<String, EndpointHealth>) -> Option<&str> {
        let len = self.endpoints.len() as u64;
        for attempt in 0..self.endpoints.len() {
            let n = self.counter.fetch_add(1, Ordering::Relaxed);
            let index = wrapping_mod(n.wrapping_add(attempt as u64), len) as usize;
            let candidate = &self.endpoints[index];
            let is_healthy = health.get(candidate).is_none_or(|h| h.healthy);
            if is_healthy {
                return Some(candidate);
            }
        }
        None
    }

    pub fn record_success(&self, url: &str) {
        if let Some(health) = &self.health {
            health.entry(url.to_string()).or_insert_with(EndpointHealth::new).record_success();
        }
    }

    pub fn record_failure(&self, url: &str) {
        if let Some(health) = &self.health {
            health
                .entry(url.to_string())
                .or_insert_with(EndpointHealth::new)
                .record_failure(self.failure_threshold);
        }
    }

    /// Re-admit endpoints whose last failure is older than the recovery
    /// window; intended to be called from a periodic background task.
    pub fn recover_stale_endpoints(&self) {
        let Some(health) = &self.health else { return };
        for mut entry in health.iter_mut() {
            if entry.recoverable(self.recovery_window) {
                entry.healthy = true;
                entry.consecutive_failures = 0;
            }
        }
    }

    /// Snapshot the current health counters for `url`, if health tracking
    /// is enabled and the endpoint has recorded at least one outcome.
    #[must_use]
    pub fn health_snapshot(&self, url: &str) -> Option<EndpointHealth> {
        self.health.as_ref()?.get(url).map(|h| h.clone())
    }
}

/// Safe modulo for a counter that may be near its numeric maximum: since
/// `n` and `m` are both unsigned here, plain `%` already avoids the
/// negative-index hazard that a signed-counter implementation would hit
/// (the `((n mod m) + m) mod m` form named in the spec is for that signed
/// case); this helper documents the invariant at the call site.
fn wrapping_mod(n: u64, m: u64) -> u64 {
    n % m
}
