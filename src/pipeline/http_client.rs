//! HTTP client construction (C5): two named tuning profiles over a pooled
//! `reqwest::Client`, matching §4.5's "two defaults ship" clause.

use std::time::Duration;

use crate::config::HttpClientProfile;

/// Tunables for a connection-pooling HTTP transport (§4.5). `reqwest`
/// exposes no knob for a hard cap on *total* (non-idle) connections per
/// host, so the spec's "max-conns-per-host" tunable is realized here as
/// the idle-pool cap `reqwest` does support; the field is named
/// `max_idle_per_host` to match what it actually bounds.
#[derive(Debug, Clone, Copy)]
pub struct HttpClientTuning {
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub connect_timeout: Duration,
    pub keep_alive: Duration,
    pub request_timeout: Duration,
}

impl HttpClientTuning {
    #[must_use]
    pub fn for_profile(profile: HttpClientProfile) -> Self {
        match profile {
            HttpClientProfile::Default => Self {
                max_idle_per_host: 4,
                idle_timeout: Duration::from_secs(30),
                connect_timeout: Duration::from_secs(10),
                keep_alive: Duration::from_secs(60),
                request_timeout: Duration::from_secs(30),
            },
            HttpClientProfile::HighThroughput => Self {
                max_idle_per_host: 32,
                idle_timeout: Duration::from_secs(90),
                connect_timeout: Duration::from_secs(5),
                keep_alive: Duration::from_secs(30),
                request_timeout: Duration::from_secs(15),
            },
        }
    }
}

/// Build a `reqwest::Client` for the given profile, with `request_timeout`
/// overridden if `override_timeout` (from the `API_TIMEOUT` env var) is set.
///
/// # Errors
/// Propagates any `reqwest::Error` from the underlying builder.
pub fn build_client(
    profile: HttpClientProfile,
    override_timeout: Option<Duration>,
) -> Result<reqwest::Client, reqwest::Error> {
    let tuning = HttpClientTuning::for_profile(profile);
    reqwest::Client::builder()
        .pool_max_idle_per_host(tuning.max_idle_per_host)
        .pool_idle_timeout(tuning.idle_timeout)
        .connect_timeout(tuning.connect_timeout)
        .tcp_keepalive(tuning.keep_alive)
        .timeout(override_timeout.unwrap_or(tuning.request_timeout))
        .user_agent(crate::utils::PIPELINE_USER_AGENT)
        .build()
}
