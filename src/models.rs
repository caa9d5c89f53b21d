//! Core data model (§3) and wire types (§6).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Best-guess sitemap format, set by the parser factory's URL-suffix and
/// content-sniffing heuristics (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SitemapFormat {
    Xml,
    XmlGz,
    Txt,
    Rss,
    Index,
    Unknown,
}

/// A fetchable sitemap root or child, read-only config plus a format tag.
#[derive(Debug, Clone)]
pub struct SitemapSource {
    pub url: String,
    pub format: SitemapFormat,
}

impl SitemapSource {
    #[must_use]
    pub fn new(url: impl Into<String>, format: SitemapFormat) -> Self {
        Self { url: url.into(), format }
    }
}

/// An absolute HTTP(S) URL plus open-ended sitemap metadata.
#[derive(Debug, Clone, Default)]
pub struct UrlRecord {
    pub url: String,
    pub metadata: HashMap<String, String>,
}

impl UrlRecord {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), metadata: HashMap::new() }
    }
}

/// A case-folded token or hyphen-preserving phrase extracted from a URL.
///
/// Identity is the normalized text; construction is the extractor's
/// responsibility (§4.8) so the length/charset constraints always hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keyword(String);

impl Keyword {
    /// # Errors
    /// Returns `None` if `text` falls outside the \[3, 50\] length bound.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let len = text.chars().count();
        if (crate::utils::KEYWORD_MIN_LEN..=crate::utils::KEYWORD_MAX_LEN).contains(&len) {
            Some(Self(text))
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Competition tier reported by the upstream keyword API (§6), mapped to a
/// float score per §4.6 (`LOW→0.3`, `MEDIUM→0.5`, `HIGH→0.8`, unknown→0.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Competition {
    Low,
    Medium,
    High,
}

impl Competition {
    #[must_use]
    pub fn score(self) -> f64 {
        match self {
            Competition::Low => 0.3,
            Competition::Medium => 0.5,
            Competition::High => 0.8,
        }
    }
}

/// A year or month field that upstream emits as either a string or an
/// integer; preserved through round-trip as whichever form was configured
/// at construction (see DESIGN.md's Open Question resolution).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringOrInt {
    Str(String),
    Int(i64),
}

impl Serialize for StringOrInt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StringOrInt::Str(s) => serializer.serialize_str(s),
            StringOrInt::Int(i) => serializer.serialize_i64(*i),
        }
    }
}

impl<'de> Deserialize<'de> for StringOrInt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Int(i64),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Str(s) => StringOrInt::Str(s),
            Repr::Int(i) => StringOrInt::Int(i),
        })
    }
}

/// One month's search-volume sample in a keyword's history (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySearch {
    pub year: StringOrInt,
    pub month: StringOrInt,
    pub searches: i64,
}

/// Derived summary of how complete a keyword's monthly history is (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQuality {
    pub has_missing_months: bool,
    pub only_last_month_has_data: bool,
    pub total_months: u32,
    pub available_months: u32,
    pub missing_months_count: u32,
    pub missing_months: Vec<String>,
    pub warnings: Vec<String>,
    pub status: String,
    pub complete: bool,
}

/// Upstream metrics for a single keyword (§6 `metrics` object).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordMetrics {
    pub avg_monthly_searches: i64,
    pub latest_searches: i64,
    pub max_monthly_searches: i64,
    pub competition: Competition,
    pub competition_index: u8,
    pub low_top_of_page_bid_micro: i64,
    pub high_top_of_page_bid_micro: i64,
    pub monthly_searches: Vec<MonthlySearch>,
    pub data_quality: DataQuality,
}

/// A keyword plus its upstream enrichment, ready for downstream submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedKeyword {
    pub keyword: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub metrics: KeywordMetrics,
}

/// A keyword whose upstream enrichment failed, persisted encrypted for
/// retry on a future run (§3, §4.10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedKeyword {
    pub keyword: String,
    pub source_sitemap: String,
    pub first_failed_at_unix: u64,
    pub retry_count: u32,
    pub last_error: String,
    pub next_retry_at_unix: u64,
}

impl FailedKeyword {
    #[must_use]
    pub fn is_due(&self, now_unix: u64) -> bool {
        self.next_retry_at_unix <= now_unix
    }
}

/// Per-endpoint health counters (§3, §4.1's optional health-aware mode).
#[derive(Debug, Clone, Default)]
pub struct EndpointHealth {
    pub total: u64,
    pub success: u64,
    pub failure: u64,
    pub consecutive_failures: u32,
    pub last_success: Option<Instant>,
    pub last_failure: Option<Instant>,
    pub healthy: bool,
}

impl EndpointHealth {
    #[must_use]
    pub fn new() -> Self {
        Self { healthy: true, ..Default::default() }
    }

    pub fn record_success(&mut self) {
        self.total += 1;
        self.success += 1;
        self.consecutive_failures = 0;
        self.healthy = true;
        self.last_success = Some(Instant::now());
    }

    pub fn record_failure(&mut self, threshold: u32) {
        self.total += 1;
        self.failure += 1;
        self.consecutive_failures += 1;
        self.last_failure = Some(Instant::now());
        if self.consecutive_failures >= threshold {
            self.healthy = false;
        }
    }

    #[must_use]
    pub fn recoverable(&self, recovery_window: Duration) -> bool {
        !self.healthy
            && self
                .last_failure
                .is_some_and(|t| t.elapsed() >= recovery_window)
    }
}

/// Circuit state per endpoint/category (§3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Per-sitemap outcome recorded in the end-of-run summary (§4.12).
#[derive(Debug, Clone, Serialize)]
pub struct SourceOutcome {
    pub sitemap_url: String,
    pub succeeded: bool,
    pub urls_found: usize,
    pub error: Option<String>,
}

/// End-of-run report returned by the orchestrator (§3, §4.12, §7).
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub sources: Vec<SourceOutcome>,
    pub urls_total: usize,
    pub keywords_deduplicated: usize,
    pub batches_submitted: usize,
    pub batches_failed: usize,
    pub keywords_deferred: usize,
}

impl RunSummary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}
