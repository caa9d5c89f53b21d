//! Concurrency core, batching/submission, and orchestration (C1-C6, C9-C11).

pub mod circuit_breaker;
pub mod http_client;
pub mod keyword_api_client;
pub mod orchestrator;
pub mod persistence;
pub mod rate_limiter;
pub mod retry;
pub mod submission;
pub mod url_pool;
pub mod worker_pool;

pub use circuit_breaker::CircuitBreaker;
pub use orchestrator::Orchestrator;
pub use rate_limiter::RateLimiter;
pub use retry::RetryPolicy;
pub use url_pool::UrlPool;
pub use worker_pool::WorkerPool;
