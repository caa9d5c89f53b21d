//! Configuration for the keyword harvest pipeline.
//!
//! This module provides the `PipelineConfig` struct and its type-safe
//! builder for assembling a validated run configuration, either fluently
//! or from the environment-variable table in the specification.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{Complete, PipelineConfigBuilder, WithSitemapUrls};
pub use types::{HttpClientProfile, PipelineConfig};
