//! sellerscope - Amazon-seller market research core
//!
//! This crate provides the data-fusion, caching and rate-limiting layer of
//! a market research system: per-facet TTL caches, a sliding-window request
//! throttle, a provider client, a product fusion service and a deep-analysis
//! orchestrator.

pub mod research;
pub mod types;

// Re-export main types for convenience
pub use research::{ProductResearchService, ResearchBuilder, ResearchConfig};
pub use types::{Asin, Marketplace};
