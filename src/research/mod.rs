//! Market research core: fusion, caching and rate limiting over an
//! external product-data provider.
//!
//! The module is organized around a small set of injectable components
//! with traits at the seams, so tests supply isolated instances and
//! production code controls lifecycle explicitly. There is no process-wide
//! state.

pub mod analysis;
pub mod cache;
pub mod client;
pub mod fusion;
pub mod health;
pub mod provider;
pub mod rate_limit;
pub mod scoring;
pub mod simulated;
pub mod sp_api;
pub mod types;

// Re-export the primary service and its configuration
pub use fusion::ProductResearchService;
pub use types::{
    CacheStats, CatalogItem, DailyFeature, EnrichedProduct, Facet, Level, OpportunityFactors,
    PricingInfo, RankInfo, ResearchConfig, ReviewSummary, ScoreBundle, SearchOptions, SearchPage,
    SearchQuery, SortKey,
};

// Re-export other key components for advanced usage
pub use analysis::{AnalysisOrchestrator, DeepAnalysis, DeepResearchEngine, HeuristicResearch, ProductFacts};
pub use cache::FacetCache;
pub use client::MarketDataClient;
pub use health::{FacetStatus, HealthReport, HealthTracker};
pub use provider::{ProductDataProvider, ProviderError};
pub use rate_limit::{SlidingWindowLimiter, ThrottleTimeout};
pub use scoring::{DefaultScoreModel, ScoreModel};
pub use simulated::SimulatedProvider;
pub use sp_api::SpApiProvider;

use nonempty::NonEmpty;
use std::sync::Arc;

/// Service builder for convenient construction with sensible defaults.
pub struct ResearchBuilder {
    config: ResearchConfig,
}

impl ResearchBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: ResearchConfig::default(),
        }
    }

    /// Set the provider endpoint base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the review analytics service base URL.
    pub fn with_reviews_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.reviews_endpoint = Some(endpoint.into());
        self
    }

    /// Set the marketplace used on every call.
    pub fn with_marketplace(mut self, marketplace: crate::types::Marketplace) -> Self {
        self.config.marketplace = marketplace;
        self
    }

    /// Set the outbound quota: requests per rolling window.
    pub fn with_rate_limit(mut self, max_requests: usize, window_ms: u64) -> Self {
        self.config.rate_limit.max_requests = max_requests;
        self.config.rate_limit.window_ms = window_ms;
        self
    }

    /// Bound how long a throttled call may wait before its facet is treated
    /// as unavailable.
    pub fn with_max_wait_ms(mut self, max_wait_ms: u64) -> Self {
        self.config.rate_limit.max_wait_ms = Some(max_wait_ms);
        self
    }

    /// Set the fallback cache TTL in seconds.
    pub fn with_default_ttl(mut self, ttl_secs: u64) -> Self {
        self.config.cache.default_ttl_secs = ttl_secs;
        self
    }

    /// Set max cache entries per cache.
    pub fn with_max_cache_entries(mut self, max_entries: u64) -> Self {
        self.config.cache.max_entries = max_entries;
        self
    }

    /// Set the per-call provider timeout in milliseconds.
    pub fn with_call_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.call_timeout_ms = timeout_ms;
        self
    }

    /// Set transport retry behavior.
    pub fn with_retries(mut self, attempts: usize, base_delay_ms: u64) -> Self {
        self.config.retry_attempts = attempts;
        self.config.retry_base_delay_ms = base_delay_ms;
        self
    }

    /// Set the categories swept for trending aggregation.
    pub fn with_trending_categories(mut self, categories: NonEmpty<String>) -> Self {
        self.config.trending.categories = categories;
        self
    }

    /// Set the minimum opportunity score for trending products.
    pub fn with_trending_threshold(mut self, min_opportunity: u8) -> Self {
        self.config.trending.min_opportunity = min_opportunity;
        self
    }

    /// Set scoring model tuning values.
    pub fn with_weights(mut self, weights: types::ScoreWeights) -> Self {
        self.config.weights = weights;
        self
    }

    /// Build the service configuration.
    pub fn build_config(self) -> ResearchConfig {
        self.config
    }

    /// Build the service over the given provider with default collaborators.
    pub fn build(self, provider: Arc<dyn ProductDataProvider>) -> ProductResearchService {
        ProductResearchService::new(provider, self.config)
    }

    /// Build the service with explicit scoring and analysis collaborators.
    pub fn build_with(
        self,
        provider: Arc<dyn ProductDataProvider>,
        engine: Arc<dyn DeepResearchEngine>,
        score_model: Arc<dyn ScoreModel>,
    ) -> ProductResearchService {
        ProductResearchService::with_components(provider, engine, score_model, self.config)
    }
}

impl Default for ResearchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nonempty::nonempty;

    #[test]
    fn test_research_builder() {
        let config = ResearchBuilder::new()
            .with_rate_limit(50, 30_000)
            .with_default_ttl(600)
            .with_call_timeout_ms(5_000)
            .with_trending_threshold(8)
            .build_config();

        assert_eq!(config.rate_limit.max_requests, 50);
        assert_eq!(config.rate_limit.window_ms, 30_000);
        assert_eq!(config.cache.default_ttl_secs, 600);
        assert_eq!(config.call_timeout_ms, 5_000);
        assert_eq!(config.trending.min_opportunity, 8);
    }

    #[test]
    fn test_research_builder_defaults() {
        let config = ResearchBuilder::new().build_config();

        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.rate_limit.max_wait_ms, None);
        assert_eq!(config.cache.default_ttl_secs, 900);
        assert_eq!(config.retry_attempts, 3);
    }

    #[test]
    fn test_builder_trending_categories() {
        let config = ResearchBuilder::new()
            .with_trending_categories(nonempty!["Kitchen".to_string()])
            .build_config();

        assert_eq!(config.trending.categories.len(), 1);
        assert_eq!(config.trending.categories.head, "Kitchen");
    }

    #[tokio::test]
    async fn test_builder_builds_service() {
        let service = ResearchBuilder::new()
            .with_rate_limit(10, 1_000)
            .build(Arc::new(SimulatedProvider::new()));

        let stats = service.cache_stats().await;
        assert_eq!(stats.products_cached, 0);
    }
}
