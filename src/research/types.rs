//! Core types and data structures for the market research system.

use crate::research::analysis::DeepAnalysis;
use crate::types::{Asin, Marketplace};
use chrono::{DateTime, NaiveDate, Utc};
use nonempty::{nonempty, NonEmpty};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Data facets served by the external provider.
///
/// Each facet is cached in its own namespace and tracked separately for
/// health reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facet {
    /// Catalog listing data (title, brand, category, images)
    Catalog,
    /// Current offer pricing
    Pricing,
    /// Best-seller rank
    Rank,
    /// Review counts, ratings and sentiment
    Reviews,
    /// Keyword search over the catalog
    Search,
}

impl Facet {
    /// Returns the string representation of the facet.
    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Catalog => "catalog",
            Facet::Pricing => "pricing",
            Facet::Rank => "rank",
            Facet::Reviews => "reviews",
            Facet::Search => "search",
        }
    }

    /// Cache key namespace for this facet.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Facet::Catalog => "product",
            Facet::Pricing => "pricing",
            Facet::Rank => "bsr",
            Facet::Reviews => "reviews",
            Facet::Search => "search",
        }
    }

    /// Build a namespaced cache key for the given identifier.
    pub fn cache_key(&self, id: &str) -> String {
        format!("{}:{}", self.key_prefix(), id)
    }

    /// Returns all provider facets.
    pub fn all() -> Vec<Facet> {
        vec![
            Facet::Catalog,
            Facet::Pricing,
            Facet::Rank,
            Facet::Reviews,
            Facet::Search,
        ]
    }
}

/// Catalog listing data for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    pub asin: Asin,
    pub title: String,
    pub brand: String,
    pub category: String,
    pub subcategory: Option<String>,
    /// Image URLs, largest variant first.
    pub image_urls: Vec<String>,
    /// Bullet-point feature copy from the listing.
    pub features: Vec<String>,
    /// Raw provider attributes, passed through unmapped.
    pub attributes: serde_json::Map<String, serde_json::Value>,
    /// Sales rank as reported alongside the catalog payload, when present.
    /// The authoritative value lives in [`RankInfo`].
    pub sales_rank: Option<u32>,
}

/// Current offer pricing for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingInfo {
    pub current_price: f64,
    pub currency: String,
    pub list_price: Option<f64>,
}

impl PricingInfo {
    /// Savings against the list price, if one is known and higher.
    pub fn savings(&self) -> Option<f64> {
        self.list_price
            .filter(|list| *list > self.current_price)
            .map(|list| list - self.current_price)
    }
}

/// Best-seller rank data for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankInfo {
    pub rank: u32,
    pub category: String,
    /// Percentile within the category, when the provider reports one.
    pub percentile: Option<f64>,
    /// Monthly unit sales estimated from the rank.
    pub estimated_monthly_sales: u32,
}

/// Estimate monthly unit sales from a best-seller rank.
///
/// Category multipliers and rank bands are coarse tuning values; the result
/// feeds the financial analyzer and is never presented as exact.
pub fn estimate_monthly_sales(category: &str, rank: u32) -> u32 {
    let multiplier = match category {
        "Electronics" => 0.8,
        "Kitchen" => 1.2,
        "Sports" => 1.0,
        "Books" => 0.6,
        "Clothing" => 1.5,
        "Home" => 1.1,
        "Beauty" => 0.9,
        _ => 1.0,
    };

    let base = if rank <= 100 {
        1000.0
    } else if rank <= 1_000 {
        500.0
    } else if rank <= 10_000 {
        100.0
    } else if rank <= 100_000 {
        20.0
    } else {
        5.0
    };

    (base * multiplier) as u32
}

/// Star rating histogram, one bucket per star.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatingHistogram {
    #[serde(rename = "1")]
    pub one: u32,
    #[serde(rename = "2")]
    pub two: u32,
    #[serde(rename = "3")]
    pub three: u32,
    #[serde(rename = "4")]
    pub four: u32,
    #[serde(rename = "5")]
    pub five: u32,
}

/// Aggregated review sentiment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentBuckets {
    /// Share of positive reviews, in percent.
    pub positive: f64,
    pub negative: f64,
    pub neutral: f64,
    pub common_positives: Vec<String>,
    pub common_negatives: Vec<String>,
}

/// Review summary for one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub total_reviews: u32,
    pub average_rating: f64,
    pub rating_distribution: RatingHistogram,
    pub sentiment: SentimentBuckets,
}

/// Coarse market intensity used for competition and risk inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    /// Returns the string representation of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Low => "low",
            Level::Medium => "medium",
            Level::High => "high",
        }
    }
}

/// Heuristic scores attached to every enriched product.
///
/// Each dimension is an integer between 1 and 10 inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreBundle {
    pub opportunity: u8,
    pub demand: u8,
    pub competition: u8,
    pub feasibility: u8,
}

impl ScoreBundle {
    /// True when every dimension is inside the valid band.
    pub fn in_bounds(&self) -> bool {
        [self.opportunity, self.demand, self.competition, self.feasibility]
            .iter()
            .all(|score| (1..=10).contains(score))
    }
}

/// Inputs to the swappable opportunity scoring function.
#[derive(Debug, Clone)]
pub struct OpportunityFactors {
    /// Compound annual demand growth rate, in percent.
    pub demand_growth_rate: f64,
    pub competition: Level,
    /// Serviceable obtainable market size, in USD.
    pub market_size: f64,
    /// Gross profit margin, in percent.
    pub profit_margin: f64,
    pub risk: Level,
}

/// Tuning values for the default scoring model.
///
/// These are business calibration numbers, not structural constants; swap
/// the whole model or adjust the weights without touching fusion logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Starting score before adjustments.
    pub base: f64,
    /// Divisor applied to the demand growth rate.
    pub growth_divisor: f64,
    /// Maximum contribution from demand growth.
    pub growth_cap: f64,
    /// Market size (USD) that contributes one point.
    pub market_size_unit: f64,
    /// Maximum contribution from market size.
    pub market_size_cap: f64,
    /// Divisor applied to the profit margin percentage.
    pub margin_divisor: f64,
    /// Maximum contribution from profit margin.
    pub margin_cap: f64,
    /// Bonus for low competition; high competition subtracts the same amount.
    pub competition_swing: f64,
    /// Bonus for low risk; high risk subtracts the same amount.
    pub risk_swing: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            base: 5.0,
            growth_divisor: 10.0,
            growth_cap: 3.0,
            market_size_unit: 5_000_000.0,
            market_size_cap: 2.0,
            margin_divisor: 50.0,
            margin_cap: 2.0,
            competition_swing: 2.0,
            risk_swing: 1.0,
        }
    }
}

/// Signals extracted from fetched facets for basic product scoring.
///
/// Absent facets simply leave fields unset; the scorer treats missing
/// signals as neutral.
#[derive(Debug, Clone, Default)]
pub struct ProductSignals {
    pub price: Option<f64>,
    pub rank: Option<u32>,
    pub review_count: Option<u32>,
    pub average_rating: Option<f64>,
    pub category: String,
}

/// One item identifier fused with every facet the provider returned,
/// plus derived heuristic scores.
///
/// Cached instances are shared behind `Arc` and treated as immutable;
/// derived analyses are attached to fresh copies, never in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedProduct {
    pub asin: Asin,
    pub catalog: CatalogItem,
    pub pricing: Option<PricingInfo>,
    pub rank: Option<RankInfo>,
    pub reviews: Option<ReviewSummary>,
    pub scores: ScoreBundle,
    /// Deep analysis bundle, present only when full analysis was requested.
    pub deep_analysis: Option<DeepAnalysis>,
    pub last_updated: DateTime<Utc>,
}

impl EnrichedProduct {
    /// Current price, falling back to zero when the pricing facet is absent.
    pub fn price(&self) -> f64 {
        self.pricing.as_ref().map_or(0.0, |p| p.current_price)
    }

    /// Best available sales rank: the rank facet when present, otherwise the
    /// rank reported alongside the catalog payload.
    pub fn effective_rank(&self) -> Option<u32> {
        self.rank
            .as_ref()
            .map(|r| r.rank)
            .or(self.catalog.sales_rank)
    }

    /// Build the scoring signals view over the fetched facets.
    pub fn signals(&self) -> ProductSignals {
        ProductSignals {
            price: self.pricing.as_ref().map(|p| p.current_price),
            rank: self.effective_rank(),
            review_count: self.reviews.as_ref().map(|r| r.total_reviews),
            average_rating: self.reviews.as_ref().map(|r| r.average_rating),
            category: self.catalog.category.clone(),
        }
    }
}

/// Keyword search request against the provider catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    pub keyword: String,
    pub category: Option<String>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub min_rating: Option<f64>,
    pub limit: usize,
    pub page_token: Option<String>,
}

impl SearchQuery {
    /// Search for a keyword with default paging.
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Self::default()
        }
    }

    /// Browse a category with default paging.
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    /// Deterministic cache key covering every parameter of the query.
    pub fn cache_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.keyword,
            self.category.as_deref().unwrap_or(""),
            self.price_min.map(|v| v.to_string()).unwrap_or_default(),
            self.price_max.map(|v| v.to_string()).unwrap_or_default(),
            self.min_rating.map(|v| v.to_string()).unwrap_or_default(),
            self.limit,
            self.page_token.as_deref().unwrap_or(""),
        )
    }
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            category: None,
            price_min: None,
            price_max: None,
            min_rating: None,
            limit: 20,
            page_token: None,
        }
    }
}

/// Client-side ordering applied after enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    Opportunity,
    Demand,
    Price,
    Rank,
    Recent,
}

/// Client-side filtering and ordering options for enriched search results.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    /// Drop results scoring below this opportunity value.
    pub min_opportunity: Option<u8>,
    pub sort: Option<SortKey>,
}

/// One page of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage<T> {
    pub products: Vec<T>,
    pub total: u64,
    pub has_next_page: bool,
    pub next_page_token: Option<String>,
}

impl<T> SearchPage<T> {
    /// An empty result page.
    pub fn empty() -> Self {
        Self {
            products: Vec::new(),
            total: 0,
            has_next_page: false,
            next_page_token: None,
        }
    }
}

/// Product highlighted for the day, with the reason it was chosen.
#[derive(Debug, Clone)]
pub struct DailyFeature {
    pub product: Arc<EnrichedProduct>,
    pub reason: String,
    pub date: NaiveDate,
}

/// Counters describing the caching layers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries in the fused-product cache.
    pub products_cached: u64,
    /// Entries across the per-facet provider caches.
    pub provider_cache_size: u64,
    /// Facet lookups served since startup, cached or not.
    pub lookups: u64,
    /// Calls that reached the external provider.
    pub provider_calls: u64,
}

/// Cache sizing and per-facet TTLs, in seconds.
///
/// Volatile data expires quickly (pricing), stable data slowly
/// (reviews, rank).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub max_entries: u64,
    /// Fallback TTL, also used for the fused-product cache.
    pub default_ttl_secs: u64,
    pub catalog_ttl_secs: u64,
    pub pricing_ttl_secs: u64,
    pub rank_ttl_secs: u64,
    pub reviews_ttl_secs: u64,
    pub search_ttl_secs: u64,
    /// TTL for cached deep-analysis results.
    pub analysis_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl_secs: 15 * 60,
            catalog_ttl_secs: 30 * 60,
            pricing_ttl_secs: 5 * 60,
            rank_ttl_secs: 60 * 60,
            reviews_ttl_secs: 2 * 60 * 60,
            search_ttl_secs: 10 * 60,
            analysis_ttl_secs: 2 * 60 * 60,
        }
    }
}

/// Outbound request quota configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per rolling window.
    pub max_requests: usize,
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Longest a throttled call may wait before the facet is treated as
    /// unavailable. `None` waits without bound.
    pub max_wait_ms: Option<u64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_ms: 60_000,
            max_wait_ms: None,
        }
    }
}

/// Category sweep configuration for trending aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingConfig {
    /// Categories swept on every trending request. At least one is required.
    pub categories: NonEmpty<String>,
    /// Minimum opportunity score for a product to trend.
    pub min_opportunity: u8,
    /// Results requested per category search.
    pub per_category_limit: usize,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            categories: nonempty![
                "Electronics".to_string(),
                "Kitchen".to_string(),
                "Sports".to_string(),
                "Home".to_string(),
                "Beauty".to_string(),
            ],
            min_opportunity: 7,
            per_category_limit: 20,
        }
    }
}

/// Top-level configuration for the research service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    pub marketplace: Marketplace,
    /// Base URL of the external product-data API.
    pub endpoint: String,
    /// Base URL of the review analytics service, when one is configured.
    pub reviews_endpoint: Option<String>,
    /// Timeout applied around every provider call, in milliseconds.
    pub call_timeout_ms: u64,
    /// Transport-error retry attempts per provider call.
    pub retry_attempts: usize,
    /// Initial retry backoff delay, in milliseconds.
    pub retry_base_delay_ms: u64,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub trending: TrendingConfig,
    /// Scoring model tuning values.
    pub weights: ScoreWeights,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            marketplace: Marketplace::us(),
            endpoint: "https://sellingpartnerapi-na.amazon.com".to_string(),
            reviews_endpoint: None,
            call_timeout_ms: 10_000,
            retry_attempts: 3,
            retry_base_delay_ms: 100,
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            trending: TrendingConfig::default(),
            weights: ScoreWeights::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facet_cache_key_namespaces() {
        assert_eq!(Facet::Catalog.cache_key("B08X"), "product:B08X");
        assert_eq!(Facet::Pricing.cache_key("B08X"), "pricing:B08X");
        assert_eq!(Facet::Rank.cache_key("B08X"), "bsr:B08X");
        assert_eq!(Facet::Reviews.cache_key("B08X"), "reviews:B08X");
        assert_eq!(Facet::Search.cache_key("q"), "search:q");
    }

    #[test]
    fn test_estimate_monthly_sales_bands() {
        assert_eq!(estimate_monthly_sales("Sports", 50), 1000);
        assert_eq!(estimate_monthly_sales("Sports", 500), 500);
        assert_eq!(estimate_monthly_sales("Sports", 5_000), 100);
        assert_eq!(estimate_monthly_sales("Sports", 50_000), 20);
        assert_eq!(estimate_monthly_sales("Sports", 500_000), 5);
    }

    #[test]
    fn test_estimate_monthly_sales_category_multiplier() {
        assert_eq!(estimate_monthly_sales("Clothing", 500), 750);
        assert_eq!(estimate_monthly_sales("Books", 500), 300);
        assert_eq!(estimate_monthly_sales("Unknown", 500), 500);
    }

    #[test]
    fn test_pricing_savings() {
        let pricing = PricingInfo {
            current_price: 25.0,
            currency: "USD".to_string(),
            list_price: Some(30.0),
        };
        assert_eq!(pricing.savings(), Some(5.0));

        let no_discount = PricingInfo {
            current_price: 25.0,
            currency: "USD".to_string(),
            list_price: Some(20.0),
        };
        assert_eq!(no_discount.savings(), None);
    }

    #[test]
    fn test_search_query_cache_key_distinguishes_params() {
        let a = SearchQuery::keyword("yoga mat");
        let mut b = SearchQuery::keyword("yoga mat");
        b.category = Some("Sports".to_string());

        assert_ne!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), SearchQuery::keyword("yoga mat").cache_key());
    }

    #[test]
    fn test_score_bundle_bounds_check() {
        let good = ScoreBundle {
            opportunity: 7,
            demand: 1,
            competition: 10,
            feasibility: 5,
        };
        assert!(good.in_bounds());

        let bad = ScoreBundle {
            opportunity: 0,
            demand: 5,
            competition: 5,
            feasibility: 5,
        };
        assert!(!bad.in_bounds());
    }

    #[test]
    fn test_default_config_values() {
        let config = ResearchConfig::default();
        assert_eq!(config.cache.default_ttl_secs, 900);
        assert_eq!(config.cache.pricing_ttl_secs, 300);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.trending.min_opportunity, 7);
        assert!(config.trending.categories.len() >= 1);
    }
}
