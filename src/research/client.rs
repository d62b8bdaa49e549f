//! Caching and throttling wrapper around a product-data provider.
//!
//! Every facet lookup goes cache first, then through the rate limiter, then
//! to the provider with a timeout. Provider failures are converted to absent
//! results here; callers treat missing data as a normal outcome.

use crate::research::cache::FacetCache;
use crate::research::health::{HealthReport, HealthTracker};
use crate::research::provider::{ProductDataProvider, ProviderError};
use crate::research::rate_limit::SlidingWindowLimiter;
use crate::research::types::{
    CatalogItem, Facet, PricingInfo, RankInfo, ResearchConfig, ReviewSummary, SearchPage,
    SearchQuery,
};
use crate::types::Asin;
use futures::future::join_all;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Facet client combining the TTL caches, the rate limiter and provider
/// health tracking.
pub struct MarketDataClient {
    provider: Arc<dyn ProductDataProvider>,
    limiter: SlidingWindowLimiter,
    health: HealthTracker,

    catalog_cache: FacetCache<Arc<CatalogItem>>,
    pricing_cache: FacetCache<PricingInfo>,
    rank_cache: FacetCache<RankInfo>,
    reviews_cache: FacetCache<Arc<ReviewSummary>>,
    search_cache: FacetCache<Arc<SearchPage<CatalogItem>>>,

    catalog_ttl: Duration,
    pricing_ttl: Duration,
    rank_ttl: Duration,
    reviews_ttl: Duration,
    search_ttl: Duration,

    call_timeout: Duration,
    /// Longest a throttled call may wait before the facet is reported
    /// absent. `None` waits without bound.
    max_wait: Option<Duration>,

    lookups: AtomicU64,
    provider_calls: AtomicU64,
    provider_errors: AtomicU64,
}

impl MarketDataClient {
    /// Build a client over the given provider.
    pub fn new(provider: Arc<dyn ProductDataProvider>, config: &ResearchConfig) -> Self {
        let cache = &config.cache;
        let default_ttl = Duration::from_secs(cache.default_ttl_secs);

        Self {
            provider,
            limiter: SlidingWindowLimiter::new(
                config.rate_limit.max_requests,
                Duration::from_millis(config.rate_limit.window_ms),
            ),
            health: HealthTracker::new(3, 50),
            catalog_cache: FacetCache::new(cache.max_entries, default_ttl),
            pricing_cache: FacetCache::new(cache.max_entries, default_ttl),
            rank_cache: FacetCache::new(cache.max_entries, default_ttl),
            reviews_cache: FacetCache::new(cache.max_entries, default_ttl),
            search_cache: FacetCache::new(cache.max_entries, default_ttl),
            catalog_ttl: Duration::from_secs(cache.catalog_ttl_secs),
            pricing_ttl: Duration::from_secs(cache.pricing_ttl_secs),
            rank_ttl: Duration::from_secs(cache.rank_ttl_secs),
            reviews_ttl: Duration::from_secs(cache.reviews_ttl_secs),
            search_ttl: Duration::from_secs(cache.search_ttl_secs),
            call_timeout: Duration::from_millis(config.call_timeout_ms),
            max_wait: config.rate_limit.max_wait_ms.map(Duration::from_millis),
            lookups: AtomicU64::new(0),
            provider_calls: AtomicU64::new(0),
            provider_errors: AtomicU64::new(0),
        }
    }

    /// Catalog listing for one item, cached under `product:{asin}`.
    #[instrument(skip(self), fields(asin = %asin))]
    pub async fn catalog_item(&self, asin: &Asin) -> Option<Arc<CatalogItem>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let key = Facet::Catalog.cache_key(asin.as_str());
        self.catalog_cache
            .get_or_fetch(&key, self.catalog_ttl, async {
                self.guarded(Facet::Catalog, self.provider.catalog_item(asin))
                    .await
                    .map(Arc::new)
            })
            .await
    }

    /// Offer pricing for one item, cached under `pricing:{asin}`.
    #[instrument(skip(self), fields(asin = %asin))]
    pub async fn pricing(&self, asin: &Asin) -> Option<PricingInfo> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let key = Facet::Pricing.cache_key(asin.as_str());
        self.pricing_cache
            .get_or_fetch(&key, self.pricing_ttl, async {
                self.guarded(Facet::Pricing, self.provider.pricing(asin)).await
            })
            .await
    }

    /// Best-seller rank for one item, cached under `bsr:{asin}`.
    #[instrument(skip(self), fields(asin = %asin))]
    pub async fn sales_rank(&self, asin: &Asin) -> Option<RankInfo> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let key = Facet::Rank.cache_key(asin.as_str());
        self.rank_cache
            .get_or_fetch(&key, self.rank_ttl, async {
                self.guarded(Facet::Rank, self.provider.sales_rank(asin)).await
            })
            .await
    }

    /// Review summary for one item, cached under `reviews:{asin}`.
    #[instrument(skip(self), fields(asin = %asin))]
    pub async fn reviews(&self, asin: &Asin) -> Option<Arc<ReviewSummary>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let key = Facet::Reviews.cache_key(asin.as_str());
        self.reviews_cache
            .get_or_fetch(&key, self.reviews_ttl, async {
                self.guarded(Facet::Reviews, self.provider.reviews(asin))
                    .await
                    .map(Arc::new)
            })
            .await
    }

    /// Keyword search, cached under `search:{query}`. A failed search is an
    /// empty page, not an error.
    #[instrument(skip(self, query), fields(keyword = %query.keyword))]
    pub async fn search(&self, query: &SearchQuery) -> Arc<SearchPage<CatalogItem>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let key = Facet::Search.cache_key(&query.cache_key());
        self.search_cache
            .get_or_fetch(&key, self.search_ttl, async {
                let page = self
                    .guarded_page(Facet::Search, self.provider.search(query))
                    .await;
                page.map(Arc::new)
            })
            .await
            .unwrap_or_else(|| Arc::new(SearchPage::empty()))
    }

    /// Fetch catalog data for several items concurrently. Items with no data
    /// are dropped; partial success is the norm.
    pub async fn catalog_many(&self, asins: &[Asin]) -> Vec<Arc<CatalogItem>> {
        join_all(asins.iter().map(|asin| self.catalog_item(asin)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Fetch pricing for several items concurrently, dropping absent results.
    pub async fn pricing_many(&self, asins: &[Asin]) -> Vec<PricingInfo> {
        join_all(asins.iter().map(|asin| self.pricing(asin)))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    /// Provider health across facets.
    pub fn health_report(&self) -> HealthReport {
        self.health.report()
    }

    /// Entries across the per-facet caches, stale-but-unevicted included.
    pub fn cache_size(&self) -> u64 {
        self.catalog_cache.entry_count()
            + self.pricing_cache.entry_count()
            + self.rank_cache.entry_count()
            + self.reviews_cache.entry_count()
            + self.search_cache.entry_count()
    }

    /// Drop every cached facet.
    pub fn clear_caches(&self) {
        self.catalog_cache.clear();
        self.pricing_cache.clear();
        self.rank_cache.clear();
        self.reviews_cache.clear();
        self.search_cache.clear();
    }

    /// Run pending cache maintenance so entry counts are current.
    pub async fn sync_caches(&self) {
        self.catalog_cache.sync().await;
        self.pricing_cache.sync().await;
        self.rank_cache.sync().await;
        self.reviews_cache.sync().await;
        self.search_cache.sync().await;
    }

    /// Facet lookups served since startup, cached or not.
    pub fn lookups(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Calls that reached the provider.
    pub fn provider_calls(&self) -> u64 {
        self.provider_calls.load(Ordering::Relaxed)
    }

    /// Provider calls that failed and were converted to absent results.
    pub fn provider_errors(&self) -> u64 {
        self.provider_errors.load(Ordering::Relaxed)
    }

    /// Run one optional-result provider call behind the rate limiter and the
    /// call timeout, converting every failure into an absent result.
    async fn guarded<T, Fut>(&self, facet: Facet, call: Fut) -> Option<T>
    where
        Fut: Future<Output = Result<Option<T>, ProviderError>>,
    {
        if !self.admit(facet).await {
            return None;
        }

        self.provider_calls.fetch_add(1, Ordering::Relaxed);
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(Ok(value)) => {
                // An absent item is still a healthy provider answer.
                self.health.record_success(facet);
                if value.is_none() {
                    debug!(facet = facet.as_str(), "no data for item");
                }
                value
            }
            Ok(Err(err)) => {
                self.note_failure(facet, &err.to_string());
                None
            }
            Err(_) => {
                self.note_failure(
                    facet,
                    &ProviderError::Timeout(self.call_timeout).to_string(),
                );
                None
            }
        }
    }

    /// Like [`MarketDataClient::guarded`] for calls that return a full page.
    async fn guarded_page<T, Fut>(&self, facet: Facet, call: Fut) -> Option<T>
    where
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        self.guarded(facet, async { call.await.map(Some) }).await
    }

    /// Wait for a rate-limit slot, honoring the configured wait budget.
    async fn admit(&self, facet: Facet) -> bool {
        match self.max_wait {
            None => {
                self.limiter.acquire().await;
                true
            }
            Some(budget) => {
                let deadline = Instant::now() + budget;
                match self.limiter.acquire_before(deadline).await {
                    Ok(()) => true,
                    Err(_) => {
                        warn!(
                            facet = facet.as_str(),
                            budget_ms = budget.as_millis() as u64,
                            "rate limit wait exceeded budget, treating facet as unavailable"
                        );
                        false
                    }
                }
            }
        }
    }

    fn note_failure(&self, facet: Facet, error: &str) {
        self.provider_errors.fetch_add(1, Ordering::Relaxed);
        self.health.record_failure(facet);
        warn!(facet = facet.as_str(), error, "provider call failed, facet unavailable");
    }
}
