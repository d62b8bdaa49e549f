//! Product fusion service.
//!
//! Fuses independently fetched facets into one enriched product per item,
//! attaches heuristic scores, and layers search, trending and daily-feature
//! aggregation on top. Fully fused products are memoized in their own cache
//! above the per-facet caches, since fusion and scoring carry their own
//! cost.

use crate::research::analysis::{
    AnalysisOrchestrator, CompetitorAnalysis, DeepAnalysis, DeepResearchEngine, DemandAnalysis,
    FinancialModel, HeuristicResearch, InventoryAnalysis, KeywordAnalysis, PpcPlan, ProductFacts,
};
use crate::research::cache::FacetCache;
use crate::research::client::MarketDataClient;
use crate::research::health::HealthReport;
use crate::research::provider::ProductDataProvider;
use crate::research::scoring::{DefaultScoreModel, ScoreModel};
use crate::research::types::{
    CacheStats, CatalogItem, DailyFeature, EnrichedProduct, ProductSignals, ResearchConfig,
    SearchOptions, SearchPage, SearchQuery, SortKey, TrendingConfig,
};
use crate::types::Asin;
use chrono::Utc;
use futures::future::join_all;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Front door for product research: fusion, search, trending and deep
/// analysis over one injected provider.
pub struct ProductResearchService {
    client: Arc<MarketDataClient>,
    score_model: Arc<dyn ScoreModel>,
    analysis: AnalysisOrchestrator,
    fused: FacetCache<Arc<EnrichedProduct>>,
    fused_ttl: Duration,
    trending: TrendingConfig,
}

impl ProductResearchService {
    /// Build a service with the default scoring model and analysis engine.
    pub fn new(provider: Arc<dyn ProductDataProvider>, config: ResearchConfig) -> Self {
        let score_model: Arc<dyn ScoreModel> =
            Arc::new(DefaultScoreModel::new(config.weights.clone()));
        let engine: Arc<dyn DeepResearchEngine> = Arc::new(HeuristicResearch::new());
        Self::with_components(provider, engine, score_model, config)
    }

    /// Build a service with explicit collaborators, for tests and tuning.
    pub fn with_components(
        provider: Arc<dyn ProductDataProvider>,
        engine: Arc<dyn DeepResearchEngine>,
        score_model: Arc<dyn ScoreModel>,
        config: ResearchConfig,
    ) -> Self {
        let fused_ttl = Duration::from_secs(config.cache.default_ttl_secs);
        let analysis = AnalysisOrchestrator::new(
            engine,
            score_model.clone(),
            config.cache.max_entries,
            Duration::from_secs(config.cache.analysis_ttl_secs),
        );

        Self {
            client: Arc::new(MarketDataClient::new(provider, &config)),
            score_model,
            analysis,
            fused: FacetCache::new(config.cache.max_entries, fused_ttl),
            fused_ttl,
            trending: config.trending.clone(),
        }
    }

    /// Fetch one product with every available facet fused in.
    ///
    /// Returns `None` when the item has no catalog record; no other facet is
    /// requested in that case. With `include_full_analysis` the returned
    /// copy carries the deep-analysis bundle; the cached instance stays
    /// without it.
    #[instrument(skip(self), fields(asin = %asin))]
    pub async fn get_product(
        &self,
        asin: &Asin,
        include_full_analysis: bool,
    ) -> Option<Arc<EnrichedProduct>> {
        let product = self
            .fused
            .get_or_fetch(asin.as_str(), self.fused_ttl, self.fuse(asin))
            .await?;

        if !include_full_analysis {
            return Some(product);
        }

        let facts = ProductFacts::from_product(&product);
        let bundle = self.analysis.full_bundle(&facts).await;
        let mut full = (*product).clone();
        full.deep_analysis = Some(bundle);
        Some(Arc::new(full))
    }

    /// Search the catalog, enrich every hit, then filter and sort client
    /// side.
    #[instrument(skip(self, query, options), fields(keyword = %query.keyword))]
    pub async fn search_products(
        &self,
        query: &SearchQuery,
        options: &SearchOptions,
    ) -> SearchPage<Arc<EnrichedProduct>> {
        let page = self.client.search(query).await;

        let mut products: Vec<Arc<EnrichedProduct>> = page
            .products
            .iter()
            .map(|item| Arc::new(self.enrich_listing(item.clone())))
            .collect();

        if let Some(min) = options.min_opportunity {
            products.retain(|p| p.scores.opportunity >= min);
        }
        if let Some(sort) = options.sort {
            Self::sort_products(&mut products, sort);
        }

        debug!(
            results = products.len(),
            upstream = page.products.len(),
            "search enriched and filtered"
        );

        SearchPage {
            total: products.len() as u64,
            has_next_page: page.has_next_page,
            next_page_token: page.next_page_token.clone(),
            products,
        }
    }

    /// Approximate trending by sweeping the configured categories,
    /// deduplicating, and re-ranking by opportunity plus a rank bonus.
    ///
    /// There is no provider-side trending endpoint; this is a client-side
    /// aggregation over several searches.
    #[instrument(skip(self))]
    pub async fn trending_products(&self, limit: usize) -> Vec<Arc<EnrichedProduct>> {
        let options = SearchOptions {
            min_opportunity: None,
            sort: Some(SortKey::Opportunity),
        };

        let sweeps = join_all(self.trending.categories.iter().map(|category| {
            let mut query = SearchQuery::category(category.clone());
            query.limit = self.trending.per_category_limit;
            async move { self.search_products(&query, &options).await.products }
        }))
        .await;

        let mut seen: HashSet<Asin> = HashSet::new();
        let mut pool: Vec<Arc<EnrichedProduct>> = Vec::new();
        for product in sweeps.into_iter().flatten() {
            if product.scores.opportunity >= self.trending.min_opportunity
                && seen.insert(product.asin.clone())
            {
                pool.push(product);
            }
        }

        pool.sort_by(|a, b| {
            Self::trending_metric(b)
                .partial_cmp(&Self::trending_metric(a))
                .unwrap_or(Ordering::Equal)
        });
        pool.truncate(limit);

        info!(count = pool.len(), "trending products assembled");
        pool
    }

    /// Pick the top trending product, run full analysis on it, and explain
    /// the choice.
    #[instrument(skip(self))]
    pub async fn daily_feature(&self) -> Option<DailyFeature> {
        let top = self.trending_products(1).await.into_iter().next()?;
        let product = self.get_product(&top.asin, true).await?;

        let reason = Self::feature_reason(&product);
        Some(DailyFeature {
            product,
            reason,
            date: Utc::now().date_naive(),
        })
    }

    /// Keyword landscape for one item.
    pub async fn keyword_analysis(&self, asin: &Asin) -> Option<Arc<KeywordAnalysis>> {
        let facts = self.facts_for(asin).await?;
        Some(self.analysis.keyword_analysis(&facts).await)
    }

    /// Paid-launch plan for one item.
    pub async fn ppc_plan(&self, asin: &Asin) -> Option<Arc<PpcPlan>> {
        let facts = self.facts_for(asin).await?;
        Some(self.analysis.ppc_plan(&facts).await)
    }

    /// Sourcing recommendation for one item.
    pub async fn inventory_analysis(&self, asin: &Asin) -> Option<Arc<InventoryAnalysis>> {
        let facts = self.facts_for(asin).await?;
        Some(self.analysis.inventory_analysis(&facts).await)
    }

    /// Market demand picture for one item.
    pub async fn demand_analysis(&self, asin: &Asin) -> Option<Arc<DemandAnalysis>> {
        let facts = self.facts_for(asin).await?;
        Some(self.analysis.demand_analysis(&facts).await)
    }

    /// Competitive landscape for one item.
    pub async fn competitor_analysis(&self, asin: &Asin) -> Option<Arc<CompetitorAnalysis>> {
        let facts = self.facts_for(asin).await?;
        Some(self.analysis.competitor_analysis(&facts).await)
    }

    /// Unit economics model for one item.
    pub async fn financial_model(&self, asin: &Asin) -> Option<Arc<FinancialModel>> {
        let facts = self.facts_for(asin).await?;
        Some(self.analysis.financial_model(&facts).await)
    }

    /// Full deep-analysis bundle for one item.
    pub async fn deep_analysis(&self, asin: &Asin) -> Option<DeepAnalysis> {
        let facts = self.facts_for(asin).await?;
        Some(self.analysis.full_bundle(&facts).await)
    }

    /// Provider health across facets.
    pub fn health_report(&self) -> HealthReport {
        self.client.health_report()
    }

    /// Counters for the caching layers.
    pub async fn cache_stats(&self) -> CacheStats {
        self.fused.sync().await;
        self.client.sync_caches().await;
        CacheStats {
            products_cached: self.fused.entry_count(),
            provider_cache_size: self.client.cache_size(),
            lookups: self.client.lookups(),
            provider_calls: self.client.provider_calls(),
        }
    }

    /// Drop every cached product, facet and analysis.
    pub fn clear_cache(&self) {
        self.fused.clear();
        self.client.clear_caches();
        self.analysis.clear();
        info!("cleared fused, facet and analysis caches");
    }

    /// Fetch and merge every facet for one item. Catalog existence gates the
    /// rest; the remaining facets are fetched concurrently and any subset
    /// may be absent.
    async fn fuse(&self, asin: &Asin) -> Option<Arc<EnrichedProduct>> {
        let catalog = self.client.catalog_item(asin).await?;

        let (pricing, rank, reviews) = tokio::join!(
            self.client.pricing(asin),
            self.client.sales_rank(asin),
            self.client.reviews(asin),
        );
        let reviews = reviews.map(|r| (*r).clone());

        let signals = ProductSignals {
            price: pricing.as_ref().map(|p| p.current_price),
            rank: rank.as_ref().map(|r| r.rank).or(catalog.sales_rank),
            review_count: reviews.as_ref().map(|r| r.total_reviews),
            average_rating: reviews.as_ref().map(|r| r.average_rating),
            category: catalog.category.clone(),
        };
        let scores = self.score_model.score_product(&signals);

        debug!(
            asin = %asin,
            has_pricing = pricing.is_some(),
            has_rank = rank.is_some(),
            has_reviews = reviews.is_some(),
            "fused product"
        );

        Some(Arc::new(EnrichedProduct {
            asin: asin.clone(),
            catalog: (*catalog).clone(),
            pricing,
            rank,
            reviews,
            scores,
            deep_analysis: None,
            last_updated: Utc::now(),
        }))
    }

    /// Enrich a bare search hit with scores. Only catalog data is available
    /// at this point; the per-item facets are not fetched for listings.
    fn enrich_listing(&self, catalog: CatalogItem) -> EnrichedProduct {
        let signals = ProductSignals {
            price: None,
            rank: catalog.sales_rank,
            review_count: None,
            average_rating: None,
            category: catalog.category.clone(),
        };
        let scores = self.score_model.score_product(&signals);

        EnrichedProduct {
            asin: catalog.asin.clone(),
            catalog,
            pricing: None,
            rank: None,
            reviews: None,
            scores,
            deep_analysis: None,
            last_updated: Utc::now(),
        }
    }

    async fn facts_for(&self, asin: &Asin) -> Option<ProductFacts> {
        let product = self.get_product(asin, false).await?;
        Some(ProductFacts::from_product(&product))
    }

    fn sort_products(products: &mut [Arc<EnrichedProduct>], sort: SortKey) {
        match sort {
            SortKey::Opportunity => {
                products.sort_by(|a, b| b.scores.opportunity.cmp(&a.scores.opportunity));
            }
            SortKey::Demand => {
                products.sort_by(|a, b| b.scores.demand.cmp(&a.scores.demand));
            }
            SortKey::Price => {
                products.sort_by(|a, b| {
                    a.price().partial_cmp(&b.price()).unwrap_or(Ordering::Equal)
                });
            }
            SortKey::Rank => {
                products.sort_by_key(|p| p.effective_rank().unwrap_or(u32::MAX));
            }
            SortKey::Recent => {
                products.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
            }
        }
    }

    /// Opportunity score plus a bonus for a strong sales rank.
    fn trending_metric(product: &EnrichedProduct) -> f64 {
        let rank_bonus = product
            .effective_rank()
            .map(|rank| 1.0 / (rank.max(2) as f64).ln())
            .unwrap_or(0.0);
        product.scores.opportunity as f64 + rank_bonus
    }

    fn feature_reason(product: &EnrichedProduct) -> String {
        let margin = product
            .deep_analysis
            .as_ref()
            .map(|d| d.financial.margins.gross)
            .unwrap_or(0.0);

        format!(
            "This {} product scores {}/10 for opportunity with a {:.0}% gross margin. \
             Strong market position with room for improvement makes it a solid entry \
             point for new sellers.",
            product.catalog.category.to_lowercase(),
            product.scores.opportunity,
            margin,
        )
    }
}
