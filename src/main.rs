//! Demo entry point for the sellerscope research core.
//!
//! Runs the fusion service against the simulated provider: one product
//! lookup, a keyword search, the trending sweep, the daily feature and a
//! deep-analysis bundle.

use anyhow::Result;
use sellerscope::research::{
    ResearchBuilder, SearchOptions, SearchQuery, SimulatedProvider, SortKey,
};
use sellerscope::types::Asin;
use std::sync::Arc;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting sellerscope research demo");

    let service = ResearchBuilder::new()
        .with_rate_limit(100, 60_000)
        .with_max_wait_ms(5_000)
        .build(Arc::new(SimulatedProvider::new()));

    // Single product fusion
    let asin = Asin::new("B08XYZQ1W2");
    match service.get_product(&asin, false).await {
        Some(product) => {
            info!(
                asin = %product.asin,
                title = %product.catalog.title,
                price = product.price(),
                opportunity = product.scores.opportunity,
                demand = product.scores.demand,
                "fused product"
            );
        }
        None => info!(asin = %asin, "no catalog record for item"),
    }

    // Keyword search with client-side filtering and sorting
    let query = SearchQuery::keyword("yoga mat");
    let results = service
        .search_products(
            &query,
            &SearchOptions {
                min_opportunity: Some(6),
                sort: Some(SortKey::Opportunity),
            },
        )
        .await;
    info!(results = results.products.len(), "search complete");
    for product in results.products.iter().take(3) {
        info!(
            asin = %product.asin,
            title = %product.catalog.title,
            opportunity = product.scores.opportunity,
            "search hit"
        );
    }

    // Trending sweep over the configured categories
    let trending = service.trending_products(5).await;
    for product in &trending {
        info!(
            asin = %product.asin,
            category = %product.catalog.category,
            opportunity = product.scores.opportunity,
            "trending"
        );
    }

    // Daily feature with full analysis attached
    if let Some(feature) = service.daily_feature().await {
        info!(date = %feature.date, asin = %feature.product.asin, "daily feature");
        info!("{}", feature.reason);
        if let Some(deep) = &feature.product.deep_analysis {
            info!(
                overall = deep.opportunity_score,
                cagr = deep.demand.growth.cagr,
                monthly_profit = deep.financial.monthly_profit,
                "deep analysis"
            );
        }
    }

    // Deep-analysis getters are cached per item
    if let Some(keywords) = service.keyword_analysis(&asin).await {
        info!(
            primary = keywords.primary.len(),
            avg_cpc = keywords.avg_cpc,
            "keyword analysis"
        );
    }

    let stats = service.cache_stats().await;
    info!(
        products_cached = stats.products_cached,
        provider_cache_size = stats.provider_cache_size,
        lookups = stats.lookups,
        provider_calls = stats.provider_calls,
        "cache stats"
    );

    let health = service.health_report();
    info!(overall = ?health.overall, "provider health");

    Ok(())
}
