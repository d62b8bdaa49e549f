//! End-to-end tests for the research service over the simulated provider.

use sellerscope::research::{
    FacetStatus, ResearchBuilder, SearchOptions, SearchQuery, SimulatedProvider, SortKey,
};
use sellerscope::types::Asin;
use std::collections::HashSet;
use std::sync::Arc;

fn service() -> sellerscope::ProductResearchService {
    ResearchBuilder::new()
        .with_trending_threshold(5)
        .build(Arc::new(SimulatedProvider::new()))
}

#[tokio::test]
async fn test_product_fusion_end_to_end() {
    let service = service();
    let asin = Asin::new("B08XYZQ1W2");

    let product = service
        .get_product(&asin, false)
        .await
        .expect("simulated catalog always has canonical items");

    assert_eq!(product.asin, asin);
    assert!(!product.catalog.title.is_empty());
    assert!(product.pricing.is_some());
    assert!(product.rank.is_some());
    assert!(product.reviews.is_some());
    assert!(product.scores.in_bounds());
    assert!(product.deep_analysis.is_none());
}

#[tokio::test]
async fn test_unknown_item_is_absent() {
    let service = service();
    let product = service.get_product(&Asin::new("not-an-asin"), false).await;
    assert!(product.is_none());
}

#[tokio::test]
async fn test_repeat_fetch_uses_caches() {
    let service = service();
    let asin = Asin::new("B08XYZQ1W2");

    service.get_product(&asin, false).await.expect("present");
    let after_first = service.cache_stats().await;

    service.get_product(&asin, false).await.expect("present");
    let after_second = service.cache_stats().await;

    assert_eq!(
        after_first.provider_calls, after_second.provider_calls,
        "second fetch must not reach the provider"
    );
    assert_eq!(after_second.products_cached, 1);
}

#[tokio::test]
async fn test_full_analysis_attaches_bundle() {
    let service = service();
    let asin = Asin::new("B08XYZQ1W2");

    let full = service
        .get_product(&asin, true)
        .await
        .expect("product present");
    let deep = full.deep_analysis.as_ref().expect("bundle attached");

    assert!((1..=10).contains(&deep.opportunity_score));
    assert!(!deep.keywords.primary.is_empty());
    assert_eq!(deep.demand.seasonality.len(), 12);

    // The cached copy stays clean.
    let cached = service
        .get_product(&asin, false)
        .await
        .expect("product present");
    assert!(cached.deep_analysis.is_none());
}

#[tokio::test]
async fn test_search_enriches_filters_and_sorts() {
    let service = service();
    let query = SearchQuery::keyword("widget");

    let page = service
        .search_products(
            &query,
            &SearchOptions {
                min_opportunity: Some(6),
                sort: Some(SortKey::Opportunity),
            },
        )
        .await;

    assert!(page.products.iter().all(|p| p.scores.opportunity >= 6));
    let scores: Vec<u8> = page.products.iter().map(|p| p.scores.opportunity).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "not sorted: {:?}", scores);
}

#[tokio::test]
async fn test_trending_is_bounded_unique_and_thresholded() {
    let service = service();

    let trending = service.trending_products(5).await;
    assert!(!trending.is_empty());
    assert!(trending.len() <= 5);

    let asins: HashSet<&str> = trending.iter().map(|p| p.asin.as_str()).collect();
    assert_eq!(asins.len(), trending.len(), "duplicate identifiers");
    assert!(trending.iter().all(|p| p.scores.opportunity >= 5));
}

#[tokio::test]
async fn test_daily_feature_has_analysis_and_reason() {
    let service = service();

    let feature = service.daily_feature().await.expect("feature available");
    assert!(!feature.reason.is_empty());
    assert_eq!(feature.date, chrono::Utc::now().date_naive());
    assert!(feature.product.deep_analysis.is_some());
}

#[tokio::test]
async fn test_analysis_getters_agree_with_bundle() {
    let service = service();
    let asin = Asin::new("B0AAAABBBB");

    let keywords = service.keyword_analysis(&asin).await.expect("present");
    let financial = service.financial_model(&asin).await.expect("present");
    let bundle = service.deep_analysis(&asin).await.expect("present");

    assert_eq!(bundle.keywords.primary.len(), keywords.primary.len());
    assert_eq!(
        bundle.financial.monthly_revenue,
        financial.monthly_revenue
    );
}

#[tokio::test]
async fn test_missing_item_yields_no_analysis() {
    let service = service();
    let asin = Asin::new("bogus");

    assert!(service.keyword_analysis(&asin).await.is_none());
    assert!(service.ppc_plan(&asin).await.is_none());
    assert!(service.inventory_analysis(&asin).await.is_none());
    assert!(service.demand_analysis(&asin).await.is_none());
    assert!(service.competitor_analysis(&asin).await.is_none());
    assert!(service.financial_model(&asin).await.is_none());
}

#[tokio::test]
async fn test_clear_cache_resets_counts() {
    let service = service();
    let asin = Asin::new("B08XYZQ1W2");

    service.get_product(&asin, false).await;
    let stats = service.cache_stats().await;
    assert!(stats.products_cached > 0);
    assert!(stats.provider_cache_size > 0);

    service.clear_cache();
    let stats = service.cache_stats().await;
    assert_eq!(stats.products_cached, 0);
    assert_eq!(stats.provider_cache_size, 0);
}

#[tokio::test]
async fn test_provider_health_is_reported() {
    let service = service();
    service.get_product(&Asin::new("B08XYZQ1W2"), false).await;

    let report = service.health_report();
    assert_eq!(report.overall, FacetStatus::Healthy);
    assert!(report
        .facets
        .iter()
        .all(|f| f.status == FacetStatus::Healthy));
}

#[tokio::test]
async fn test_fusion_respects_a_tight_rate_limit() {
    // Four facet calls against a three-per-window quota: the fourth call
    // waits for the window instead of failing.
    let service = ResearchBuilder::new()
        .with_rate_limit(3, 200)
        .build(Arc::new(SimulatedProvider::new()));

    let product = service
        .get_product(&Asin::new("B08XYZQ1W2"), false)
        .await
        .expect("fusion completes despite throttling");
    assert!(product.scores.in_bounds());
}
