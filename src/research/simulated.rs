//! Simulated provider producing plausible synthetic product data.
//!
//! The real catalog service exposes no review endpoint and sandbox access is
//! gated, so demos and integration tests run against this in-process
//! provider instead. Output is derived from the item identifier, so repeated
//! calls for one item agree with each other.

use crate::research::provider::{ProductDataProvider, ProviderError};
use crate::research::types::{
    estimate_monthly_sales, CatalogItem, PricingInfo, RankInfo, RatingHistogram, ReviewSummary,
    SearchPage, SearchQuery, SentimentBuckets,
};
use crate::types::Asin;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const CATEGORIES: [&str; 5] = ["Electronics", "Kitchen", "Sports", "Home", "Beauty"];

const ADJECTIVES: [&str; 6] = [
    "Stainless", "Compact", "Wireless", "Ergonomic", "Portable", "Premium",
];

const NOUNS: [&str; 6] = [
    "Widget", "Organizer", "Tracker", "Blender Jar", "Yoga Strap", "Desk Lamp",
];

const FEATURE_COPY: [&str; 5] = [
    "Easy to clean",
    "One year warranty",
    "Lightweight design",
    "Rechargeable battery",
    "Fits standard sizes",
];

/// In-process provider generating synthetic facets.
#[derive(Debug, Clone, Default)]
pub struct SimulatedProvider;

impl SimulatedProvider {
    pub fn new() -> Self {
        Self
    }

    fn rng(tag: &str, key: &str) -> StdRng {
        let mut hasher = DefaultHasher::new();
        tag.hash(&mut hasher);
        key.hash(&mut hasher);
        StdRng::seed_from_u64(hasher.finish())
    }

    fn category_for(asin: &Asin) -> &'static str {
        let mut rng = Self::rng("category", asin.as_str());
        CATEGORIES[rng.gen_range(0..CATEGORIES.len())]
    }

    fn rank_for(asin: &Asin) -> u32 {
        let mut rng = Self::rng("rank", asin.as_str());
        rng.gen_range(100..150_000)
    }

    fn price_for(asin: &Asin) -> f64 {
        let mut rng = Self::rng("price", asin.as_str());
        (rng.gen_range(12.0..120.0_f64) * 100.0).round() / 100.0
    }

    fn build_catalog(asin: &Asin, category: &str) -> CatalogItem {
        let mut rng = Self::rng("catalog", asin.as_str());
        let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
        let noun = NOUNS[rng.gen_range(0..NOUNS.len())];

        let feature_count = rng.gen_range(2..=4);
        let features = (0..feature_count)
            .map(|i| FEATURE_COPY[(rng.gen_range(0..FEATURE_COPY.len()) + i) % FEATURE_COPY.len()])
            .map(str::to_string)
            .collect();

        let mut attributes = serde_json::Map::new();
        attributes.insert(
            "item_weight".to_string(),
            serde_json::json!([{ "value": format!("{:.1} pounds", rng.gen_range(0.5..8.0_f64)) }]),
        );

        CatalogItem {
            asin: asin.clone(),
            title: format!("{} {} ({})", adjective, noun, category),
            brand: format!("{}Co", adjective),
            category: category.to_string(),
            subcategory: None,
            image_urls: vec![format!("https://images.example.com/{}/main.jpg", asin)],
            features,
            attributes,
            sales_rank: Some(Self::rank_for(asin)),
        }
    }

    fn search_asin(query: &SearchQuery, index: usize) -> Asin {
        let mut hasher = DefaultHasher::new();
        query.keyword.hash(&mut hasher);
        query.category.hash(&mut hasher);
        index.hash(&mut hasher);
        // Nine hex digits after the prefix keeps the canonical ten
        // character shape.
        Asin::new(format!("B{:09X}", hasher.finish() % 0x10_0000_0000))
    }
}

#[async_trait]
impl ProductDataProvider for SimulatedProvider {
    async fn catalog_item(&self, asin: &Asin) -> Result<Option<CatalogItem>, ProviderError> {
        if !asin.is_canonical() {
            return Ok(None);
        }
        let category = Self::category_for(asin);
        Ok(Some(Self::build_catalog(asin, category)))
    }

    async fn pricing(&self, asin: &Asin) -> Result<Option<PricingInfo>, ProviderError> {
        if !asin.is_canonical() {
            return Ok(None);
        }
        let mut rng = Self::rng("list_price", asin.as_str());
        let current_price = Self::price_for(asin);
        let list_price = rng
            .gen_bool(0.4)
            .then(|| (current_price * 1.15 * 100.0).round() / 100.0);

        Ok(Some(PricingInfo {
            current_price,
            currency: "USD".to_string(),
            list_price,
        }))
    }

    async fn sales_rank(&self, asin: &Asin) -> Result<Option<RankInfo>, ProviderError> {
        if !asin.is_canonical() {
            return Ok(None);
        }
        let category = Self::category_for(asin);
        let rank = Self::rank_for(asin);
        let percentile = 100.0 - (rank as f64 / 150_000.0 * 100.0);

        Ok(Some(RankInfo {
            rank,
            category: category.to_string(),
            percentile: Some(percentile),
            estimated_monthly_sales: estimate_monthly_sales(category, rank),
        }))
    }

    async fn reviews(&self, asin: &Asin) -> Result<Option<ReviewSummary>, ProviderError> {
        if !asin.is_canonical() {
            return Ok(None);
        }
        let mut rng = Self::rng("reviews", asin.as_str());
        let total_reviews: u32 = rng.gen_range(50..20_000);
        let average_rating = (rng.gen_range(3.5..5.0_f64) * 10.0).round() / 10.0;
        let positive = rng.gen_range(70.0..90.0_f64);
        let negative = rng.gen_range(5.0..15.0_f64);

        Ok(Some(ReviewSummary {
            total_reviews,
            average_rating,
            rating_distribution: RatingHistogram {
                five: total_reviews / 2,
                four: total_reviews / 4,
                three: total_reviews * 15 / 100,
                two: total_reviews * 7 / 100,
                one: total_reviews * 3 / 100,
            },
            sentiment: SentimentBuckets {
                positive,
                negative,
                neutral: (100.0 - positive - negative).max(0.0),
                common_positives: vec![
                    "Great quality".to_string(),
                    "Fast shipping".to_string(),
                    "Works as expected".to_string(),
                ],
                common_negatives: vec![
                    "Packaging issues".to_string(),
                    "Instructions unclear".to_string(),
                ],
            },
        }))
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage<CatalogItem>, ProviderError> {
        let category_pool: Vec<&str> = match query.category.as_deref() {
            Some(category) => vec![category],
            None => CATEGORIES.to_vec(),
        };

        let products: Vec<CatalogItem> = (0..query.limit)
            .map(|i| {
                let asin = Self::search_asin(query, i);
                let category = category_pool[i % category_pool.len()];
                Self::build_catalog(&asin, category)
            })
            .collect();

        let full_page = products.len() == query.limit && query.limit > 0;
        Ok(SearchPage {
            total: (products.len() as u64).saturating_mul(3),
            has_next_page: full_page,
            next_page_token: full_page.then(|| format!("sim-page:{}", query.cache_key())),
            products,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catalog_is_deterministic_per_asin() {
        let provider = SimulatedProvider::new();
        let asin = Asin::new("B08XYZQ1W2");

        let first = provider.catalog_item(&asin).await.expect("no error");
        let second = provider.catalog_item(&asin).await.expect("no error");

        let first = first.expect("item exists");
        let second = second.expect("item exists");
        assert_eq!(first.title, second.title);
        assert_eq!(first.category, second.category);
        assert_eq!(first.sales_rank, second.sales_rank);
    }

    #[tokio::test]
    async fn test_non_canonical_asin_is_absent() {
        let provider = SimulatedProvider::new();
        let asin = Asin::new("nope");

        assert!(provider.catalog_item(&asin).await.expect("no error").is_none());
        assert!(provider.pricing(&asin).await.expect("no error").is_none());
        assert!(provider.sales_rank(&asin).await.expect("no error").is_none());
        assert!(provider.reviews(&asin).await.expect("no error").is_none());
    }

    #[tokio::test]
    async fn test_rank_and_catalog_agree() {
        let provider = SimulatedProvider::new();
        let asin = Asin::new("B0AAAABBBB");

        let catalog = provider
            .catalog_item(&asin)
            .await
            .expect("no error")
            .expect("item exists");
        let rank = provider
            .sales_rank(&asin)
            .await
            .expect("no error")
            .expect("rank exists");

        assert_eq!(catalog.sales_rank, Some(rank.rank));
        assert_eq!(catalog.category, rank.category);
    }

    #[tokio::test]
    async fn test_search_honors_limit_and_category() {
        let provider = SimulatedProvider::new();
        let mut query = SearchQuery::keyword("widget");
        query.category = Some("Kitchen".to_string());
        query.limit = 7;

        let page = provider.search(&query).await.expect("no error");
        assert_eq!(page.products.len(), 7);
        assert!(page.products.iter().all(|p| p.category == "Kitchen"));
        assert!(page.has_next_page);
    }

    #[tokio::test]
    async fn test_review_histogram_roughly_sums() {
        let provider = SimulatedProvider::new();
        let reviews = provider
            .reviews(&Asin::new("B0CCCCDDDD"))
            .await
            .expect("no error")
            .expect("reviews exist");

        let histogram_total = reviews.rating_distribution.one
            + reviews.rating_distribution.two
            + reviews.rating_distribution.three
            + reviews.rating_distribution.four
            + reviews.rating_distribution.five;
        assert!(histogram_total <= reviews.total_reviews);
        assert!((1.0..=5.0).contains(&reviews.average_rating));
    }
}
