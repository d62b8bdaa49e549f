//! HTTP implementation of the provider trait against an SP-API style
//! product-data service.
//!
//! Maps wire payloads into internal record shapes. Transient transport
//! failures are retried with exponential backoff before an error is
//! surfaced to the caching client.

use crate::research::provider::{ProductDataProvider, ProviderError};
use crate::research::types::{
    estimate_monthly_sales, CatalogItem, PricingInfo, RankInfo, ResearchConfig, ReviewSummary,
    SearchPage, SearchQuery,
};
use crate::types::{Asin, Marketplace};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;
use tracing::{debug, instrument};

/// Provider backed by the external product-data HTTP API.
pub struct SpApiProvider {
    http: Client,
    endpoint: String,
    reviews_endpoint: Option<String>,
    marketplace: Marketplace,
    access_token: Option<String>,
    retry_attempts: usize,
    retry_base_delay: Duration,
}

impl SpApiProvider {
    /// Build a provider from the service configuration.
    pub fn new(config: &ResearchConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.call_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            reviews_endpoint: config
                .reviews_endpoint
                .as_ref()
                .map(|e| e.trim_end_matches('/').to_string()),
            marketplace: config.marketplace.clone(),
            access_token: None,
            retry_attempts: config.retry_attempts,
            retry_base_delay: Duration::from_millis(config.retry_base_delay_ms),
        })
    }

    /// Attach the access token sent with every request.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Perform one GET, retrying transient failures. `Ok(None)` means the
    /// resource does not exist.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, ProviderError> {
        let strategy = ExponentialBackoff::from_millis(self.retry_base_delay.as_millis() as u64)
            .max_delay(Duration::from_secs(5))
            .take(self.retry_attempts);

        RetryIf::spawn(
            strategy,
            || self.get_json_once(url, query),
            |err: &ProviderError| err.is_transient(),
        )
        .await
    }

    async fn get_json_once<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, ProviderError> {
        let mut request = self.http.get(url).query(query);
        if let Some(token) = &self.access_token {
            request = request.header("x-amz-access-token", token);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!(url, "resource not found");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ProviderError::Status(status));
        }

        let body = response.json::<T>().await?;
        Ok(Some(body))
    }

    fn catalog_url(&self, asin: &Asin) -> String {
        format!("{}/catalog/2022-04-01/items/{}", self.endpoint, asin)
    }

    /// Map a configured category name onto the provider's browse node id.
    fn browse_node_id(category: &str) -> Option<&'static str> {
        match category {
            "Electronics" => Some("172282"),
            "Kitchen" => Some("284507"),
            "Sports" => Some("3375251"),
            "Books" => Some("283155"),
            "Clothing" => Some("7141123011"),
            "Home" => Some("1055398"),
            "Beauty" => Some("3760931"),
            _ => None,
        }
    }

    fn map_catalog(payload: CatalogItemPayload, fallback_asin: &Asin) -> CatalogItem {
        let asin = payload
            .asin
            .as_deref()
            .map(Asin::new)
            .unwrap_or_else(|| fallback_asin.clone());

        let summary = payload.summaries.into_iter().next();
        let (title, brand, category) = match summary {
            Some(s) => (
                s.item_name.unwrap_or_else(|| "Unknown Product".to_string()),
                s.brand.unwrap_or_else(|| "Unknown Brand".to_string()),
                s.browse_classification
                    .map(|c| c.display_name)
                    .unwrap_or_else(|| "Unknown".to_string()),
            ),
            None => (
                "Unknown Product".to_string(),
                "Unknown Brand".to_string(),
                "Unknown".to_string(),
            ),
        };

        let image_urls = payload
            .images
            .into_iter()
            .flat_map(|set| set.images)
            .map(|img| img.link)
            .collect();

        let features = bullet_points(&payload.attributes);

        let sales_rank = payload
            .sales_ranks
            .iter()
            .flat_map(|r| r.display_group_ranks.iter())
            .map(|r| r.rank)
            .next();

        CatalogItem {
            asin,
            title,
            brand,
            category,
            subcategory: None,
            image_urls,
            features,
            attributes: payload.attributes,
            sales_rank,
        }
    }

    fn map_rank(payload: &CatalogItemPayload) -> Option<RankInfo> {
        let group_rank = payload
            .sales_ranks
            .iter()
            .flat_map(|r| r.display_group_ranks.iter())
            .next()?;

        Some(RankInfo {
            rank: group_rank.rank,
            category: group_rank.title.clone(),
            percentile: None,
            estimated_monthly_sales: estimate_monthly_sales(&group_rank.title, group_rank.rank),
        })
    }

    fn map_pricing(envelope: PricingEnvelope) -> Option<PricingInfo> {
        let offers = envelope.payload?.offers;
        let offer = offers
            .iter()
            .find(|o| o.is_buy_box_winner.unwrap_or(false))
            .or_else(|| offers.first())?;

        Some(PricingInfo {
            current_price: offer.listing_price.amount,
            currency: offer.listing_price.currency_code.clone(),
            list_price: offer.regular_price.as_ref().map(|p| p.amount),
        })
    }
}

#[async_trait]
impl ProductDataProvider for SpApiProvider {
    #[instrument(skip(self), fields(asin = %asin))]
    async fn catalog_item(&self, asin: &Asin) -> Result<Option<CatalogItem>, ProviderError> {
        let query = [
            ("marketplaceIds", self.marketplace.id.clone()),
            (
                "includedData",
                "summaries,images,salesRanks,attributes".to_string(),
            ),
        ];
        let payload: Option<CatalogItemPayload> =
            self.get_json(&self.catalog_url(asin), &query).await?;
        Ok(payload.map(|p| Self::map_catalog(p, asin)))
    }

    #[instrument(skip(self), fields(asin = %asin))]
    async fn pricing(&self, asin: &Asin) -> Result<Option<PricingInfo>, ProviderError> {
        let url = format!(
            "{}/products/pricing/v0/items/{}/offers",
            self.endpoint, asin
        );
        let query = [
            ("MarketplaceId", self.marketplace.id.clone()),
            ("ItemCondition", "New".to_string()),
            ("CustomerType", "Consumer".to_string()),
        ];
        let envelope: Option<PricingEnvelope> = self.get_json(&url, &query).await?;
        Ok(envelope.and_then(Self::map_pricing))
    }

    #[instrument(skip(self), fields(asin = %asin))]
    async fn sales_rank(&self, asin: &Asin) -> Result<Option<RankInfo>, ProviderError> {
        let query = [
            ("marketplaceIds", self.marketplace.id.clone()),
            ("includedData", "summaries,salesRanks".to_string()),
        ];
        let payload: Option<CatalogItemPayload> =
            self.get_json(&self.catalog_url(asin), &query).await?;
        Ok(payload.as_ref().and_then(Self::map_rank))
    }

    #[instrument(skip(self), fields(asin = %asin))]
    async fn reviews(&self, asin: &Asin) -> Result<Option<ReviewSummary>, ProviderError> {
        // The catalog API has no review endpoint; review data comes from a
        // separately configured analytics service.
        let Some(base) = &self.reviews_endpoint else {
            debug!("no review service configured, review facet unavailable");
            return Ok(None);
        };

        let url = format!("{}/reviews/v1/items/{}", base, asin);
        let query = [("marketplace", self.marketplace.id.clone())];
        let summary: Option<ReviewSummary> = self.get_json(&url, &query).await?;
        Ok(summary)
    }

    #[instrument(skip(self, query), fields(keyword = %query.keyword))]
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage<CatalogItem>, ProviderError> {
        let url = format!("{}/catalog/2022-04-01/items", self.endpoint);
        let mut params = vec![
            ("marketplaceIds", self.marketplace.id.clone()),
            ("pageSize", query.limit.to_string()),
            (
                "includedData",
                "summaries,images,salesRanks,attributes".to_string(),
            ),
        ];
        if !query.keyword.is_empty() {
            params.push(("keywords", query.keyword.clone()));
        }
        if let Some(node) = query
            .category
            .as_deref()
            .and_then(Self::browse_node_id)
        {
            params.push(("classificationIds", node.to_string()));
        }
        if let Some(token) = &query.page_token {
            params.push(("pageToken", token.clone()));
        }

        let payload: Option<SearchPayload> = self.get_json(&url, &params).await?;
        let Some(payload) = payload else {
            return Ok(SearchPage::empty());
        };

        let products: Vec<CatalogItem> = payload
            .items
            .into_iter()
            .filter_map(|item| {
                let asin = item.asin.as_deref().map(Asin::new)?;
                Some(Self::map_catalog(item, &asin))
            })
            .collect();

        let next_token = payload.pagination.and_then(|p| p.next_token);
        Ok(SearchPage {
            total: payload.number_of_results.unwrap_or(products.len() as u64),
            has_next_page: next_token.is_some(),
            next_page_token: next_token,
            products,
        })
    }
}

/// Pull bullet point copy out of the raw attribute map.
fn bullet_points(attributes: &serde_json::Map<String, serde_json::Value>) -> Vec<String> {
    attributes
        .get("bullet_point")
        .and_then(|v| v.as_array())
        .map(|points| {
            points
                .iter()
                .filter_map(|p| p.get("value").and_then(|v| v.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// Wire payload shapes. Owned by the external collaborator; only the mapped
// internal records are part of this crate's contract.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogItemPayload {
    asin: Option<String>,
    #[serde(default)]
    summaries: Vec<CatalogSummary>,
    #[serde(default)]
    images: Vec<MarketplaceImages>,
    #[serde(default)]
    sales_ranks: Vec<MarketplaceRanks>,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogSummary {
    item_name: Option<String>,
    brand: Option<String>,
    browse_classification: Option<BrowseClassification>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrowseClassification {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct MarketplaceImages {
    #[serde(default)]
    images: Vec<ImageLink>,
}

#[derive(Debug, Deserialize)]
struct ImageLink {
    link: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarketplaceRanks {
    #[serde(default)]
    display_group_ranks: Vec<GroupRank>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupRank {
    title: String,
    rank: u32,
}

#[derive(Debug, Deserialize)]
struct PricingEnvelope {
    payload: Option<PricingPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PricingPayload {
    #[serde(default)]
    offers: Vec<Offer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Offer {
    listing_price: Money,
    regular_price: Option<Money>,
    is_buy_box_winner: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Money {
    amount: f64,
    currency_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPayload {
    #[serde(default)]
    items: Vec<CatalogItemPayload>,
    number_of_results: Option<u64>,
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    next_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_map_catalog_payload() {
        let payload: CatalogItemPayload = serde_json::from_value(json!({
            "asin": "B08XYZQ1W2",
            "summaries": [{
                "itemName": "Stainless Steel Widget",
                "brand": "WidgetCo",
                "browseClassification": { "displayName": "Kitchen" }
            }],
            "images": [{ "images": [{ "link": "https://img/1.jpg" }] }],
            "salesRanks": [{
                "displayGroupRanks": [{ "title": "Kitchen", "rank": 1520 }]
            }],
            "attributes": {
                "bullet_point": [
                    { "value": "Dishwasher safe" },
                    { "value": "Rust resistant" }
                ]
            }
        }))
        .expect("payload parses");

        let item = SpApiProvider::map_catalog(payload, &Asin::new("B08XYZQ1W2"));
        assert_eq!(item.title, "Stainless Steel Widget");
        assert_eq!(item.brand, "WidgetCo");
        assert_eq!(item.category, "Kitchen");
        assert_eq!(item.image_urls, vec!["https://img/1.jpg"]);
        assert_eq!(item.features, vec!["Dishwasher safe", "Rust resistant"]);
        assert_eq!(item.sales_rank, Some(1520));
    }

    #[test]
    fn test_map_catalog_payload_with_missing_fields() {
        let payload: CatalogItemPayload =
            serde_json::from_value(json!({})).expect("empty payload parses");

        let item = SpApiProvider::map_catalog(payload, &Asin::new("B000000000"));
        assert_eq!(item.asin.as_str(), "B000000000");
        assert_eq!(item.title, "Unknown Product");
        assert_eq!(item.brand, "Unknown Brand");
        assert_eq!(item.category, "Unknown");
        assert!(item.image_urls.is_empty());
        assert_eq!(item.sales_rank, None);
    }

    #[test]
    fn test_map_rank_payload() {
        let payload: CatalogItemPayload = serde_json::from_value(json!({
            "salesRanks": [{
                "displayGroupRanks": [{ "title": "Sports", "rank": 450 }]
            }]
        }))
        .expect("payload parses");

        let rank = SpApiProvider::map_rank(&payload).expect("rank present");
        assert_eq!(rank.rank, 450);
        assert_eq!(rank.category, "Sports");
        assert_eq!(rank.estimated_monthly_sales, 500);
    }

    #[test]
    fn test_map_pricing_prefers_buy_box_winner() {
        let envelope: PricingEnvelope = serde_json::from_value(json!({
            "payload": {
                "Offers": [
                    {
                        "ListingPrice": { "Amount": 24.99, "CurrencyCode": "USD" },
                        "IsBuyBoxWinner": false
                    },
                    {
                        "ListingPrice": { "Amount": 22.50, "CurrencyCode": "USD" },
                        "RegularPrice": { "Amount": 29.99, "CurrencyCode": "USD" },
                        "IsBuyBoxWinner": true
                    }
                ]
            }
        }))
        .expect("envelope parses");

        let pricing = SpApiProvider::map_pricing(envelope).expect("offer present");
        assert_eq!(pricing.current_price, 22.50);
        assert_eq!(pricing.list_price, Some(29.99));
    }

    #[test]
    fn test_map_pricing_empty_offers_is_absent() {
        let envelope: PricingEnvelope =
            serde_json::from_value(json!({ "payload": { "Offers": [] } }))
                .expect("envelope parses");
        assert!(SpApiProvider::map_pricing(envelope).is_none());
    }

    #[test]
    fn test_browse_node_mapping() {
        assert_eq!(SpApiProvider::browse_node_id("Electronics"), Some("172282"));
        assert_eq!(SpApiProvider::browse_node_id("Gardening"), None);
    }
}
