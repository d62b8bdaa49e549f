//! Provider abstraction over the external product-data API.
//!
//! One method per facet. "No data for this item" is modeled as `Ok(None)`;
//! errors are reserved for transport and payload failures, and the caching
//! client converts those to absent results at its boundary.

use crate::research::types::{CatalogItem, PricingInfo, RankInfo, ReviewSummary, SearchPage, SearchQuery};
use crate::types::Asin;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure raised by a provider implementation.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network-level failure reaching the provider.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    /// The provider answered with a non-success status.
    #[error("provider returned HTTP {0}")]
    Status(reqwest::StatusCode),
    /// The call did not complete within the configured budget.
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
    /// The response arrived but did not have the expected shape.
    #[error("unexpected payload: {0}")]
    Payload(String),
}

impl ProviderError {
    /// True for failures worth retrying: network errors, timeouts,
    /// server-side status codes and provider-side throttling.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) | ProviderError::Timeout(_) => true,
            ProviderError::Status(status) => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            ProviderError::Payload(_) => false,
        }
    }
}

/// External source of per-item product data.
///
/// Implementations perform the raw calls and map wire payloads into the
/// internal record shapes. Caching, throttling and error-to-absent
/// conversion live in the client wrapper, not here.
#[async_trait]
pub trait ProductDataProvider: Send + Sync {
    /// Catalog listing for one item. `None` when the item does not exist.
    async fn catalog_item(&self, asin: &Asin) -> Result<Option<CatalogItem>, ProviderError>;

    /// Current offer pricing for one item.
    async fn pricing(&self, asin: &Asin) -> Result<Option<PricingInfo>, ProviderError>;

    /// Best-seller rank for one item.
    async fn sales_rank(&self, asin: &Asin) -> Result<Option<RankInfo>, ProviderError>;

    /// Review summary for one item.
    async fn reviews(&self, asin: &Asin) -> Result<Option<ReviewSummary>, ProviderError>;

    /// Keyword search over the catalog.
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage<CatalogItem>, ProviderError>;
}
