//! REST API client implementation.
//!
//! Uses `reqwest` for HTTP and `moka` to cache stores and products.

use std::sync::Arc;

use moka::future::Cache;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use grocery_aid_core::{CartPatch, GroupedCart, NewStoreVisit, Product, Store, StoreVisit};

use super::ApiError;
use super::cache::{CacheKey, CacheValue};
use crate::config::ApiConfig;

/// Content type of JSON Patch request bodies.
const JSON_PATCH_CONTENT_TYPE: &str = "application/json-patch+json";

/// Maximum number of cached stores lists and products.
const CACHE_CAPACITY: u64 = 1000;

/// Returns `true` if `reference` is an absolute http(s) URL rather than an id.
fn is_http_url(reference: &str) -> bool {
    reference.starts_with("http:") || reference.starts_with("https:")
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the Grocery Aid REST API.
///
/// Cheap to clone; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    api_base: String,
    cache: Option<Cache<CacheKey, CacheValue>>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let cache = (!config.cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(config.cache_ttl)
                .build()
        });

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                api_base: config.api_base(),
                cache,
            }),
        })
    }

    /// Base URL of the versioned API.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.inner.api_base
    }

    /// URL of an API path such as `/stores`.
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let url = format!("{}{path}", self.inner.api_base);
        Url::parse(&url).map_err(|source| ApiError::InvalidUrl { url, source })
    }

    /// URL of a resource given either by its absolute URL or by its id
    /// within `collection`.
    fn resolve(&self, collection: &str, reference: &str) -> Result<Url, ApiError> {
        if is_http_url(reference) {
            return Url::parse(reference).map_err(|source| ApiError::InvalidUrl {
                url: reference.to_string(),
                source,
            });
        }
        self.endpoint(&format!("/{collection}/{reference}"))
    }

    /// Send a request and decode the JSON response.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.header(ACCEPT, "application/json").send().await?;

        let status = response.status();

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            let err = ApiError::from_response(status, &response_text);
            if status.is_server_error() {
                tracing::error!(
                    status = %status,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "API returned server error"
                );
            } else {
                debug!(status = %status, detail = %err, "API returned client error");
            }
            return Err(err);
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse API response"
            );
            ApiError::Decode(e)
        })
    }

    // =========================================================================
    // Store Methods
    // =========================================================================

    /// List all stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_stores(&self) -> Result<Vec<Store>, ApiError> {
        if let Some(cache) = &self.inner.cache
            && let Some(CacheValue::Stores(stores)) = cache.get(&CacheKey::Stores).await
        {
            debug!("Cache hit for stores");
            return Ok(stores);
        }

        let url = self.endpoint("/stores")?;
        let stores: Vec<Store> = self.execute(self.inner.client.get(url)).await?;

        if let Some(cache) = &self.inner.cache {
            cache
                .insert(CacheKey::Stores, CacheValue::Stores(stores.clone()))
                .await;
        }

        Ok(stores)
    }

    /// Look up a product by EAN in a store.
    ///
    /// `store` is the store's id or its URL. Variable-price codes may be
    /// passed as scanned; the server resolves them to the catalogue product
    /// and reports the embedded price.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self))]
    pub async fn get_product(&self, store: &str, ean: &str) -> Result<Product, ApiError> {
        let store_url = self.resolve("stores", store)?;
        let url = format!("{}/products/{ean}", store_url.as_str().trim_end_matches('/'));
        let cache_key = CacheKey::Product { url: url.clone() };

        if let Some(cache) = &self.inner.cache
            && let Some(CacheValue::Product(product)) = cache.get(&cache_key).await
        {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = Url::parse(&url).map_err(|source| ApiError::InvalidUrl { url, source })?;
        let product: Product = self.execute(self.inner.client.get(url)).await?;

        if let Some(cache) = &self.inner.cache {
            cache
                .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
                .await;
        }

        Ok(product)
    }

    // =========================================================================
    // Store Visit Methods
    // =========================================================================

    /// Start a store visit in `store` (id or URL) with an empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unknown or the API request fails.
    #[instrument(skip(self))]
    pub async fn create_store_visit(&self, store: &str) -> Result<StoreVisit, ApiError> {
        let url = self.endpoint("/storevisits")?;
        let body = NewStoreVisit {
            store: store.to_string(),
        };

        let visit: StoreVisit = self
            .execute(self.inner.client.post(url).json(&body))
            .await?;

        debug!(store_visit = %visit.id, "Created store visit");
        Ok(visit)
    }

    /// Fetch a store visit by id or by URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the store visit is not found or the API request
    /// fails.
    #[instrument(skip(self))]
    pub async fn get_store_visit(&self, store_visit: &str) -> Result<StoreVisit, ApiError> {
        let url = self.resolve("storevisits", store_visit)?;
        self.execute(self.inner.client.get(url)).await
    }

    /// Apply `patch` to a store visit and return the updated store visit.
    ///
    /// The patch is sent to the store visit's own URL. There is no version
    /// check; concurrent edits are last-write-wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the patch or the API request
    /// fails.
    #[instrument(skip(self, store_visit, patch), fields(store_visit = %store_visit.id, ops = patch.len()))]
    pub async fn update_store_visit(
        &self,
        store_visit: &StoreVisit,
        patch: &CartPatch,
    ) -> Result<StoreVisit, ApiError> {
        let url = self.resolve("storevisits", &store_visit.self_url)?;
        let body = serde_json::to_vec(patch)?;

        self.execute(
            self.inner
                .client
                .patch(url)
                .header(CONTENT_TYPE, JSON_PATCH_CONTENT_TYPE)
                .body(body),
        )
        .await
    }

    /// Fetch the cart of a store visit split into price-limited groups.
    ///
    /// # Errors
    ///
    /// Returns an error if the store visit is not found or the API request
    /// fails.
    #[instrument(skip(self, store_visit), fields(store_visit = %store_visit.id))]
    pub async fn get_grouped_store_visit_cart(
        &self,
        store_visit: &StoreVisit,
    ) -> Result<GroupedCart, ApiError> {
        let url = store_visit.bins_url();
        let url = Url::parse(&url).map_err(|source| ApiError::InvalidUrl { url, source })?;
        self.execute(self.inner.client.get(url)).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client() -> ApiClient {
        ApiClient::new(&ApiConfig::for_origin("http://localhost:8000").unwrap()).unwrap()
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("http://localhost/api/v1/storevisits/1"));
        assert!(is_http_url("https://example.com"));
        assert!(!is_http_url("0f0c7a5e-3c1b-4f61-9a59-2f8d3f0e8b21"));
        assert!(!is_http_url("ftp://example.com"));
    }

    #[test]
    fn test_resolve_id() {
        let url = client()
            .resolve("storevisits", "0f0c7a5e-3c1b-4f61-9a59-2f8d3f0e8b21")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/v1/storevisits/0f0c7a5e-3c1b-4f61-9a59-2f8d3f0e8b21"
        );
    }

    #[test]
    fn test_resolve_url_used_verbatim() {
        let url = client()
            .resolve("storevisits", "https://other.example/api/v1/storevisits/abc")
            .unwrap();
        assert_eq!(url.as_str(), "https://other.example/api/v1/storevisits/abc");
    }

    #[test]
    fn test_resolve_invalid_url() {
        let result = client().resolve("stores", "http://");
        assert!(matches!(result, Err(ApiError::InvalidUrl { .. })));
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client().endpoint("/stores").unwrap().as_str(),
            "http://localhost:8000/api/v1/stores"
        );
    }
}
