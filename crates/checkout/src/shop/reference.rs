//! Reference data client for the shop backend.
//!
//! Countries and states come from the backend's Spring Data REST
//! repositories and are cached (default 5-minute TTL). Expiration months and
//! years are derived from the clock.

use std::sync::Arc;

use chrono::Datelike;
use moka::future::Cache;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use super::{ApiError, http_client, read_json};
use crate::config::ShopApiConfig;
use crate::reference::{self, Country, ReferenceData, State};

/// HAL collection envelope: `{"_embedded": {...}}`.
#[derive(Debug, Deserialize)]
struct Embedded<T> {
    #[serde(rename = "_embedded")]
    embedded: T,
}

#[derive(Debug, Deserialize)]
struct CountriesPage {
    countries: Vec<Country>,
}

#[derive(Debug, Deserialize)]
struct StatesPage {
    states: Vec<State>,
}

// =============================================================================
// ShopFormClient
// =============================================================================

/// Client for the checkout form's reference data.
///
/// Cheaply cloneable; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct ShopFormClient {
    inner: Arc<ShopFormClientInner>,
}

struct ShopFormClientInner {
    client: reqwest::Client,
    countries_url: Url,
    states_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl ShopFormClient {
    /// Create a new reference data client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URLs cannot be built or the HTTP
    /// client fails to build.
    pub fn new(config: &ShopApiConfig) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(config.reference_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ShopFormClientInner {
                client: http_client(config, config.reference_timeout)?,
                countries_url: config.endpoint("countries")?,
                states_url: config.endpoint("states/search/findByCountryCode")?,
                cache,
            }),
        })
    }

    /// Drop all cached countries and states.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }
}

impl ReferenceData for ShopFormClient {
    #[instrument(skip(self))]
    async fn countries(&self) -> Result<Vec<Country>, ApiError> {
        if let Some(CacheValue::Countries(countries)) =
            self.inner.cache.get(&CacheKey::Countries).await
        {
            debug!("Cache hit for countries");
            return Ok(countries);
        }

        let response = self
            .inner
            .client
            .get(self.inner.countries_url.clone())
            .send()
            .await?;
        let page: Embedded<CountriesPage> = read_json(response).await?;
        let countries = page.embedded.countries;

        debug!(count = countries.len(), "Retrieved countries");

        self.inner
            .cache
            .insert(CacheKey::Countries, CacheValue::Countries(countries.clone()))
            .await;

        Ok(countries)
    }

    #[instrument(skip(self), fields(country_code = %country_code))]
    async fn states(&self, country_code: &str) -> Result<Vec<State>, ApiError> {
        let cache_key = CacheKey::States {
            country_code: country_code.to_string(),
        };

        if let Some(CacheValue::States(states)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for states");
            return Ok(states);
        }

        let mut url = self.inner.states_url.clone();
        url.query_pairs_mut().append_pair("code", country_code);

        let response = self.inner.client.get(url).send().await?;
        let page: Embedded<StatesPage> = read_json(response).await?;
        let states = page.embedded.states;

        debug!(count = states.len(), "Retrieved states");

        self.inner
            .cache
            .insert(cache_key, CacheValue::States(states.clone()))
            .await;

        Ok(states)
    }

    async fn credit_card_months(&self, start_month: u32) -> Result<Vec<u32>, ApiError> {
        let months = reference::credit_card_months(start_month);
        debug!(start_month, ?months, "Retrieved credit card months");
        Ok(months)
    }

    async fn credit_card_years(&self) -> Result<Vec<i32>, ApiError> {
        let years = reference::credit_card_years(chrono::Local::now().year());
        debug!(?years, "Retrieved credit card years");
        Ok(years)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hal_countries() {
        let json = r#"{
            "_embedded": {
                "countries": [
                    {"id": 1, "code": "BR", "name": "Brazil"},
                    {"id": 2, "code": "CA", "name": "Canada"}
                ]
            },
            "_links": {"self": {"href": "http://localhost:8080/api/countries"}}
        }"#;
        let page: Embedded<CountriesPage> = serde_json::from_str(json).unwrap();
        assert_eq!(page.embedded.countries.len(), 2);
        assert_eq!(page.embedded.countries[1].name, "Canada");
    }

    #[test]
    fn test_parse_hal_states() {
        let json = r#"{"_embedded": {"states": [{"id": 10, "name": "Acre"}]}}"#;
        let page: Embedded<StatesPage> = serde_json::from_str(json).unwrap();
        assert_eq!(page.embedded.states[0].name, "Acre");
    }

    #[test]
    fn test_new_builds_endpoints() {
        let config = ShopApiConfig::new("http://localhost:8080/api").unwrap();
        let client = ShopFormClient::new(&config).unwrap();
        assert_eq!(
            client.inner.states_url.as_str(),
            "http://localhost:8080/api/states/search/findByCountryCode"
        );
    }

    #[tokio::test]
    async fn test_months_and_years_are_local() {
        // Port 9 (discard) is never contacted: months and years need no request
        let config = ShopApiConfig::new("http://127.0.0.1:9/api").unwrap();
        let client = ShopFormClient::new(&config).unwrap();

        assert_eq!(client.credit_card_months(11).await.unwrap(), vec![11, 12]);
        let years = client.credit_card_years().await.unwrap();
        assert_eq!(years.first(), Some(&chrono::Local::now().year()));
        assert_eq!(years.len(), 11);
    }
}
