//! Integration tests for the reference data client.
//!
//! These tests run `ShopFormClient` against the in-process fake backend.

#![allow(clippy::unwrap_used)]

use shopfront_checkout::shop::ApiError;
use shopfront_checkout::{ReferenceData, ShopApiConfig, ShopFormClient};
use shopfront_integration_tests::FakeShop;

#[tokio::test]
async fn test_countries_from_hal_collection() {
    let shop = FakeShop::start().await.unwrap();
    let client = ShopFormClient::new(&shop.config().unwrap().api).unwrap();

    let countries = client.countries().await.unwrap();

    let codes: Vec<_> = countries.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, ["US", "CA", "AQ"]);
    assert_eq!(countries[1].name, "Canada");
}

#[tokio::test]
async fn test_states_by_country_code() {
    let shop = FakeShop::start().await.unwrap();
    let client = ShopFormClient::new(&shop.config().unwrap().api).unwrap();

    let states = client.states("US").await.unwrap();
    assert_eq!(states.len(), 3);
    assert_eq!(states[0].name, "Alabama");

    assert!(client.states("AQ").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reference_lists_are_cached() {
    let shop = FakeShop::start().await.unwrap();
    let client = ShopFormClient::new(&shop.config().unwrap().api).unwrap();

    client.countries().await.unwrap();
    client.countries().await.unwrap();
    client.states("CA").await.unwrap();
    client.states("CA").await.unwrap();
    assert_eq!(shop.countries_requests(), 1);
    assert_eq!(shop.states_requests(), 1);

    client.invalidate_cache();
    client.countries().await.unwrap();
    assert_eq!(shop.countries_requests(), 2);
}

#[tokio::test]
async fn test_unreachable_backend_is_http_error() {
    let base_url = {
        let shop = FakeShop::start().await.unwrap();
        shop.base_url()
    };
    // The fake has been dropped, so nothing answers on its port any more
    let mut config = ShopApiConfig::new(&base_url).unwrap();
    config.reference_timeout = std::time::Duration::from_secs(2);
    let client = ShopFormClient::new(&config).unwrap();

    let err = client.countries().await.unwrap_err();
    assert!(matches!(err, ApiError::Http(_)), "{err:?}");
}
