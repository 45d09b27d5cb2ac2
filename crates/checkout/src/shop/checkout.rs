//! Order placement client for the shop backend.

use std::sync::Arc;

use tracing::instrument;
use url::Url;

use super::{ApiError, http_client, read_json};
use crate::config::ShopApiConfig;
use crate::order::OrderService;
use crate::purchase::{Purchase, PurchaseResponse};

/// Client for `POST checkout/purchase`.
///
/// Cheaply cloneable; clones share the HTTP connection pool.
#[derive(Clone)]
pub struct CheckoutClient {
    inner: Arc<CheckoutClientInner>,
}

struct CheckoutClientInner {
    client: reqwest::Client,
    purchase_url: Url,
}

impl CheckoutClient {
    /// Create a new order placement client.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint URL cannot be built or the HTTP
    /// client fails to build.
    pub fn new(config: &ShopApiConfig) -> Result<Self, ApiError> {
        Ok(Self {
            inner: Arc::new(CheckoutClientInner {
                client: http_client(config, config.order_timeout)?,
                purchase_url: config.endpoint("checkout/purchase")?,
            }),
        })
    }
}

impl OrderService for CheckoutClient {
    #[instrument(skip(self, purchase), fields(total_quantity = purchase.order.total_quantity))]
    async fn place_order(&self, purchase: &Purchase) -> Result<PurchaseResponse, ApiError> {
        let response = self
            .inner
            .client
            .post(self.inner.purchase_url.clone())
            .json(purchase)
            .send()
            .await?;

        let placed: PurchaseResponse = read_json(response).await?;
        tracing::debug!(
            tracking_number = %placed.order_tracking_number,
            "Purchase accepted by backend"
        );
        Ok(placed)
    }
}
