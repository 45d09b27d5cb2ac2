//! Integration tests for Shopfront checkout.
//!
//! [`FakeShop`] is an in-process stand-in for the shop backend. It serves the
//! same HAL reference endpoints and purchase endpoint as the real service on
//! an ephemeral localhost port, records every purchase it receives, and can be
//! told to reject or stall orders.
//!
//! # Test Categories
//!
//! - `reference_data` - `ShopFormClient` against the fake backend
//! - `order_placement` - `CheckoutClient` wire format and error handling
//! - `checkout_flow` - `CheckoutController` end to end

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use shopfront_checkout::{CheckoutConfig, ConfigError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// How the fake backend answers `POST checkout/purchase`.
#[derive(Debug, Clone)]
pub enum PurchaseMode {
    /// Accept with this tracking number.
    Accept(String),
    /// Reply with an error status and a Spring-style `{"message": ...}` body.
    Reject { status: u16, message: String },
    /// Wait this long, then accept.
    Stall(Duration),
}

/// A running fake shop backend. The server stops when this is dropped.
pub struct FakeShop {
    addr: SocketAddr,
    state: Arc<ShopState>,
    task: JoinHandle<()>,
}

struct ShopState {
    mode: Mutex<PurchaseMode>,
    purchases: Mutex<Vec<Value>>,
    countries_requests: AtomicUsize,
    states_requests: AtomicUsize,
}

impl FakeShop {
    /// Start the backend on an ephemeral port, accepting every order.
    ///
    /// # Errors
    ///
    /// Returns an error if no local port can be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(ShopState {
            mode: Mutex::new(PurchaseMode::Accept("TRACK-0001".to_string())),
            purchases: Mutex::new(Vec::new()),
            countries_requests: AtomicUsize::new(0),
            states_requests: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/countries", get(countries))
            .route("/api/states/search/findByCountryCode", get(states))
            .route("/api/checkout/purchase", post(purchase))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            // Serve errors end the task; tests then fail on connection errors
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, state, task })
    }

    /// Base URL of the API, e.g. `http://127.0.0.1:41234/api`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Checkout configuration pointing at this backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is rejected.
    pub fn config(&self) -> Result<CheckoutConfig, ConfigError> {
        CheckoutConfig::with_base_url(&self.base_url())
    }

    /// Change how subsequent purchases are answered.
    pub async fn set_purchase_mode(&self, mode: PurchaseMode) {
        *self.state.mode.lock().await = mode;
    }

    /// Every purchase body received so far.
    pub async fn purchases(&self) -> Vec<Value> {
        self.state.purchases.lock().await.clone()
    }

    /// Number of `GET countries` requests served.
    #[must_use]
    pub fn countries_requests(&self) -> usize {
        self.state.countries_requests.load(Ordering::SeqCst)
    }

    /// Number of `GET states/...` requests served.
    #[must_use]
    pub fn states_requests(&self) -> usize {
        self.state.states_requests.load(Ordering::SeqCst)
    }
}

impl Drop for FakeShop {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn countries(State(state): State<Arc<ShopState>>) -> Json<Value> {
    state.countries_requests.fetch_add(1, Ordering::SeqCst);
    Json(json!({
        "_embedded": {
            "countries": [
                {"id": 1, "code": "US", "name": "United States"},
                {"id": 2, "code": "CA", "name": "Canada"},
                {"id": 3, "code": "AQ", "name": "Antarctica"}
            ]
        },
        "_links": {"self": {"href": "/api/countries"}}
    }))
}

#[derive(Deserialize)]
struct StatesQuery {
    code: String,
}

async fn states(
    State(state): State<Arc<ShopState>>,
    Query(query): Query<StatesQuery>,
) -> Json<Value> {
    state.states_requests.fetch_add(1, Ordering::SeqCst);

    let by_code: HashMap<&str, Value> = HashMap::from([
        (
            "US",
            json!([
                {"id": 1, "name": "Alabama"},
                {"id": 2, "name": "Alaska"},
                {"id": 3, "name": "Arizona"}
            ]),
        ),
        (
            "CA",
            json!([
                {"id": 10, "name": "Alberta"},
                {"id": 11, "name": "British Columbia"}
            ]),
        ),
    ]);
    let states = by_code
        .get(query.code.as_str())
        .cloned()
        .unwrap_or_else(|| json!([]));

    Json(json!({"_embedded": {"states": states}}))
}

async fn purchase(State(state): State<Arc<ShopState>>, Json(body): Json<Value>) -> Response {
    state.purchases.lock().await.push(body);
    let mode = state.mode.lock().await.clone();

    match mode {
        PurchaseMode::Accept(tracking) => accepted(&tracking),
        PurchaseMode::Reject { status, message } => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({
                    "status": status.as_u16(),
                    "error": status.canonical_reason(),
                    "message": message,
                    "path": "/api/checkout/purchase"
                })),
            )
                .into_response()
        }
        PurchaseMode::Stall(delay) => {
            tokio::time::sleep(delay).await;
            accepted("TRACK-LATE")
        }
    }
}

fn accepted(tracking: &str) -> Response {
    Json(json!({"orderTrackingNumber": tracking})).into_response()
}
