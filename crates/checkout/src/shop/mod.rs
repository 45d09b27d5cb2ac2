//! HTTP clients for the shop backend.
//!
//! # Architecture
//!
//! - Plain REST over `reqwest`; the backend is a Spring Data REST service
//!   returning HAL documents (`{"_embedded": {...}}`) for collections
//! - Countries and states are cached in memory via `moka`
//! - No retries: every call is a single round trip with a request timeout
//!
//! # Endpoints
//!
//! | Client | Method | Path |
//! |--------|--------|------|
//! | [`ShopFormClient`] | GET | `countries` |
//! | [`ShopFormClient`] | GET | `states/search/findByCountryCode?code={code}` |
//! | [`CheckoutClient`] | POST | `checkout/purchase` |

mod cache;
mod checkout;
mod reference;

pub use checkout::CheckoutClient;
pub use reference::ShopFormClient;

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::ShopApiConfig;

/// Maximum number of body characters written to logs.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Errors that can occur when talking to the shop backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    ///
    /// Displays the server message verbatim so it can be shown to the user.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configured API token cannot be sent as a header.
    #[error("Invalid API token: {0}")]
    InvalidToken(String),
}

/// Build a `reqwest` client carrying the bearer token (if any) and a request timeout.
fn http_client(config: &ShopApiConfig, timeout: Duration) -> Result<reqwest::Client, ApiError> {
    let mut headers = HeaderMap::new();

    if let Some(token) = &config.api_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| ApiError::InvalidToken(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()?)
}

/// Read a JSON body, turning non-success statuses into [`ApiError::Api`].
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();

    // Get response body as text first for better error diagnostics
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(
            status = %status,
            body = %truncate(&body),
            "Shop backend returned non-success status"
        );
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: error_message(status, &body),
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %truncate(&body),
            "Failed to parse shop backend response"
        );
        ApiError::Parse(e)
    })
}

/// Extract the user-facing message from an error body.
///
/// Spring error bodies carry a `message` field; anything else is passed
/// through as trimmed text. An empty body falls back to the status line.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(serde_json::Value::String(message)) = map.get("message")
        && !message.is_empty()
    {
        return message.clone();
    }

    let text = body.trim();
    if text.is_empty() {
        return format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        );
    }
    text.to_string()
}

/// Shorten a body for log fields.
fn truncate(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
