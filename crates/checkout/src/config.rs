//! Checkout configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CHECKOUT_API_BASE_URL` - Base URL of the shop backend API (e.g., `http://localhost:8080/api`)
//!
//! ## Optional
//! - `CHECKOUT_API_TOKEN` - Bearer token sent with every backend request
//! - `CHECKOUT_ORDER_TIMEOUT_SECS` - Order placement timeout (default: 30)
//! - `CHECKOUT_REFERENCE_TIMEOUT_SECS` - Reference data request timeout (default: 10)
//! - `CHECKOUT_REFERENCE_CACHE_TTL_SECS` - Countries/states cache TTL (default: 300)
//! - `CHECKOUT_PRODUCTS_PATH` - Where to navigate after a placed order (default: /products)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_ORDER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REFERENCE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REFERENCE_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_PRODUCTS_PATH: &str = "/products";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Checkout configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Shop backend API configuration, including the order timeout
    pub api: ShopApiConfig,
    /// Path to navigate to after a successful order
    pub products_path: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Shop backend API configuration.
///
/// Implements `Debug` manually to redact the API token.
#[derive(Clone)]
pub struct ShopApiConfig {
    /// Base URL; endpoint paths are appended to it
    pub base_url: Url,
    /// Optional bearer token
    pub api_token: Option<SecretString>,
    /// Per-request timeout for reference data lookups
    pub reference_timeout: Duration,
    /// Time-to-live of cached countries and states
    pub reference_cache_ttl: Duration,
    /// How long an order placement may take before it is reported as timed out
    pub order_timeout: Duration,
}

impl std::fmt::Debug for ShopApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("reference_timeout", &self.reference_timeout)
            .field("reference_cache_ttl", &self.reference_cache_ttl)
            .field("order_timeout", &self.order_timeout)
            .finish()
    }
}

impl ShopApiConfig {
    /// Create an API configuration with default timeouts and no token.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not a valid URL.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("CHECKOUT_API_BASE_URL", base_url)?,
            api_token: None,
            reference_timeout: Duration::from_secs(DEFAULT_REFERENCE_TIMEOUT_SECS),
            reference_cache_ttl: Duration::from_secs(DEFAULT_REFERENCE_CACHE_TTL_SECS),
            order_timeout: Duration::from_secs(DEFAULT_ORDER_TIMEOUT_SECS),
        })
    }

    /// Join an endpoint path (e.g., `countries`) onto the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }

    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_required_env("CHECKOUT_API_BASE_URL")?;
        Ok(Self {
            base_url: parse_base_url("CHECKOUT_API_BASE_URL", &base_url)?,
            api_token: get_optional_env("CHECKOUT_API_TOKEN").map(SecretString::from),
            reference_timeout: get_duration_secs(
                "CHECKOUT_REFERENCE_TIMEOUT_SECS",
                DEFAULT_REFERENCE_TIMEOUT_SECS,
            )?,
            reference_cache_ttl: get_duration_secs(
                "CHECKOUT_REFERENCE_CACHE_TTL_SECS",
                DEFAULT_REFERENCE_CACHE_TTL_SECS,
            )?,
            order_timeout: get_duration_secs(
                "CHECKOUT_ORDER_TIMEOUT_SECS",
                DEFAULT_ORDER_TIMEOUT_SECS,
            )?,
        })
    }
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ShopApiConfig::from_env()?;

        Ok(Self {
            api,
            products_path: get_env_or_default("CHECKOUT_PRODUCTS_PATH", DEFAULT_PRODUCTS_PATH),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Build a configuration for an API base URL with every other setting at
    /// its default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not a valid URL.
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigError> {
        let api = ShopApiConfig::new(base_url)?;
        Ok(Self {
            api,
            products_path: DEFAULT_PRODUCTS_PATH.to_string(),
            sentry_dsn: None,
            sentry_environment: None,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a whole number of seconds as a `Duration`.
fn get_duration_secs(key: &str, default: u64) -> Result<Duration, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(Duration::from_secs(default));
    };
    let secs = raw
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if secs == 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(Duration::from_secs(secs))
}

/// Parse the API base URL, making sure relative joins append to its path.
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    // Url::join replaces the last path segment unless the base ends with '/'
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&normalized)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }
    Ok(url)
}
