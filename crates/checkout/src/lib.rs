//! Shopfront checkout library.
//!
//! The checkout form controller: a multi-section form (customer, shipping
//! address, billing address, payment) with validation, dropdown reference
//! data, order placement against the shop backend, and the post-order reset
//! of the cart and form.
//!
//! # Example
//!
//! ```rust,ignore
//! let config = CheckoutConfig::from_env()?;
//! let _sentry = telemetry::init(&config);
//!
//! let session = session::in_memory_session();
//! let cart = CartState::restore(session.clone()).await;
//! let (navigator, route) = tokio::sync::watch::channel(String::from("/checkout"));
//!
//! let mut checkout = CheckoutController::new(
//!     ShopFormClient::new(&config.api)?,
//!     CheckoutClient::new(&config.api)?,
//!     navigator,
//!     cart,
//!     session,
//!     &config,
//! );
//! checkout.initialize().await;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod controller;
pub mod error;
pub mod form;
pub mod navigation;
pub mod order;
pub mod purchase;
pub mod reference;
pub mod session;
pub mod shop;
pub mod telemetry;

pub use cart::{CartItem, CartSnapshot, CartState, CartTotals};
pub use config::{CheckoutConfig, ConfigError, ShopApiConfig};
pub use controller::{CheckoutController, OrderConfirmation};
pub use error::CheckoutError;
pub use form::{CardType, CheckoutForm, FormErrors, FormModel};
pub use navigation::Navigator;
pub use order::{OrderError, OrderService, SubmissionState};
pub use purchase::{Purchase, PurchaseResponse, assemble_purchase};
pub use reference::{AddressGroup, Country, ReferenceData, State};
pub use shop::{ApiError, CheckoutClient, ShopFormClient};
