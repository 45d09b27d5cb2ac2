//! Unified checkout error type with Sentry integration.
//!
//! Every fallible controller operation returns [`CheckoutError`]. Order
//! failures are reported to Sentry through [`capture_order_failure`]; invalid
//! forms are a normal outcome and are never reported.

use thiserror::Error;

use crate::form::FormErrors;
use crate::order::OrderError;
use crate::reference::AddressGroup;
use crate::shop::ApiError;

/// Checkout-level error type.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The form has invalid fields; nothing was sent.
    #[error("Invalid form: {0}")]
    Validation(FormErrors),

    /// Reference data could not be loaded.
    #[error("Reference data error: {0}")]
    ReferenceData(ApiError),

    /// The order could not be placed.
    #[error("{0}")]
    Order(#[from] OrderError),

    /// An address lacks its state or country selection.
    #[error("Missing {}.{field}", .group.path())]
    MissingAddressField {
        group: AddressGroup,
        field: &'static str,
    },
}

/// Report a failed order to Sentry and the log.
pub fn capture_order_failure(error: &OrderError) {
    let event_id = sentry::capture_error(error);
    tracing::error!(
        error = %error,
        sentry_event_id = %event_id,
        "Order submission failed"
    );
}

/// Add a breadcrumb for checkout actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Selected country", Some(&[("country_code", "US")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
