//! Order submission.
//!
//! [`submit_order`] sends an assembled purchase to an [`OrderService`] and
//! bounds the round trip with a timeout. [`SubmissionState`] is what a UI
//! renders while and after a submit is in flight.

use std::time::Duration;

use thiserror::Error;
use tracing::instrument;

use crate::purchase::{Purchase, PurchaseResponse};
use crate::shop::ApiError;

/// Destination of placed orders.
pub trait OrderService {
    /// Place an order and return the backend's response.
    async fn place_order(&self, purchase: &Purchase) -> Result<PurchaseResponse, ApiError>;
}

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order service rejected the order or could not be reached.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// No response arrived in time. The order may still have been placed.
    #[error("Order placement timed out after {0:?}")]
    TimedOut(Duration),
}

/// Lifecycle of the most recent submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Pending,
    Succeeded {
        tracking_number: String,
    },
    Failed {
        message: String,
    },
    TimedOut,
}

impl SubmissionState {
    /// Whether a submit is in flight.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Message to show the user once a submit has finished.
    #[must_use]
    pub fn alert_message(&self) -> Option<String> {
        match self {
            Self::Idle | Self::Pending => None,
            Self::Succeeded { tracking_number } => Some(format!(
                "Your order has been placed successfully! Order ID: {tracking_number}"
            )),
            Self::Failed { message } => Some(format!("There is an error: {message}")),
            Self::TimedOut => Some(
                "There is an error: the order service did not respond in time. \
                 Please check your orders before trying again."
                    .to_string(),
            ),
        }
    }

    /// State after a finished submit.
    pub(crate) fn from_outcome(outcome: &Result<PurchaseResponse, OrderError>) -> Self {
        match outcome {
            Ok(response) => Self::Succeeded {
                tracking_number: response.order_tracking_number.clone(),
            },
            Err(OrderError::TimedOut(_)) => Self::TimedOut,
            Err(OrderError::Api(e)) => Self::Failed {
                message: e.to_string(),
            },
        }
    }
}

/// Send `purchase` to `service`, giving up after `timeout`.
///
/// # Errors
///
/// Returns `OrderError::Api` if the service fails and `OrderError::TimedOut`
/// if it does not answer in time.
#[instrument(skip(service, purchase), fields(items = purchase.order_items.len()))]
pub async fn submit_order<O: OrderService>(
    service: &O,
    purchase: &Purchase,
    timeout: Duration,
) -> Result<PurchaseResponse, OrderError> {
    match tokio::time::timeout(timeout, service.place_order(purchase)).await {
        Ok(Ok(response)) => {
            tracing::info!(
                tracking_number = %response.order_tracking_number,
                "Order placed"
            );
            Ok(response)
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Order placement failed");
            Err(OrderError::Api(e))
        }
        Err(_) => {
            tracing::warn!(?timeout, "Order placement timed out");
            Err(OrderError::TimedOut(timeout))
        }
    }
}
