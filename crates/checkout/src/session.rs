//! Session-scoped storage used by checkout.
//!
//! Values are stored as JSON in a `tower_sessions::Session`. The storefront
//! writes the signed-in user's email there; the cart persists its items there.

use std::sync::Arc;

use tower_sessions::{MemoryStore, Session};

/// Session keys shared with the rest of the storefront.
pub mod keys {
    /// Key for the signed-in user's email (a JSON string).
    pub const USER_EMAIL: &str = "userEmail";

    /// Key for the persisted cart items (a JSON array).
    pub const CART_ITEMS: &str = "cartItems";
}

/// Create a session backed by an in-process memory store.
///
/// Suitable for a single checkout process and for tests; server deployments
/// hand in the session from their session layer instead.
#[must_use]
pub fn in_memory_session() -> Session {
    Session::new(None, Arc::new(MemoryStore::default()), None)
}

/// Read the stored user email.
///
/// Best effort: a missing key, a non-string value, or a store failure all
/// yield `None`.
pub async fn stored_user_email(session: &Session) -> Option<String> {
    match session.get::<String>(keys::USER_EMAIL).await {
        Ok(email) => email,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unreadable stored email");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stored_user_email_present() {
        let session = in_memory_session();
        session
            .insert(keys::USER_EMAIL, "shopper@example.com")
            .await
            .unwrap();

        assert_eq!(
            stored_user_email(&session).await.as_deref(),
            Some("shopper@example.com")
        );
    }

    #[tokio::test]
    async fn test_stored_user_email_missing() {
        let session = in_memory_session();
        assert_eq!(stored_user_email(&session).await, None);
    }

    #[tokio::test]
    async fn test_stored_user_email_malformed() {
        let session = in_memory_session();
        session
            .insert(keys::USER_EMAIL, serde_json::json!({"not": "a string"}))
            .await
            .unwrap();

        assert_eq!(stored_user_email(&session).await, None);
    }
}
