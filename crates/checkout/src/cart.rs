//! Shopping cart state.
//!
//! [`CartState`] is the single owner of the cart's line items and totals.
//! Mutations go through its methods, which recompute the totals, publish them
//! to observers, and persist the items to the bound session (if any).
//! Observers hold a `watch::Receiver` and never mutate.
//!
//! Each mutation runs under the watch channel's write lock, so concurrent
//! callers never lose each other's lines. Session writes are serialized and
//! always store the latest published items.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shopfront_core::{Money, ProductId};
use tokio::sync::{Mutex, watch};
use tower_sessions::Session;
use tracing::instrument;

use crate::session::keys;

/// A product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub image_url: String,
    pub unit_price: Money,
    pub quantity: u32,
}

/// Derived cart totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    pub total_price: Money,
    pub total_quantity: u32,
}

/// Line items plus the totals derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartSnapshot {
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
}

impl CartSnapshot {
    fn from_items(items: Vec<CartItem>) -> Self {
        let totals = compute_totals(&items);
        Self { items, totals }
    }
}

/// Sum line prices and quantities.
///
/// The quantity saturates at `u32::MAX` instead of overflowing.
#[must_use]
pub fn compute_totals(items: &[CartItem]) -> CartTotals {
    CartTotals {
        total_price: items
            .iter()
            .map(|item| item.unit_price.times(item.quantity))
            .sum(),
        total_quantity: items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.quantity)),
    }
}

/// Shared handle to the cart.
///
/// Cheaply cloneable via `Arc`; every clone refers to the same cart.
#[derive(Clone)]
pub struct CartState {
    inner: Arc<CartStateInner>,
}

struct CartStateInner {
    snapshot: watch::Sender<CartSnapshot>,
    session: Option<Session>,
    persist_lock: Mutex<()>,
}

impl std::fmt::Debug for CartState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartState")
            .field("snapshot", &*self.inner.snapshot.borrow())
            .field("persisted", &self.inner.session.is_some())
            .finish()
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

impl CartState {
    /// Create an empty cart that is not persisted anywhere.
    #[must_use]
    pub fn new() -> Self {
        Self::build(Vec::new(), None)
    }

    /// Restore the cart from `session` and keep persisting to it.
    ///
    /// Missing or unreadable stored items start an empty cart.
    pub async fn restore(session: Session) -> Self {
        let items = match session.get::<Vec<CartItem>>(keys::CART_ITEMS).await {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable stored cart");
                Vec::new()
            }
        };
        Self::build(items, Some(session))
    }

    fn build(items: Vec<CartItem>, session: Option<Session>) -> Self {
        let (snapshot, _) = watch::channel(CartSnapshot::from_items(items));
        Self {
            inner: Arc::new(CartStateInner {
                snapshot,
                session,
                persist_lock: Mutex::new(()),
            }),
        }
    }

    /// Current items and totals.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Current totals.
    #[must_use]
    pub fn totals(&self) -> CartTotals {
        self.inner.snapshot.borrow().totals
    }

    /// Observe the cart; the receiver sees every published change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Add an item, merging quantities with an existing line for the same product.
    ///
    /// A merged quantity saturates at `u32::MAX`.
    ///
    /// # Errors
    ///
    /// Returns an error if the items cannot be persisted to the session.
    #[instrument(skip(self, item), fields(product_id = %item.id, quantity = item.quantity))]
    pub async fn add_to_cart(
        &self,
        item: CartItem,
    ) -> Result<CartTotals, tower_sessions::session::Error> {
        self.update(|items| {
            if let Some(existing) = items.iter_mut().find(|line| line.id == item.id) {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            } else {
                items.push(item);
            }
        })
        .await
    }

    /// Decrease a line's quantity by one, removing the line when it reaches zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the items cannot be persisted to the session.
    #[instrument(skip(self))]
    pub async fn decrement_quantity(
        &self,
        product_id: ProductId,
    ) -> Result<CartTotals, tower_sessions::session::Error> {
        self.update(|items| {
            if let Some(line) = items.iter_mut().find(|line| line.id == product_id) {
                line.quantity = line.quantity.saturating_sub(1);
            }
            items.retain(|line| line.quantity > 0);
        })
        .await
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns an error if the items cannot be persisted to the session.
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        product_id: ProductId,
    ) -> Result<CartTotals, tower_sessions::session::Error> {
        self.update(|items| items.retain(|line| line.id != product_id))
            .await
    }

    /// Empty the cart, publish zero totals, and delete the persisted items.
    ///
    /// The in-memory cart is cleared even if the session removal fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted items cannot be removed.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), tower_sessions::session::Error> {
        self.inner.snapshot.send_replace(CartSnapshot::default());
        tracing::debug!("Cart cleared");

        self.persist().await
    }

    /// Apply a mutation under the channel lock, recompute, publish, and persist.
    async fn update(
        &self,
        mutate: impl FnOnce(&mut Vec<CartItem>),
    ) -> Result<CartTotals, tower_sessions::session::Error> {
        let mut totals = CartTotals::default();
        self.inner.snapshot.send_modify(|snapshot| {
            mutate(&mut snapshot.items);
            snapshot.totals = compute_totals(&snapshot.items);
            totals = snapshot.totals;
        });
        tracing::debug!(
            total_price = %totals.total_price,
            total_quantity = totals.total_quantity,
            "Cart totals updated"
        );

        self.persist().await?;
        Ok(totals)
    }

    /// Write the latest published items to the session, or remove them when
    /// the cart is empty.
    async fn persist(&self) -> Result<(), tower_sessions::session::Error> {
        let Some(session) = &self.inner.session else {
            return Ok(());
        };

        let _guard = self.inner.persist_lock.lock().await;
        let items = self.inner.snapshot.borrow().items.clone();
        if items.is_empty() {
            session.remove_value(keys::CART_ITEMS).await?;
        } else {
            session.insert(keys::CART_ITEMS, items).await?;
        }
        Ok(())
    }
}
