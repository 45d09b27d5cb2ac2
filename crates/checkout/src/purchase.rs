//! Purchase payload assembly.
//!
//! Turns validated form values and a cart snapshot into the request body of
//! the order service. Addresses cross the boundary with state and country
//! flattened to their display names.

use serde::{Deserialize, Serialize};
use shopfront_core::{Email, Money, ProductId};

use crate::cart::{CartItem, CartSnapshot};
use crate::error::CheckoutError;
use crate::form::{AddressForm, CheckoutForm, CustomerForm, FormErrors};
use crate::reference::AddressGroup;

/// Customer section of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
}

/// An address with state and country as plain names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
}

/// Order totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub total_price: Money,
    pub total_quantity: u32,
}

/// One ordered product, derived from a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub image_url: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub product_id: ProductId,
}

/// Request body of `POST checkout/purchase`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub customer: Customer,
    pub shipping_address: PurchaseAddress,
    pub billing_address: PurchaseAddress,
    pub order: Order,
    pub order_items: Vec<OrderItem>,
}

/// Response body of `POST checkout/purchase`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub order_tracking_number: String,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            image_url: item.image_url.clone(),
            unit_price: item.unit_price,
            quantity: item.quantity,
            product_id: item.id,
        }
    }
}

impl TryFrom<&CustomerForm> for Customer {
    type Error = CheckoutError;

    fn try_from(form: &CustomerForm) -> Result<Self, Self::Error> {
        let email = Email::parse(&form.email).map_err(|_| {
            let mut errors = FormErrors::default();
            errors.insert("customer.email", "pattern");
            CheckoutError::Validation(errors)
        })?;

        Ok(Self {
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            email,
        })
    }
}

impl PurchaseAddress {
    fn from_form(form: &AddressForm, group: AddressGroup) -> Result<Self, CheckoutError> {
        let missing = |field| CheckoutError::MissingAddressField { group, field };
        let state = form.state.as_ref().ok_or_else(|| missing("state"))?;
        let country = form.country.as_ref().ok_or_else(|| missing("country"))?;

        Ok(Self {
            street: form.street.clone(),
            city: form.city.clone(),
            state: state.name.clone(),
            country: country.name.clone(),
            zip_code: form.zip_code.clone(),
        })
    }
}

/// Build the purchase payload.
///
/// Totals are copied from the cart snapshot and order items map 1:1 onto cart
/// lines.
///
/// # Errors
///
/// Returns [`CheckoutError::MissingAddressField`] if either address lacks a
/// state or country, and [`CheckoutError::Validation`] if the email does not
/// parse.
pub fn assemble_purchase(
    form: &CheckoutForm,
    cart: &CartSnapshot,
) -> Result<Purchase, CheckoutError> {
    Ok(Purchase {
        customer: Customer::try_from(&form.customer)?,
        shipping_address: PurchaseAddress::from_form(
            &form.shipping_address,
            AddressGroup::Shipping,
        )?,
        billing_address: PurchaseAddress::from_form(&form.billing_address, AddressGroup::Billing)?,
        order: Order {
            total_price: cart.totals.total_price,
            total_quantity: cart.totals.total_quantity,
        },
        order_items: cart.items.iter().map(OrderItem::from).collect(),
    })
}
