//! The checkout form model.
//!
//! Field rules are declared with `validator` derives. Rules that need the
//! current date (card expiration) are checked in [`CheckoutForm::validate_at`].
//! [`FormModel`] adds touched tracking so a UI only shows errors for fields the
//! user has visited, or for every field after a failed submit.

mod errors;

pub use errors::FormErrors;

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::reference::{Country, State};

static CARD_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{16}$").expect("Invalid regex"));

static SECURITY_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{3}$").expect("Invalid regex"));

/// Every field path of the form, in display order.
pub const FIELD_PATHS: &[&str] = &[
    "customer.first_name",
    "customer.last_name",
    "customer.email",
    "shipping_address.street",
    "shipping_address.city",
    "shipping_address.state",
    "shipping_address.country",
    "shipping_address.zip_code",
    "billing_address.street",
    "billing_address.city",
    "billing_address.state",
    "billing_address.country",
    "billing_address.zip_code",
    "credit_card.card_type",
    "credit_card.name_on_card",
    "credit_card.card_number",
    "credit_card.security_code",
    "credit_card.expiration_month",
    "credit_card.expiration_year",
];

// =============================================================================
// Field Groups
// =============================================================================

/// The whole checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct CheckoutForm {
    #[validate(nested)]
    pub customer: CustomerForm,
    #[validate(nested)]
    pub shipping_address: AddressForm,
    #[validate(nested)]
    pub billing_address: AddressForm,
    #[validate(nested)]
    pub credit_card: CreditCardForm,
}

/// Customer details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct CustomerForm {
    #[validate(length(min = 2), custom(function = "not_only_whitespace"))]
    pub first_name: String,
    #[validate(length(min = 2), custom(function = "not_only_whitespace"))]
    pub last_name: String,
    #[validate(custom(function = "checkout_email"))]
    pub email: String,
}

/// A shipping or billing address.
///
/// State and country hold the selected reference entries, not just names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct AddressForm {
    #[validate(length(min = 4), custom(function = "not_only_whitespace"))]
    pub street: String,
    #[validate(length(min = 3), custom(function = "not_only_whitespace"))]
    pub city: String,
    #[validate(required)]
    pub state: Option<State>,
    #[validate(required)]
    pub country: Option<Country>,
    #[validate(length(min = 5), custom(function = "not_only_whitespace"))]
    pub zip_code: String,
}

/// Accepted card brands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Visa,
    Mastercard,
    #[serde(rename = "American Express")]
    AmericanExpress,
    Discover,
}

impl CardType {
    /// All card types, in dropdown order.
    pub const ALL: [Self; 4] = [
        Self::Visa,
        Self::Mastercard,
        Self::AmericanExpress,
        Self::Discover,
    ];

    /// Display name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Visa => "Visa",
            Self::Mastercard => "Mastercard",
            Self::AmericanExpress => "American Express",
            Self::Discover => "Discover",
        }
    }
}

/// Payment details. Never sent to the order service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct CreditCardForm {
    #[validate(required)]
    pub card_type: Option<CardType>,
    #[validate(length(min = 2), custom(function = "not_only_whitespace"))]
    pub name_on_card: String,
    #[validate(custom(function = "card_number"))]
    pub card_number: String,
    #[validate(custom(function = "security_code"))]
    pub security_code: String,
    #[validate(required)]
    pub expiration_month: Option<u32>,
    #[validate(required)]
    pub expiration_year: Option<i32>,
}

impl CheckoutForm {
    /// Validate every field, including the card expiration against `today`.
    ///
    /// # Errors
    ///
    /// Returns every invalid field with its error codes.
    pub fn validate_at(&self, today: NaiveDate) -> Result<(), FormErrors> {
        let mut errors = self
            .validate()
            .err()
            .map(|e| FormErrors::from(&e))
            .unwrap_or_default();

        if let Some(code) = self.credit_card.expiration_error(today) {
            errors.insert("credit_card.expiration_month", code);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl CreditCardForm {
    /// Check the month/year combination; `None` if valid or incomplete.
    fn expiration_error(&self, today: NaiveDate) -> Option<&'static str> {
        let (Some(month), Some(year)) = (self.expiration_month, self.expiration_year) else {
            return None;
        };
        if !(1..=12).contains(&month) {
            return Some("range");
        }
        if (year, month) < (today.year(), today.month()) {
            return Some("expired");
        }
        None
    }
}

// =============================================================================
// Custom Validators
// =============================================================================

/// Reject values that are empty after trimming.
fn not_only_whitespace(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("whitespace"));
    }
    Ok(())
}

fn checkout_email(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required"));
    }
    shopfront_core::Email::parse(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("pattern"))
}

fn card_number(value: &str) -> Result<(), ValidationError> {
    required_pattern(value, &CARD_NUMBER_RE)
}

fn security_code(value: &str) -> Result<(), ValidationError> {
    required_pattern(value, &SECURITY_CODE_RE)
}

fn required_pattern(value: &str, pattern: &Regex) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required"));
    }
    if !pattern.is_match(value) {
        return Err(ValidationError::new("pattern"));
    }
    Ok(())
}

// =============================================================================
// FormModel
// =============================================================================

/// Form values plus touched tracking.
#[derive(Debug, Clone, Default)]
pub struct FormModel {
    value: CheckoutForm,
    touched: BTreeSet<&'static str>,
}

impl FormModel {
    /// Create an empty, untouched form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current values.
    #[must_use]
    pub const fn value(&self) -> &CheckoutForm {
        &self.value
    }

    /// Mutable access for user edits.
    pub const fn value_mut(&mut self) -> &mut CheckoutForm {
        &mut self.value
    }

    /// Mark one field as touched. Unknown paths are ignored.
    pub fn mark_touched(&mut self, path: &str) {
        if let Some(known) = FIELD_PATHS.iter().find(|p| **p == path) {
            self.touched.insert(*known);
        }
    }

    /// Mark every field as touched so all pending errors become visible.
    pub fn mark_all_as_touched(&mut self) {
        self.touched.extend(FIELD_PATHS.iter().copied());
    }

    /// Whether a field has been touched.
    #[must_use]
    pub fn is_touched(&self, path: &str) -> bool {
        self.touched.contains(path)
    }

    /// Whether no field has been touched yet.
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.touched.is_empty()
    }

    /// Copy the shipping address into billing (`true`) or clear billing (`false`).
    pub fn set_billing_same_as_shipping(&mut self, enabled: bool) {
        self.value.billing_address = if enabled {
            self.value.shipping_address.clone()
        } else {
            AddressForm::default()
        };
    }

    /// Reset all values and touched state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Keep only the errors of touched fields.
    #[must_use]
    pub fn visible(&self, errors: FormErrors) -> FormErrors {
        errors.filtered(|path| self.is_touched(path))
    }
}
