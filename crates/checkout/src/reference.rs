//! Reference data for the checkout dropdowns.
//!
//! Countries, per-country states, and the valid card expiration months and
//! years. The [`ReferenceData`] trait is the seam between the controller and
//! whatever supplies the lists; [`crate::shop::ShopFormClient`] is the HTTP
//! implementation.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use shopfront_core::{CountryId, StateId};

use crate::shop::ApiError;

/// Number of years after the current one offered for card expiration.
pub const EXPIRATION_YEAR_SPAN: i32 = 10;

/// A country that can be shipped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    /// ISO code, the key states are looked up by.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// A state (or province) of one country.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub id: StateId,
    /// Display name.
    pub name: String,
}

/// Source of the dropdown option lists.
pub trait ReferenceData {
    /// All countries.
    async fn countries(&self) -> Result<Vec<Country>, ApiError>;

    /// States of the country with the given code.
    async fn states(&self, country_code: &str) -> Result<Vec<State>, ApiError>;

    /// Expiration months from `start_month` through December.
    async fn credit_card_months(&self, start_month: u32) -> Result<Vec<u32>, ApiError>;

    /// Expiration years from the current year onward.
    async fn credit_card_years(&self) -> Result<Vec<i32>, ApiError>;
}

/// Months `start_month..=12`; `start_month` is clamped to `1..=12`.
#[must_use]
pub fn credit_card_months(start_month: u32) -> Vec<u32> {
    (start_month.clamp(1, 12)..=12).collect()
}

/// Years `current_year..=current_year + EXPIRATION_YEAR_SPAN`.
#[must_use]
pub fn credit_card_years(current_year: i32) -> Vec<i32> {
    (current_year..=current_year + EXPIRATION_YEAR_SPAN).collect()
}

/// First expiration month to offer.
///
/// Cards expiring this year (or with no year chosen yet) start at the current
/// month; any later year starts at January.
#[must_use]
pub fn expiration_start_month(today: NaiveDate, selected_year: Option<i32>) -> u32 {
    match selected_year {
        Some(year) if year != today.year() => 1,
        _ => today.month(),
    }
}

// =============================================================================
// Address Groups & Stale-Response Guard
// =============================================================================

/// The two address sections of the checkout form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressGroup {
    Shipping,
    Billing,
}

impl AddressGroup {
    /// Field path prefix of this group in the form.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Shipping => "shipping_address",
            Self::Billing => "billing_address",
        }
    }
}

/// A pending states lookup, issued when a country is selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatesRequest {
    pub group: AddressGroup,
    pub country_code: String,
    generation: u64,
}

/// A completed states lookup, ready to be applied to the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatesResponse {
    pub request: StatesRequest,
    pub states: Vec<State>,
}

/// Tracks the latest country selection per address group so that responses
/// to superseded selections can be discarded.
#[derive(Debug, Default)]
pub struct StatesGuard {
    shipping: u64,
    billing: u64,
}

impl StatesGuard {
    /// Start a new lookup for `group`, superseding any in flight.
    pub fn begin(&mut self, group: AddressGroup, country_code: &str) -> StatesRequest {
        let counter = self.counter_mut(group);
        *counter += 1;
        StatesRequest {
            group,
            country_code: country_code.to_string(),
            generation: *counter,
        }
    }

    /// Whether `request` is still the latest lookup for its group.
    #[must_use]
    pub const fn is_current(&self, request: &StatesRequest) -> bool {
        let current = match request.group {
            AddressGroup::Shipping => self.shipping,
            AddressGroup::Billing => self.billing,
        };
        current == request.generation
    }

    /// Invalidate every lookup in flight for `group`.
    pub fn invalidate(&mut self, group: AddressGroup) {
        *self.counter_mut(group) += 1;
    }

    const fn counter_mut(&mut self, group: AddressGroup) -> &mut u64 {
        match group {
            AddressGroup::Shipping => &mut self.shipping,
            AddressGroup::Billing => &mut self.billing,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_credit_card_months() {
        assert_eq!(credit_card_months(10), vec![10, 11, 12]);
        assert_eq!(credit_card_months(1).len(), 12);
        assert_eq!(credit_card_months(0).first(), Some(&1));
        assert_eq!(credit_card_months(13), vec![12]);
    }

    #[test]
    fn test_credit_card_years() {
        let years = credit_card_years(2026);
        assert_eq!(years.len(), 11);
        assert_eq!(years.first(), Some(&2026));
        assert_eq!(years.last(), Some(&2036));
    }

    #[test]
    fn test_expiration_start_month_current_year() {
        let today = date(2026, 10, 19);
        assert_eq!(expiration_start_month(today, None), 10);
        assert_eq!(expiration_start_month(today, Some(2026)), 10);
    }

    #[test]
    fn test_expiration_start_month_future_year() {
        let today = date(2026, 10, 19);
        assert_eq!(expiration_start_month(today, Some(2027)), 1);
    }

    #[test]
    fn test_states_guard_discards_superseded() {
        let mut guard = StatesGuard::default();
        let first = guard.begin(AddressGroup::Shipping, "US");
        let second = guard.begin(AddressGroup::Shipping, "CA");

        assert!(!guard.is_current(&first));
        assert!(guard.is_current(&second));
    }

    #[test]
    fn test_states_guard_groups_are_independent() {
        let mut guard = StatesGuard::default();
        let shipping = guard.begin(AddressGroup::Shipping, "US");
        let billing = guard.begin(AddressGroup::Billing, "DE");

        assert!(guard.is_current(&shipping));
        assert!(guard.is_current(&billing));

        guard.invalidate(AddressGroup::Billing);
        assert!(guard.is_current(&shipping));
        assert!(!guard.is_current(&billing));
    }

    #[test]
    fn test_country_wire_format() {
        let json = r#"{"id":1,"code":"US","name":"United States"}"#;
        let country: Country = serde_json::from_str(json).unwrap();
        assert_eq!(country.code, "US");
        assert_eq!(country.id, CountryId::new(1));
    }
}
