//! Cache types for reference data responses.

use crate::reference::{Country, State};

/// Cache key for reference data lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Countries,
    States { country_code: String },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Countries(Vec<Country>),
    States(Vec<State>),
}
