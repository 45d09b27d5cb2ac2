//! Flattened validation errors keyed by field path.

use std::collections::BTreeMap;
use std::fmt;

use validator::{ValidationErrors, ValidationErrorsKind};

/// Validation errors keyed by dotted field path (e.g. `customer.email`).
///
/// Each path maps to the error codes raised for it, such as `length`,
/// `whitespace`, `required`, `pattern`, or `expired`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    /// Returns true if there are no errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Error codes for a field; empty if the field is valid.
    #[must_use]
    pub fn get(&self, path: &str) -> &[String] {
        self.0.get(path).map_or(&[], Vec::as_slice)
    }

    /// Whether a field has the given error code.
    #[must_use]
    pub fn has(&self, path: &str, code: &str) -> bool {
        self.get(path).iter().any(|c| c == code)
    }

    /// Whether a field has any error.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    /// Paths of all invalid fields, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Record an error code for a field.
    pub fn insert(&mut self, path: impl Into<String>, code: impl Into<String>) {
        let codes = self.0.entry(path.into()).or_default();
        let code = code.into();
        if !codes.contains(&code) {
            codes.push(code);
        }
    }

    /// Keep only the fields `keep` accepts.
    #[must_use]
    pub fn filtered(mut self, keep: impl Fn(&str) -> bool) -> Self {
        self.0.retain(|path, _| keep(path));
        self
    }
}

impl From<&ValidationErrors> for FormErrors {
    fn from(errors: &ValidationErrors) -> Self {
        let mut out = Self::default();
        flatten("", errors, &mut out);
        out
    }
}

fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut FormErrors) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    out.insert(path.clone(), error.code.to_string());
                }
            }
            ValidationErrorsKind::Struct(nested) => flatten(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten(&format!("{path}[{index}]"), nested, out);
                }
            }
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self
            .0
            .iter()
            .map(|(path, codes)| format!("{path} ({})", codes.join(", ")))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{} invalid field(s): {fields}", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_deduplicates_codes() {
        let mut errors = FormErrors::default();
        errors.insert("customer.email", "pattern");
        errors.insert("customer.email", "pattern");
        errors.insert("customer.email", "required");

        assert_eq!(errors.get("customer.email"), ["pattern", "required"]);
        assert!(errors.has("customer.email", "required"));
        assert!(errors.get("customer.first_name").is_empty());
    }

    #[test]
    fn test_filtered() {
        let mut errors = FormErrors::default();
        errors.insert("customer.email", "pattern");
        errors.insert("credit_card.card_number", "required");

        let visible = errors.filtered(|path| path.starts_with("customer."));
        assert_eq!(visible.paths().collect::<Vec<_>>(), ["customer.email"]);
    }

    #[test]
    fn test_display() {
        let mut errors = FormErrors::default();
        errors.insert("customer.email", "pattern");
        assert_eq!(
            errors.to_string(),
            "1 invalid field(s): customer.email (pattern)"
        );
    }
}
