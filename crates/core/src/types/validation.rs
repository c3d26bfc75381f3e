//! Form validation results.

use serde::Serialize;

/// One failed form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Wire name of the field, e.g. `postalCode`.
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Render a list of field errors as one line.
#[must_use]
pub fn describe(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_joins_fields() {
        let errors = [
            FieldError::new("name", "is required"),
            FieldError::new("price", "must be greater than zero"),
        ];
        assert_eq!(
            describe(&errors),
            "name: is required; price: must be greater than zero"
        );
    }
}
