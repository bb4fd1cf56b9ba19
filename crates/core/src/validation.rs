//! Field-level validation accumulator.
//!
//! Validation failures are reported as a map of field name to the first
//! message recorded for that field, so clients can render them next to the
//! offending input.

use std::collections::BTreeMap;

use serde::Serialize;

/// Ordered map of field name -> message. Only the first message per field
/// is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field` unless the field already has one.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Record `message` for `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Convert into `Err(self)` when any error was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|(field, msg)| format!("{field}: {msg}"))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            if let Some(first) = errs.first() {
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid value ({})", first.code));
                out.add(field.as_ref(), message);
            }
        }
        out
    }
}

/// Character count, not byte length, so multi-byte names are measured the
/// way users see them.
pub fn char_len(value: &str) -> usize {
    value.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_message_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("name", "first");
        errors.add("name", "second");
        assert_eq!(errors.get("name"), Some("first"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn check_only_records_failures() {
        let mut errors = FieldErrors::new();
        errors.check(true, "season", "bad season");
        assert!(errors.is_empty());
        errors.check(false, "season", "bad season");
        assert_eq!(errors.into_result().unwrap_err().get("season"), Some("bad season"));
    }

    #[test]
    fn display_joins_fields_in_order() {
        let mut errors = FieldErrors::new();
        errors.add("year", "too old");
        errors.add("name", "too short");
        assert_eq!(errors.to_string(), "name: too short; year: too old");
    }

    #[test]
    fn char_len_counts_unicode_scalars() {
        assert_eq!(char_len("مشروع"), 5);
        assert_eq!(char_len("abc"), 3);
    }
}
