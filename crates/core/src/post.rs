//! Post validation.

use crate::validation::{char_len, FieldErrors};

pub const POST_MIN_CHARS: usize = 20;
pub const POST_MAX_CHARS: usize = 4000;

/// A post needs a description or a file. A description, when present,
/// must be within bounds even if a file is attached too.
pub fn validate_post(description: Option<&str>, has_file: bool) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    let description = description.map(str::trim).filter(|d| !d.is_empty());

    match description {
        None if !has_file => {
            errors.add("description", "A post needs a description or a file");
            errors.add("file", "A post needs a description or a file");
        }
        None => {}
        Some(text) => {
            let len = char_len(text);
            errors.check(
                len >= POST_MIN_CHARS,
                "description",
                format!("Post description must be at least {POST_MIN_CHARS} characters"),
            );
            errors.check(
                len <= POST_MAX_CHARS,
                "description",
                format!("Post description must be at most {POST_MAX_CHARS} characters"),
            );
        }
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_only_post_is_valid() {
        assert!(validate_post(None, true).is_ok());
        assert!(validate_post(Some("   "), true).is_ok());
    }

    #[test]
    fn empty_post_flags_both_fields() {
        let errors = validate_post(None, false).unwrap_err();
        assert!(errors.get("description").is_some());
        assert!(errors.get("file").is_some());
    }

    #[test]
    fn short_description_rejected_even_with_file() {
        assert!(validate_post(Some("hi"), true).is_err());
        assert!(validate_post(Some("a description of twenty+"), false).is_ok());
    }
}
