//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. In this crate
/// family they wrap validated input (an item name, a username, an email), so
/// holding one means the validation rules already passed.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Username(String);
///
/// impl ValueObject for Username {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Validate a required free-text field: trimmed non-empty and at most
/// `max_chars` characters. Returns the value untrimmed.
///
/// `field` is the human-facing field name used in error messages.
pub fn required_text(
    field: &str,
    value: String,
    max_chars: usize,
) -> crate::DomainResult<String> {
    if value.trim().is_empty() {
        return Err(crate::DomainError::validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > max_chars {
        return Err(crate::DomainError::validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomainError;

    #[test]
    fn required_text_rejects_blank() {
        let err = required_text("Name", "   ".to_string(), 10).unwrap_err();
        assert_eq!(err, DomainError::validation("Name cannot be empty"));
    }

    #[test]
    fn required_text_counts_chars_not_bytes() {
        // 5 chars, 10 bytes
        assert!(required_text("Name", "ñññññ".to_string(), 5).is_ok());
        assert!(required_text("Name", "ññññññ".to_string(), 5).is_err());
    }

    #[test]
    fn required_text_keeps_surrounding_whitespace() {
        assert_eq!(required_text("Name", " a ".to_string(), 10).unwrap(), " a ");
    }
}
