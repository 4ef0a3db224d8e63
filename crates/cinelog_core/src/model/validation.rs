//! Input validation shared by relational create inputs and patches.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text is empty after trim.
    Blank { field: &'static str },
    /// Text exceeds the column limit, counted in chars.
    TooLong {
        field: &'static str,
        max_chars: usize,
        actual_chars: usize,
    },
    /// Value does not match the accepted format.
    InvalidFormat { field: &'static str, value: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "`{field}` must not be blank"),
            Self::TooLong {
                field,
                max_chars,
                actual_chars,
            } => write!(
                f,
                "`{field}` cannot exceed {max_chars} characters, got {actual_chars}"
            ),
            Self::InvalidFormat { field, value } => {
                write!(f, "`{field}` has invalid format: `{value}`")
            }
        }
    }
}

impl Error for ValidationError {}

/// Checks a required text field: non-blank and within `max_chars`.
pub fn require_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank { field });
    }
    check_length(field, value, max_chars)
}

/// Checks an optional text field; `None` always passes.
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max_chars: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => check_length(field, value, max_chars),
        None => Ok(()),
    }
}

fn check_length(field: &'static str, value: &str, max_chars: usize) -> Result<(), ValidationError> {
    let actual_chars = value.chars().count();
    if actual_chars > max_chars {
        return Err(ValidationError::TooLong {
            field,
            max_chars,
            actual_chars,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{optional_text, require_text, ValidationError};

    #[test]
    fn require_text_rejects_whitespace_only() {
        assert_eq!(
            require_text("name", "   ", 10),
            Err(ValidationError::Blank { field: "name" })
        );
    }

    #[test]
    fn length_is_counted_in_chars_not_bytes() {
        assert!(require_text("name", "ñandú", 5).is_ok());
        let err = optional_text("name", Some("película!"), 8).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "name",
                max_chars: 8,
                actual_chars: 9
            }
        );
    }
}
