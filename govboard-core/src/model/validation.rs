//! Rejections for user-supplied project and role input

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Malformed URL, stake address, asset unit or repo name
    #[error("{field}: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    #[error("invalid {field} value: '{value}'")]
    InvalidVariant { field: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "name",
            max: 120,
        };
        assert_eq!(err.to_string(), "name exceeds maximum length of 120 characters");
    }
}
