//! Parse error types
//!
//! Errors that can occur when turning a raw device line into an `Event`.
//! Both variants are local to a single line: the caller discards the line
//! and keeps reading.

use thiserror::Error;

/// Errors that can occur while parsing a device line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Line has fewer than the mandatory columns
    #[error("truncated line: expected at least {expected} fields, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// A numeric column did not convert
    #[error("invalid number in field '{field}': {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

/// Coarse classification of a parse failure, for counters and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    Truncated,
    InvalidNumber,
}

impl ParseError {
    /// Create a truncated line error
    #[inline]
    pub fn truncated(actual: usize) -> Self {
        Self::Truncated {
            expected: crate::MIN_FIELDS,
            actual,
        }
    }

    /// Create an invalid number error
    #[inline]
    pub fn invalid_number(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidNumber {
            field,
            value: value.into(),
        }
    }

    /// Get the error kind
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            Self::Truncated { .. } => ParseErrorKind::Truncated,
            Self::InvalidNumber { .. } => ParseErrorKind::InvalidNumber,
        }
    }

    /// Name of the offending field, if the error is tied to one
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Truncated { .. } => None,
            Self::InvalidNumber { field, .. } => Some(*field),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_display() {
        let err = ParseError::truncated(3);
        assert!(err.to_string().contains("at least 6"));
        assert!(err.to_string().contains("got 3"));
        assert_eq!(err.kind(), ParseErrorKind::Truncated);
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_invalid_number_display() {
        let err = ParseError::invalid_number("adc_value", "abc");
        assert!(err.to_string().contains("adc_value"));
        assert!(err.to_string().contains("abc"));
        assert_eq!(err.kind(), ParseErrorKind::InvalidNumber);
        assert_eq!(err.field(), Some("adc_value"));
    }
}
