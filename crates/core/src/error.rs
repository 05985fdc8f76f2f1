//! Validation errors raised at the request boundary.
//!
//! A request that fails any of these checks never reaches a solver. These
//! errors are the caller's responsibility and are never recovered internally.

use thiserror::Error;

/// Errors produced while constructing or deserializing a request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    /// A numeric field is NaN or infinite.
    #[error("field '{field}' must be finite, got {value}")]
    NonFinite {
        /// Dotted path of the offending field.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// A field that must be strictly positive is zero or negative.
    #[error("field '{field}' must be greater than zero")]
    NonPositive {
        /// Dotted path of the offending field.
        field: String,
    },

    /// A field that must be non-negative is negative.
    #[error("field '{field}' must be non-negative, got {value}")]
    Negative {
        /// Dotted path of the offending field.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// A candidate has an empty id.
    #[error("candidate at position {position} has an empty id")]
    EmptyId {
        /// Index of the candidate in the request.
        position: usize,
    },

    /// Two candidates share the same id.
    #[error("duplicate candidate id: {id}")]
    DuplicateCandidate {
        /// The repeated id.
        id: String,
    },
}

impl ValidationError {
    /// Creates a non-finite error.
    pub fn non_finite(field: impl Into<String>, value: f64) -> Self {
        Self::NonFinite {
            field: field.into(),
            value,
        }
    }

    /// Creates a non-positive error.
    pub fn non_positive(field: impl Into<String>) -> Self {
        Self::NonPositive {
            field: field.into(),
        }
    }

    /// Creates a negative-value error.
    pub fn negative(field: impl Into<String>, value: f64) -> Self {
        Self::Negative {
            field: field.into(),
            value,
        }
    }

    /// Creates a duplicate-id error.
    pub fn duplicate(id: impl Into<String>) -> Self {
        Self::DuplicateCandidate { id: id.into() }
    }

    /// Name of the field that failed, when the error is tied to one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::NonFinite { field, .. }
            | Self::NonPositive { field }
            | Self::Negative { field, .. } => Some(field),
            Self::EmptyId { .. } | Self::DuplicateCandidate { .. } => None,
        }
    }
}

/// Result type alias for validation.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Rejects NaN and infinities.
pub(crate) fn ensure_finite(field: impl Into<String>, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::non_finite(field, value))
    }
}

/// Rejects an optional value that is present but not finite.
pub(crate) fn ensure_finite_opt(field: impl Into<String>, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) => ensure_finite(field, v),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_message_names_field() {
        let err = ValidationError::non_finite("candidates[0].vega", f64::NAN);
        let msg = err.to_string();
        assert!(msg.contains("candidates[0].vega"));
        assert!(msg.contains("finite"));
        assert_eq!(err.field(), Some("candidates[0].vega"));
    }

    #[test]
    fn duplicate_has_no_field() {
        let err = ValidationError::duplicate("c1");
        assert!(err.to_string().contains("c1"));
        assert_eq!(err.field(), None);
    }

    #[test]
    fn ensure_finite_accepts_and_rejects() {
        assert!(ensure_finite("x", 1.5).is_ok());
        assert!(ensure_finite("x", f64::INFINITY).is_err());
        assert!(ensure_finite_opt("x", None).is_ok());
        assert!(ensure_finite_opt("x", Some(f64::NEG_INFINITY)).is_err());
    }
}
