//! Schema error types
//!
//! Schema errors are raised while validating a `SchemaDescription`. They are
//! all FATAL: a datastore is never built from an invalid schema.

use std::fmt;

use thiserror::Error;

use crate::error::{ErrorCode, Severity};

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Invalid schema description
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("store '{store}' is declared more than once")]
    DuplicateStore { store: String },

    #[error("field '{field}' is declared more than once in store '{store}'")]
    DuplicateField { store: String, field: String },

    #[error("reference '{reference}' is declared more than once")]
    DuplicateReference { reference: String },

    #[error("store '{store}' declares no key field")]
    MissingKey { store: String },

    #[error("key field '{field}' of store '{store}' cannot be nullable")]
    NullableKey { store: String, field: String },

    #[error("reference '{reference}' names unknown store '{store}'")]
    UnknownStore { reference: String, store: String },

    #[error("unknown field '{field}' in store '{store}' (reference '{reference}')")]
    UnknownField {
        reference: String,
        store: String,
        field: String,
    },

    #[error("reference '{reference}' does not map the key of '{store}': {detail}")]
    KeyMismatch {
        reference: String,
        store: String,
        detail: String,
    },

    #[error(
        "reference '{reference}' maps '{from_field}' ({from_type}) to '{to_field}' ({to_type})"
    )]
    TypeMismatch {
        reference: String,
        from_field: String,
        from_type: String,
        to_field: String,
        to_type: String,
    },

    #[error("reference '{reference}' maps store '{store}' onto its own key")]
    SelfReference { reference: String, store: String },
}

impl ErrorCode for SchemaError {
    fn code(&self) -> &'static str {
        match self {
            SchemaError::DuplicateStore { .. } => "NANO_SCHEMA_DUPLICATE_STORE",
            SchemaError::DuplicateField { .. } => "NANO_SCHEMA_DUPLICATE_FIELD",
            SchemaError::DuplicateReference { .. } => "NANO_SCHEMA_DUPLICATE_REFERENCE",
            SchemaError::MissingKey { .. } => "NANO_SCHEMA_MISSING_KEY",
            SchemaError::NullableKey { .. } => "NANO_SCHEMA_NULLABLE_KEY",
            SchemaError::UnknownStore { .. } => "NANO_SCHEMA_UNKNOWN_STORE",
            SchemaError::UnknownField { .. } => "NANO_SCHEMA_UNKNOWN_FIELD",
            SchemaError::KeyMismatch { .. } => "NANO_SCHEMA_KEY_MISMATCH",
            SchemaError::TypeMismatch { .. } => "NANO_SCHEMA_TYPE_MISMATCH",
            SchemaError::SelfReference { .. } => "NANO_SCHEMA_SELF_REFERENCE",
        }
    }

    fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

/// Why a row does not fit its store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowViolation {
    /// Field name, or `$row` for arity problems
    pub field: String,
    pub expected: String,
    pub actual: String,
}

impl RowViolation {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn arity(expected: usize, actual: usize) -> Self {
        Self::new(
            "$row",
            format!("{} values", expected),
            format!("{} values", actual),
        )
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self::new(field, "non-null value", "null")
    }

    /// NaN and infinities have no JSON form, so images could not hold them
    pub fn non_finite(field: impl Into<String>, value: f64) -> Self {
        Self::new(field, "finite double", value.to_string())
    }
}

impl fmt::Display for RowViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "field '{}': expected {}, got {}",
            self.field, self.expected, self.actual
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            SchemaError::DuplicateStore { store: "a".into() },
            SchemaError::MissingKey { store: "a".into() },
            SchemaError::KeyMismatch {
                reference: "r".into(),
                store: "a".into(),
                detail: "d".into(),
            },
        ];
        let codes: std::collections::HashSet<_> = errors.iter().map(|e| e.code()).collect();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_schema_errors_are_fatal() {
        let err = SchemaError::DuplicateStore { store: "Orders".into() };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("Orders"));
    }

    #[test]
    fn test_row_violation_display() {
        let v = RowViolation::new("sales", "double", "string");
        let display = v.to_string();
        assert!(display.contains("sales"));
        assert!(display.contains("double"));
        assert!(display.contains("string"));
    }
}
