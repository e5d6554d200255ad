//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic failures raised before anything touches storage: malformed
/// field values, unparseable ids and lookups of records that do not exist.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field value failed validation (e.g. negative quantity, unknown action).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The referenced record does not exist.
    #[error("not found")]
    NotFound,
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Validation failure scoped to a named field (`"quantity: must be >= 0"`).
    pub fn field(field: &str, msg: impl core::fmt::Display) -> Self {
        Self::Validation(format!("{field}: {msg}"))
    }
}
