//! Error types for factgraph.
//!
//! All errors are strongly typed using thiserror. Almost nothing in the
//! core is expected to fail under normal use: unknown ids resolve to empty
//! entities and retracting a missing fact is a no-op. What remains is
//! boundary validation, duplicate record ids, and poisoned locks.

use thiserror::Error;

use crate::fact::RecordId;

/// Validation errors raised while checking untrusted input.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Attribute key cannot be empty")]
    EmptyKey,

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("Invalid coordinate: lng={lng} lat={lat}")]
    InvalidCoordinate {
        lng: f64,
        lat: f64,
    },
}

/// Errors raised by the fact log itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LogError {
    /// A fact with this record id was already appended (and possibly retracted).
    #[error("Duplicate record id: {record_id}")]
    DuplicateRecordId {
        record_id: RecordId,
    },
}

/// Top-level error type for factgraph.
#[derive(Debug, Error)]
pub enum FactGraphError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Log error: {0}")]
    Log(#[from] LogError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl FactGraphError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a fact log error.
    #[must_use]
    pub const fn is_log(&self) -> bool {
        matches!(self, Self::Log(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for factgraph operations.
pub type FactGraphResult<T> = Result<T, FactGraphError>;

pub(crate) fn lock_err(context: &'static str) -> FactGraphError {
    FactGraphError::internal(format!("poisoned lock: {context}"))
}
