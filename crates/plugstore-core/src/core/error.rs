// crates/plugstore-core/src/core/error.rs
// ============================================================================
// Module: Plugstore Error Taxonomy
// Description: Stable error codes and the shared service error type.
// Purpose: Classify every failure into one wire-visible code.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Every failure a plugin can observe maps to exactly one [`ErrorCode`].
//! Layers below the service (store, registry, request parsing) raise
//! [`ServiceError`] variants and the envelope builder turns them into
//! `{success:false, error:{code, message}}`. "Not found" is never an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Error Codes
// ============================================================================

/// Wire-visible error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Payload could not be decoded.
    InvalidJson,
    /// Required field absent, or schema not registered for the target table.
    MissingField,
    /// Type mismatch, reserved-field write, malformed filter or operator.
    ValidationError,
    /// Underlying store raised on an otherwise well-formed request.
    DatabaseError,
    /// Unhandled failure inside a handler.
    InternalError,
}

impl ErrorCode {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidJson => "INVALID_JSON",
            Self::MissingField => "MISSING_FIELD",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Service Error
// ============================================================================

/// Failures raised while handling a storage request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Payload could not be decoded as JSON.
    #[error("invalid json: {0}")]
    InvalidJson(String),
    /// A required request or row field is absent.
    #[error("missing field: {0}")]
    MissingField(String),
    /// The target table has no registered schema.
    #[error("schema not registered for table `{table}` of plugin `{plugin}`")]
    SchemaNotRegistered {
        /// Plugin identifier from the subject.
        plugin: String,
        /// Logical table name from the request.
        table: String,
    },
    /// The request is well-formed JSON but violates the schema or grammar.
    #[error("validation error: {0}")]
    Validation(String),
    /// The store rejected a well-formed request.
    #[error("database error: {0}")]
    Database(String),
    /// Unexpected failure inside the service.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the wire error code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidJson(_) => ErrorCode::InvalidJson,
            Self::MissingField(_) | Self::SchemaNotRegistered {
                ..
            } => ErrorCode::MissingField,
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Returns the human-readable message without the classification prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::InvalidJson(message)
            | Self::MissingField(message)
            | Self::Validation(message)
            | Self::Database(message)
            | Self::Internal(message) => message.clone(),
            Self::SchemaNotRegistered {
                ..
            } => self.to_string(),
        }
    }

    /// Builds a validation error from any displayable message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
