// crates/plugstore-service/src/subject.rs
// ============================================================================
// Module: Request Subjects
// Description: Parsing of `{namespace}.{plugin}.{operation}` subjects.
// Purpose: Derive the calling plugin and the requested operation.
// Dependencies: plugstore-core
// ============================================================================

//! ## Overview
//! The plugin identity is taken from the subject, never from the payload, so
//! a plugin can only ever address its own tables. The operation suffix may
//! contain dots (`schema.register`), so only the first two separators are
//! significant.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use plugstore_core::PluginId;
use plugstore_core::ServiceError;

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Storage operation selected by the subject suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Register a table schema.
    SchemaRegister,
    /// Read back one registered schema.
    SchemaGet,
    /// List the plugin's registered tables.
    SchemaList,
    /// Insert a row.
    Insert,
    /// Fetch a row by id.
    Select,
    /// Update a row with plain values or atomic operators.
    Update,
    /// Delete a row by id.
    Delete,
    /// Filtered, sorted, limited search.
    Search,
}

impl Operation {
    /// Every supported operation.
    pub const ALL: [Self; 8] = [
        Self::SchemaRegister,
        Self::SchemaGet,
        Self::SchemaList,
        Self::Insert,
        Self::Select,
        Self::Update,
        Self::Delete,
        Self::Search,
    ];

    /// Parses an operation suffix.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|operation| operation.as_str() == value)
    }

    /// Returns the subject suffix for this operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SchemaRegister => "schema.register",
            Self::SchemaGet => "schema.get",
            Self::SchemaList => "schema.list",
            Self::Insert => "insert",
            Self::Select => "select",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Search => "search",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Subjects
// ============================================================================

/// Parsed request subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    /// Calling plugin.
    pub plugin: PluginId,
    /// Requested operation.
    pub operation: Operation,
}

impl Subject {
    /// Parses `{namespace}.{plugin}.{operation}`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] when the subject is outside the
    /// namespace, the plugin id is malformed, or the operation is unknown.
    pub fn parse(namespace: &str, raw: &str) -> Result<Self, ServiceError> {
        let rest = raw
            .strip_prefix(namespace)
            .and_then(|rest| rest.strip_prefix('.'))
            .ok_or_else(|| {
                ServiceError::validation(format!(
                    "subject `{raw}` is outside the `{namespace}` namespace"
                ))
            })?;
        let (plugin, operation) = rest.split_once('.').ok_or_else(|| {
            ServiceError::validation(format!(
                "subject `{raw}` must have the form {namespace}.<plugin>.<operation>"
            ))
        })?;
        let plugin = PluginId::parse(plugin)?;
        let operation = Operation::parse(operation).ok_or_else(|| {
            ServiceError::validation(format!("unknown operation `{operation}`"))
        })?;
        Ok(Self {
            plugin,
            operation,
        })
    }

    /// Formats the subject for a plugin and operation.
    #[must_use]
    pub fn format(namespace: &str, plugin: &PluginId, operation: Operation) -> String {
        format!("{namespace}.{plugin}.{operation}")
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    //! Subject parsing checks.
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn dotted_operation_suffix_parses() {
        let subject = Subject::parse("db", "db.chat-plugin.schema.register").unwrap();
        assert_eq!(subject.plugin.as_str(), "chat-plugin");
        assert_eq!(subject.operation, Operation::SchemaRegister);
    }

    #[test]
    fn every_operation_round_trips_through_format() {
        let plugin = PluginId::parse("quotes").unwrap();
        for operation in Operation::ALL {
            let raw = Subject::format("db", &plugin, operation);
            assert_eq!(Subject::parse("db", &raw).unwrap().operation, operation);
        }
    }

    #[test]
    fn malformed_subjects_are_validation_errors() {
        for raw in ["db", "db.", "db.quotes", "other.quotes.insert", "dbx.quotes.insert"] {
            let err = Subject::parse("db", raw).unwrap_err();
            assert_eq!(err.code().as_str(), "VALIDATION_ERROR", "{raw}");
        }
    }

    #[test]
    fn unknown_operation_is_named_in_the_error() {
        let err = Subject::parse("db", "db.quotes.truncate").unwrap_err();
        assert!(err.message().contains("truncate"));
    }
}
