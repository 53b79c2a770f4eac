// crates/plugstore-core/src/core/identifiers.rs
// ============================================================================
// Module: Plugstore Identifiers
// Description: Plugin, table, and row identifiers.
// Purpose: Guarantee collision-free physical table names per plugin.
// Dependencies: crate::core::error, serde
// ============================================================================

//! ## Overview
//! Plugin and table identifiers are validated on construction so the
//! physical table name `{plugin}__{table}` can always be split back into
//! exactly one `(plugin, table)` pair. Segments allow lowercase ASCII
//! letters, digits, `-`, and single `_` separators; `__`, leading or trailing
//! `_`, and `.` are rejected. `SQLite` folds identifier case, so uppercase
//! letters are refused rather than letting `Bob` and `bob` share tables.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::error::ServiceError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a plugin identifier or table name.
pub const MAX_SEGMENT_LENGTH: usize = 64;
/// Separator between plugin and table in physical table names.
pub const PHYSICAL_SEPARATOR: &str = "__";

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Plugin identifier taken from the request subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PluginId(String);

impl PluginId {
    /// Parses and validates a plugin identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] when the identifier is malformed.
    pub fn parse(value: impl Into<String>) -> Result<Self, ServiceError> {
        let value = value.into();
        validate_segment("plugin id", &value)?;
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for PluginId {
    type Error = ServiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<PluginId> for String {
    fn from(value: PluginId) -> Self {
        value.0
    }
}

/// Logical table name scoped to a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Parses and validates a table name.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] when the name is malformed.
    pub fn parse(value: impl Into<String>) -> Result<Self, ServiceError> {
        let value = value.into();
        validate_segment("table name", &value)?;
        Ok(Self(value))
    }

    /// Returns the table name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for TableName {
    type Error = ServiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.0
    }
}

/// Row identifier assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(i64);

impl RowId {
    /// Wraps a raw row identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw row identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Physical Names
// ============================================================================

/// Returns the physical storage name for a plugin table.
#[must_use]
pub fn physical_table_name(plugin: &PluginId, table: &TableName) -> String {
    format!("{}{PHYSICAL_SEPARATOR}{}", plugin.as_str(), table.as_str())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates a plugin or table segment.
fn validate_segment(kind: &str, value: &str) -> Result<(), ServiceError> {
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{kind} must be non-empty")));
    }
    if value.len() > MAX_SEGMENT_LENGTH {
        return Err(ServiceError::validation(format!(
            "{kind} exceeds {MAX_SEGMENT_LENGTH} characters"
        )));
    }
    if !value
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-')
    {
        return Err(ServiceError::validation(format!(
            "{kind} `{value}` may only contain lowercase ASCII letters, digits, `-`, and `_`"
        )));
    }
    if value.starts_with('_') || value.ends_with('_') || value.contains(PHYSICAL_SEPARATOR) {
        return Err(ServiceError::validation(format!(
            "{kind} `{value}` must not start or end with `_` or contain `__`"
        )));
    }
    Ok(())
}
