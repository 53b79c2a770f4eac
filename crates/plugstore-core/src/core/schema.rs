// crates/plugstore-core/src/core/schema.rs
// ============================================================================
// Module: Table Schemas
// Description: Per-plugin table definitions and their validation rules.
// Purpose: Define what a plugin may store before any row reaches storage.
// Dependencies: crate::core::{error, identifiers, value}, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`TableSchema`] is an ordered list of [`FieldDef`] entries registered by
//! a plugin for one logical table. The system columns `id`, `created_at`, and
//! `updated_at` are implicit and may never appear in a caller-supplied field
//! list. Schemas are immutable once registered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::error::ServiceError;
use crate::core::identifiers::PluginId;
use crate::core::identifiers::TableName;
use crate::core::identifiers::physical_table_name;
use crate::core::value::coerce_field;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// System-managed column names.
pub const RESERVED_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];
/// Maximum number of caller-defined fields per table.
pub const MAX_FIELDS: usize = 64;
/// Maximum length of a field name.
pub const MAX_FIELD_NAME_LENGTH: usize = 64;

// ============================================================================
// SECTION: Field Types
// ============================================================================

/// Supported column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 text.
    String,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit float.
    Float,
    /// Boolean stored as 0/1.
    Boolean,
    /// Arbitrary JSON value stored as serialized text.
    Json,
}

impl FieldType {
    /// Returns true for types accepted by numeric atomic operators.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    /// Returns the lowercase type label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Json => "json",
        }
    }
}

/// Caller-defined field of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether inserts must provide a value (or rely on the default).
    #[serde(default)]
    pub required: bool,
    /// Maximum string length in characters (string fields only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Default applied on insert when the field is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl FieldDef {
    /// Creates a field with no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            max_length: None,
            default: None,
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets a maximum string length.
    #[must_use]
    pub const fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Sets a default value.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Addressable column of a table, including system columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Column<'a> {
    /// Row identifier.
    Id,
    /// Creation timestamp.
    CreatedAt,
    /// Last mutation timestamp.
    UpdatedAt,
    /// Caller-defined field.
    Field(&'a FieldDef),
}

impl Column<'_> {
    /// Returns the physical column name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Id => "id",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Field(field) => &field.name,
        }
    }
}

// ============================================================================
// SECTION: Table Schema
// ============================================================================

/// Registered table definition for one plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Owning plugin.
    pub plugin_id: PluginId,
    /// Logical table name.
    pub table_name: TableName,
    /// Ordered caller-defined fields.
    pub fields: Vec<FieldDef>,
}

impl TableSchema {
    /// Builds and validates a table schema.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Validation`] when any field definition is
    /// invalid.
    pub fn new(
        plugin_id: PluginId,
        table_name: TableName,
        fields: Vec<FieldDef>,
    ) -> Result<Self, ServiceError> {
        validate_fields(&fields)?;
        Ok(Self {
            plugin_id,
            table_name,
            fields,
        })
    }

    /// Returns the physical storage name `{plugin}__{table}`.
    #[must_use]
    pub fn physical_name(&self) -> String {
        physical_table_name(&self.plugin_id, &self.table_name)
    }

    /// Looks up a caller-defined field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Resolves any addressable column, system columns included.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Column<'_>> {
        match name {
            "id" => Some(Column::Id),
            "created_at" => Some(Column::CreatedAt),
            "updated_at" => Some(Column::UpdatedAt),
            other => self.field(other).map(Column::Field),
        }
    }

    /// Returns true when both schemas define the same fields in the same order.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

/// Returns true when the name is a system-managed column, ignoring ASCII case.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_FIELDS.iter().any(|reserved| reserved.eq_ignore_ascii_case(name))
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a caller-supplied field list.
fn validate_fields(fields: &[FieldDef]) -> Result<(), ServiceError> {
    if fields.is_empty() {
        return Err(ServiceError::validation("schema must declare at least one field"));
    }
    if fields.len() > MAX_FIELDS {
        return Err(ServiceError::validation(format!(
            "schema declares {} fields (max {MAX_FIELDS})",
            fields.len()
        )));
    }
    let mut seen = BTreeSet::new();
    for field in fields {
        validate_field_name(&field.name)?;
        // Column names are case-insensitive in SQLite.
        if !seen.insert(field.name.to_ascii_lowercase()) {
            return Err(ServiceError::validation(format!(
                "duplicate field `{}` (field names are case-insensitive)",
                field.name
            )));
        }
        match field.max_length {
            Some(_) if field.field_type != FieldType::String => {
                return Err(ServiceError::validation(format!(
                    "max_length only applies to string fields (field `{}` is {})",
                    field.name,
                    field.field_type.as_str()
                )));
            }
            Some(0) => {
                return Err(ServiceError::validation(format!(
                    "max_length for field `{}` must be greater than zero",
                    field.name
                )));
            }
            _ => {}
        }
        if let Some(default) = &field.default {
            coerce_field(field, default).map_err(|err| {
                ServiceError::validation(format!(
                    "default for field `{}` is invalid: {}",
                    field.name,
                    err.message()
                ))
            })?;
        }
    }
    Ok(())
}

/// Validates a single field name.
fn validate_field_name(name: &str) -> Result<(), ServiceError> {
    if is_reserved(name) {
        return Err(ServiceError::validation(format!(
            "field name `{name}` is reserved for system columns"
        )));
    }
    if name.is_empty() || name.len() > MAX_FIELD_NAME_LENGTH {
        return Err(ServiceError::validation(format!(
            "field name must be 1 to {MAX_FIELD_NAME_LENGTH} characters"
        )));
    }
    let mut chars = name.chars();
    let leading_ok = chars.next().is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
    if !leading_ok || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
        return Err(ServiceError::validation(format!(
            "field name `{name}` must match [A-Za-z_][A-Za-z0-9_]*"
        )));
    }
    Ok(())
}
