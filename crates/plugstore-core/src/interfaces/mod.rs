// crates/plugstore-core/src/interfaces/mod.rs
// ============================================================================
// Module: Plugstore Interfaces
// Description: Backend-agnostic contracts for schema and row storage.
// Purpose: Let the service layer run against any storage backend.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Backends implement [`SchemaRegistry`] and [`RowStore`]. Every argument a
//! backend receives has already been validated against the registered
//! schema, so implementations only translate plans into storage calls.
//! Implementations must be safe to call from many threads at once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::atomic::FieldOperation;
use crate::core::error::ServiceError;
use crate::core::filter::SearchQuery;
use crate::core::identifiers::PluginId;
use crate::core::identifiers::RowId;
use crate::core::identifiers::TableName;
use crate::core::plan::FieldAssignment;
use crate::core::plan::InsertPlan;
use crate::core::schema::TableSchema;

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Storage backend errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend raised on a well-formed request.
    #[error("store error: {0}")]
    Db(String),
    /// Request was rejected by the backend as invalid.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Request conflicts with existing state (e.g. divergent schema).
    #[error("store conflict: {0}")]
    Conflict(String),
    /// Stored data failed integrity checks.
    #[error("store corruption: {0}")]
    Corrupt(String),
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Db(message) | StoreError::Corrupt(message) => Self::Database(message),
            StoreError::Invalid(message) | StoreError::Conflict(message) => {
                Self::Validation(message)
            }
        }
    }
}

// ============================================================================
// SECTION: Schema Registry
// ============================================================================

/// Result of a schema registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Table was created.
    Created,
    /// An identical schema was already registered.
    Unchanged,
}

/// Registry of table schemas, scoped per plugin.
pub trait SchemaRegistry: Send + Sync {
    /// Registers a schema and creates its physical table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when a different schema already
    /// exists for the same table, or [`StoreError::Db`] on backend failure.
    fn register(&self, schema: TableSchema) -> Result<RegisterOutcome, StoreError>;

    /// Looks up a registered schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup fails.
    fn lookup(
        &self,
        plugin_id: &PluginId,
        table_name: &TableName,
    ) -> Result<Option<Arc<TableSchema>>, StoreError>;

    /// Lists every schema registered by a plugin, ordered by table name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the listing fails.
    fn list(&self, plugin_id: &PluginId) -> Result<Vec<Arc<TableSchema>>, StoreError>;
}

// ============================================================================
// SECTION: Row Store
// ============================================================================

/// Row projected to JSON: system columns plus every declared field.
pub type RowData = Map<String, Value>;

/// Row storage for registered tables.
pub trait RowStore: Send + Sync {
    /// Inserts a row and returns its new identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert fails.
    fn insert(&self, schema: &TableSchema, plan: &InsertPlan) -> Result<RowId, StoreError>;

    /// Loads a row by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn select(&self, schema: &TableSchema, id: RowId) -> Result<Option<RowData>, StoreError>;

    /// Overwrites fields of a row. Returns false when the row does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails.
    fn update_fields(
        &self,
        schema: &TableSchema,
        id: RowId,
        assignments: &[FieldAssignment],
    ) -> Result<bool, StoreError>;

    /// Applies atomic operators to a row as one unit. Returns false when the
    /// row does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the update fails; the row is unchanged.
    fn apply_operations(
        &self,
        schema: &TableSchema,
        id: RowId,
        operations: &[FieldOperation],
    ) -> Result<bool, StoreError>;

    /// Deletes a row. Returns false when the row does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the delete fails.
    fn delete(&self, schema: &TableSchema, id: RowId) -> Result<bool, StoreError>;

    /// Runs a validated search.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn search(&self, schema: &TableSchema, query: &SearchQuery) -> Result<Vec<RowData>, StoreError>;

    /// Reports store readiness for health checks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Shared schema registry handle.
pub type SharedSchemaRegistry = Arc<dyn SchemaRegistry>;
/// Shared row store handle.
pub type SharedRowStore = Arc<dyn RowStore>;
