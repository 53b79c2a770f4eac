// crates/plugstore-store-sqlite/src/registry.rs
// ============================================================================
// Module: SQLite Schema Registry
// Description: Durable schema registry with an in-memory read cache.
// Purpose: Persist table schemas and create their physical tables atomically.
// Dependencies: plugstore-core, rusqlite, serde_json, tracing
// ============================================================================

//! ## Overview
//! Schemas are stored as JSON in `_plugstore_schemas`. Registration writes the
//! schema row and runs `CREATE TABLE` in one transaction, so a schema is never
//! visible without its table. Lookups are served from a cache warmed on open
//! and kept current by every registration made through this handle.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use plugstore_core::PluginId;
use plugstore_core::RegisterOutcome;
use plugstore_core::SchemaRegistry;
use plugstore_core::StoreError;
use plugstore_core::TableName;
use plugstore_core::TableSchema;
use plugstore_core::time::now_rfc3339;
use rusqlite::OptionalExtension;
use rusqlite::params;
use tracing::debug;
use tracing::info;

use crate::sql::create_table_sql;
use crate::store::SCHEMA_TABLE;
use crate::store::SqliteDatabase;
use crate::store::SqliteStoreError;

/// Cache key: owning plugin and logical table.
type SchemaKey = (PluginId, TableName);

// ============================================================================
// SECTION: Registry
// ============================================================================

/// `SQLite`-backed schema registry.
///
/// # Invariants
/// - Cached entries always mirror a committed `_plugstore_schemas` row.
#[derive(Debug)]
pub struct SqliteSchemaRegistry {
    /// Shared database handle.
    db: SqliteDatabase,
    /// Registered schemas keyed by plugin and table.
    cache: RwLock<BTreeMap<SchemaKey, Arc<TableSchema>>>,
}

impl SqliteSchemaRegistry {
    /// Opens the registry and warms its cache from storage.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when stored schemas cannot be read or
    /// decoded.
    pub fn new(db: SqliteDatabase) -> Result<Self, SqliteStoreError> {
        let schemas = db.with_connection(|connection| {
            let mut stmt = connection.prepare(&format!("SELECT schema_json FROM {SCHEMA_TABLE}"))?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut schemas = BTreeMap::new();
            for row in rows {
                let schema = decode_schema(&row?)?;
                schemas.insert(
                    (schema.plugin_id.clone(), schema.table_name.clone()),
                    Arc::new(schema),
                );
            }
            Ok(schemas)
        })?;
        debug!(tables = schemas.len(), "schema cache warmed");
        Ok(Self {
            db,
            cache: RwLock::new(schemas),
        })
    }

    /// Returns a cached schema.
    fn cached(&self, key: &SchemaKey) -> Result<Option<Arc<TableSchema>>, SqliteStoreError> {
        let cache = self
            .cache
            .read()
            .map_err(|_| SqliteStoreError::Io("schema cache lock poisoned".to_string()))?;
        Ok(cache.get(key).cloned())
    }

    /// Stores a schema in the cache.
    fn remember(&self, schema: Arc<TableSchema>) -> Result<(), SqliteStoreError> {
        let mut cache = self
            .cache
            .write()
            .map_err(|_| SqliteStoreError::Io("schema cache lock poisoned".to_string()))?;
        cache.insert((schema.plugin_id.clone(), schema.table_name.clone()), schema);
        Ok(())
    }

    /// Loads a schema row that is missing from the cache.
    fn load(&self, key: &SchemaKey) -> Result<Option<TableSchema>, SqliteStoreError> {
        self.db.with_connection(|connection| {
            let json: Option<String> = connection
                .query_row(
                    &format!(
                        "SELECT schema_json FROM {SCHEMA_TABLE} WHERE plugin_id = ?1 AND table_name = ?2"
                    ),
                    params![key.0.as_str(), key.1.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            json.as_deref().map(decode_schema).transpose()
        })
    }

    /// Writes a schema row and its table, or compares with the stored one.
    fn register_schema(&self, schema: &TableSchema) -> Result<RegisterOutcome, SqliteStoreError> {
        let physical = schema.physical_name();
        if physical.to_ascii_lowercase().starts_with("sqlite_") {
            return Err(SqliteStoreError::Invalid(format!(
                "table name `{physical}` is reserved by the storage engine"
            )));
        }
        let schema_json = serde_json::to_string(schema)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        self.db.with_connection(|connection| {
            let tx = connection.transaction()?;
            let existing: Option<String> = tx
                .query_row(
                    &format!(
                        "SELECT schema_json FROM {SCHEMA_TABLE} WHERE plugin_id = ?1 AND table_name = ?2"
                    ),
                    params![schema.plugin_id.as_str(), schema.table_name.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(existing) = existing {
                let existing = decode_schema(&existing)?;
                if existing.same_definition(schema) {
                    return Ok(RegisterOutcome::Unchanged);
                }
                return Err(SqliteStoreError::Conflict(format!(
                    "table `{}` of plugin `{}` is already registered with a different schema",
                    schema.table_name, schema.plugin_id
                )));
            }
            tx.execute(
                &format!(
                    "INSERT INTO {SCHEMA_TABLE} (plugin_id, table_name, schema_json, created_at) \
                     VALUES (?1, ?2, ?3, ?4)"
                ),
                params![
                    schema.plugin_id.as_str(),
                    schema.table_name.as_str(),
                    schema_json,
                    now_rfc3339()
                ],
            )?;
            tx.execute_batch(&create_table_sql(schema))?;
            tx.commit()?;
            Ok(RegisterOutcome::Created)
        })
    }
}

impl SchemaRegistry for SqliteSchemaRegistry {
    fn register(&self, schema: TableSchema) -> Result<RegisterOutcome, StoreError> {
        let outcome = self.register_schema(&schema)?;
        if outcome == RegisterOutcome::Created {
            info!(
                plugin = %schema.plugin_id,
                table = %schema.table_name,
                fields = schema.fields.len(),
                "table registered"
            );
        }
        self.remember(Arc::new(schema))?;
        Ok(outcome)
    }

    fn lookup(
        &self,
        plugin_id: &PluginId,
        table_name: &TableName,
    ) -> Result<Option<Arc<TableSchema>>, StoreError> {
        let key = (plugin_id.clone(), table_name.clone());
        if let Some(schema) = self.cached(&key)? {
            return Ok(Some(schema));
        }
        let Some(schema) = self.load(&key)? else {
            return Ok(None);
        };
        debug!(plugin = %plugin_id, table = %table_name, "schema loaded outside cache");
        let schema = Arc::new(schema);
        self.remember(Arc::clone(&schema))?;
        Ok(Some(schema))
    }

    fn list(&self, plugin_id: &PluginId) -> Result<Vec<Arc<TableSchema>>, StoreError> {
        let cache = self
            .cache
            .read()
            .map_err(|_| SqliteStoreError::Io("schema cache lock poisoned".to_string()))?;
        Ok(cache
            .iter()
            .filter(|((plugin, _), _)| plugin == plugin_id)
            .map(|(_, schema)| Arc::clone(schema))
            .collect())
    }
}

/// Decodes a stored schema, treating failures as corruption.
fn decode_schema(json: &str) -> Result<TableSchema, SqliteStoreError> {
    let schema: TableSchema =
        serde_json::from_str(json).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))?;
    TableSchema::new(schema.plugin_id, schema.table_name, schema.fields)
        .map_err(|err| SqliteStoreError::Corrupt(err.message()))
}
