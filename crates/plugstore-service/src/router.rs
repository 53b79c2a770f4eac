// crates/plugstore-service/src/router.rs
// ============================================================================
// Module: Storage Router
// Description: Operation dispatch from decoded payloads to the stores.
// Purpose: Validate requests, resolve schemas, and shape success envelopes.
// Dependencies: plugstore-core, serde_json, tokio
// ============================================================================

//! ## Overview
//! The router receives an already parsed [`Subject`] and a decoded JSON
//! payload. Every operation validates its payload into a typed plan before
//! touching storage, then runs the store call on the blocking pool. Schemas
//! are always resolved under the subject's plugin, so one plugin can never
//! reach another plugin's tables.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use plugstore_core::Envelope;
use plugstore_core::FieldDef;
use plugstore_core::PluginId;
use plugstore_core::RowId;
use plugstore_core::ServiceError;
use plugstore_core::SharedRowStore;
use plugstore_core::SharedSchemaRegistry;
use plugstore_core::TableName;
use plugstore_core::TableSchema;
use plugstore_core::UpdatePlan;
use plugstore_core::build_search;
use plugstore_core::plan_insert;
use plugstore_core::plan_update;
use plugstore_core::value::integer_from_json;
use plugstore_core::value::json_kind;
use serde_json::Map;
use serde_json::Value;

use crate::subject::Operation;
use crate::subject::Subject;

/// Decoded request payload.
type Payload = Map<String, Value>;

// ============================================================================
// SECTION: Router
// ============================================================================

/// Routes storage operations to the schema registry and row store.
#[derive(Clone)]
pub struct StorageRouter {
    /// Injected schema registry.
    registry: SharedSchemaRegistry,
    /// Injected row store.
    rows: SharedRowStore,
    /// Upper bound on rows returned by one search.
    max_rows: usize,
}

impl StorageRouter {
    /// Creates a router over shared stores.
    #[must_use]
    pub fn new(registry: SharedSchemaRegistry, rows: SharedRowStore, max_rows: usize) -> Self {
        Self {
            registry,
            rows,
            max_rows,
        }
    }

    /// Returns the row store used by this router.
    #[must_use]
    pub const fn rows(&self) -> &SharedRowStore {
        &self.rows
    }

    /// Dispatches one request.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] classified for the response envelope.
    pub async fn dispatch(&self, subject: &Subject, payload: Value) -> Result<Envelope, ServiceError> {
        let Value::Object(payload) = payload else {
            return Err(ServiceError::validation(format!(
                "payload must be a JSON object, got {}",
                json_kind(&payload)
            )));
        };
        let plugin = &subject.plugin;
        match subject.operation {
            Operation::SchemaRegister => self.schema_register(plugin, &payload).await,
            Operation::SchemaGet => self.schema_get(plugin, &payload).await,
            Operation::SchemaList => self.schema_list(plugin).await,
            Operation::Insert => self.insert(plugin, &payload).await,
            Operation::Select => self.select(plugin, &payload).await,
            Operation::Update => self.update(plugin, &payload).await,
            Operation::Delete => self.delete(plugin, &payload).await,
            Operation::Search => self.search(plugin, &payload).await,
        }
    }

    // ------------------------------------------------------------------------
    // Schema operations
    // ------------------------------------------------------------------------

    /// Handles `schema.register`.
    async fn schema_register(
        &self,
        plugin: &PluginId,
        payload: &Payload,
    ) -> Result<Envelope, ServiceError> {
        let table = table_name(payload)?;
        let Value::Object(definition) = required(payload, "schema")? else {
            return Err(ServiceError::validation("schema must be an object"));
        };
        let fields = definition
            .get("fields")
            .filter(|value| !value.is_null())
            .ok_or_else(|| ServiceError::MissingField("schema.fields".to_string()))?;
        let fields: Vec<FieldDef> = serde_json::from_value(fields.clone()).map_err(|err| {
            ServiceError::validation(format!("invalid field definitions: {err}"))
        })?;
        let schema = TableSchema::new(plugin.clone(), table, fields)?;
        let registry = Arc::clone(&self.registry);
        tokio::task::spawn_blocking(move || registry.register(schema))
            .await
            .map_err(|err| ServiceError::Internal(format!("schema register join failed: {err}")))??;
        Ok(Envelope::success())
    }

    /// Handles `schema.get`.
    async fn schema_get(&self, plugin: &PluginId, payload: &Payload) -> Result<Envelope, ServiceError> {
        let table = table_name(payload)?;
        let Some(schema) = self.lookup(plugin, &table).await? else {
            return Ok(Envelope::success().with("exists", false));
        };
        Ok(Envelope::success().with("exists", true).with("schema", schema_json(&schema)?))
    }

    /// Handles `schema.list`.
    async fn schema_list(&self, plugin: &PluginId) -> Result<Envelope, ServiceError> {
        let registry = Arc::clone(&self.registry);
        let owner = plugin.clone();
        let schemas = tokio::task::spawn_blocking(move || registry.list(&owner))
            .await
            .map_err(|err| ServiceError::Internal(format!("schema list join failed: {err}")))??;
        let tables: Vec<Value> = schemas
            .iter()
            .map(|schema| Value::String(schema.table_name.to_string()))
            .collect();
        Ok(Envelope::success().with("tables", tables))
    }

    // ------------------------------------------------------------------------
    // Row operations
    // ------------------------------------------------------------------------

    /// Handles `insert`.
    async fn insert(&self, plugin: &PluginId, payload: &Payload) -> Result<Envelope, ServiceError> {
        let table = table_name(payload)?;
        let data = required(payload, "data")?;
        let schema = self.resolve(plugin, table).await?;
        let plan = plan_insert(&schema, data)?;
        let rows = Arc::clone(&self.rows);
        let id = tokio::task::spawn_blocking(move || rows.insert(&schema, &plan))
            .await
            .map_err(|err| ServiceError::Internal(format!("row insert join failed: {err}")))??;
        Ok(Envelope::success().with("id", id.get()))
    }

    /// Handles `select`.
    async fn select(&self, plugin: &PluginId, payload: &Payload) -> Result<Envelope, ServiceError> {
        let table = table_name(payload)?;
        let id = row_id(payload)?;
        let schema = self.resolve(plugin, table).await?;
        let rows = Arc::clone(&self.rows);
        let row = tokio::task::spawn_blocking(move || rows.select(&schema, id))
            .await
            .map_err(|err| ServiceError::Internal(format!("row select join failed: {err}")))??;
        Ok(match row {
            Some(data) => Envelope::success().with("exists", true).with("data", Value::Object(data)),
            None => Envelope::success().with("exists", false),
        })
    }

    /// Handles `update` in either plain or atomic mode.
    async fn update(&self, plugin: &PluginId, payload: &Payload) -> Result<Envelope, ServiceError> {
        let table = table_name(payload)?;
        let id = row_id(payload)?;
        let schema = self.resolve(plugin, table).await?;
        let plan = plan_update(&schema, optional(payload, "data"), optional(payload, "operations"))?;
        let rows = Arc::clone(&self.rows);
        let updated = tokio::task::spawn_blocking(move || match plan {
            UpdatePlan::Fields(assignments) => rows.update_fields(&schema, id, &assignments),
            UpdatePlan::Operations(operations) => rows.apply_operations(&schema, id, &operations),
        })
        .await
        .map_err(|err| ServiceError::Internal(format!("row update join failed: {err}")))??;
        Ok(Envelope::success().with("id", id.get()).with("updated", updated))
    }

    /// Handles `delete`.
    async fn delete(&self, plugin: &PluginId, payload: &Payload) -> Result<Envelope, ServiceError> {
        let table = table_name(payload)?;
        let id = row_id(payload)?;
        let schema = self.resolve(plugin, table).await?;
        let rows = Arc::clone(&self.rows);
        let deleted = tokio::task::spawn_blocking(move || rows.delete(&schema, id))
            .await
            .map_err(|err| ServiceError::Internal(format!("row delete join failed: {err}")))??;
        Ok(Envelope::success().with("deleted", deleted))
    }

    /// Handles `search`.
    async fn search(&self, plugin: &PluginId, payload: &Payload) -> Result<Envelope, ServiceError> {
        let table = table_name(payload)?;
        let schema = self.resolve(plugin, table).await?;
        let query = build_search(
            &schema,
            optional(payload, "filters"),
            optional(payload, "sort"),
            optional(payload, "limit"),
            self.max_rows,
        )?;
        let rows = Arc::clone(&self.rows);
        let found = tokio::task::spawn_blocking(move || rows.search(&schema, &query))
            .await
            .map_err(|err| ServiceError::Internal(format!("row search join failed: {err}")))??;
        let found: Vec<Value> = found.into_iter().map(Value::Object).collect();
        Ok(Envelope::success().with("rows", found))
    }

    // ------------------------------------------------------------------------
    // Schema resolution
    // ------------------------------------------------------------------------

    /// Looks up a schema owned by `plugin`.
    async fn lookup(
        &self,
        plugin: &PluginId,
        table: &TableName,
    ) -> Result<Option<Arc<TableSchema>>, ServiceError> {
        let registry = Arc::clone(&self.registry);
        let owner = plugin.clone();
        let name = table.clone();
        let schema = tokio::task::spawn_blocking(move || registry.lookup(&owner, &name))
            .await
            .map_err(|err| ServiceError::Internal(format!("schema lookup join failed: {err}")))??;
        Ok(schema)
    }

    /// Looks up a schema that must exist.
    async fn resolve(
        &self,
        plugin: &PluginId,
        table: TableName,
    ) -> Result<Arc<TableSchema>, ServiceError> {
        self.lookup(plugin, &table).await?.ok_or_else(|| ServiceError::SchemaNotRegistered {
            plugin: plugin.to_string(),
            table: table.to_string(),
        })
    }
}

// ============================================================================
// SECTION: Payload Helpers
// ============================================================================

/// Returns a present, non-null payload value.
fn optional<'a>(payload: &'a Payload, key: &str) -> Option<&'a Value> {
    payload.get(key).filter(|value| !value.is_null())
}

/// Returns a payload value that must be present.
fn required<'a>(payload: &'a Payload, key: &str) -> Result<&'a Value, ServiceError> {
    optional(payload, key).ok_or_else(|| ServiceError::MissingField(key.to_string()))
}

/// Reads and validates the `table` field.
fn table_name(payload: &Payload) -> Result<TableName, ServiceError> {
    match required(payload, "table")? {
        Value::String(name) => TableName::parse(name.as_str()),
        other => Err(ServiceError::validation(format!(
            "table must be a string, got {}",
            json_kind(other)
        ))),
    }
}

/// Reads and validates the `id` field.
fn row_id(payload: &Payload) -> Result<RowId, ServiceError> {
    let value = required(payload, "id")?;
    integer_from_json(value).map(RowId::new).ok_or_else(|| {
        ServiceError::validation(format!("id must be an integer, got {}", json_kind(value)))
    })
}

/// Renders the public view of a schema.
fn schema_json(schema: &TableSchema) -> Result<Value, ServiceError> {
    let fields = serde_json::to_value(&schema.fields)
        .map_err(|err| ServiceError::Internal(format!("schema serialization failed: {err}")))?;
    let mut map = Map::new();
    map.insert("fields".to_string(), fields);
    Ok(Value::Object(map))
}
