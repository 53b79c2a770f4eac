// crates/plugstore-store-sqlite/src/rows.rs
// ============================================================================
// Module: SQLite Row Store
// Description: Row CRUD, atomic operators, and search over plugin tables.
// Purpose: Execute validated plans against `{plugin}__{table}` tables.
// Dependencies: plugstore-core, rusqlite, tracing
// ============================================================================

//! ## Overview
//! Every method receives a schema that has already been resolved for the
//! calling plugin, so the physical table name is always namespaced. Writes
//! stamp `updated_at` (and `created_at` on insert) with the same fixed-width
//! UTC timestamp format.

// ============================================================================
// SECTION: Imports
// ============================================================================

use plugstore_core::AtomicOp;
use plugstore_core::FieldAssignment;
use plugstore_core::FieldOperation;
use plugstore_core::FieldType;
use plugstore_core::InsertPlan;
use plugstore_core::RowData;
use plugstore_core::RowId;
use plugstore_core::RowStore;
use plugstore_core::SearchQuery;
use plugstore_core::StoreError;
use plugstore_core::TableSchema;
use plugstore_core::time::now_rfc3339;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params_from_iter;
use rusqlite::types::Value as SqlValue;
use tracing::trace;

use crate::sql::compile_operations;
use crate::sql::compile_search;
use crate::sql::decode_row;
use crate::sql::quote_ident;
use crate::sql::select_columns;
use crate::sql::to_sql;
use crate::store::SqliteDatabase;
use crate::store::SqliteStoreError;

// ============================================================================
// SECTION: Row Store
// ============================================================================

/// `SQLite`-backed row store.
#[derive(Debug, Clone)]
pub struct SqliteRowStore {
    /// Shared database handle.
    db: SqliteDatabase,
}

impl SqliteRowStore {
    /// Creates a row store over an open database.
    #[must_use]
    pub const fn new(db: SqliteDatabase) -> Self {
        Self {
            db,
        }
    }

    /// Runs an `UPDATE ... WHERE id = ?` built from `set` clauses in a transaction.
    ///
    /// Columns listed in `finite` are read back before commit; a non-finite
    /// value rolls the whole update back.
    fn update_row(
        &self,
        schema: &TableSchema,
        id: RowId,
        mut set: Vec<String>,
        mut params: Vec<SqlValue>,
        finite: &[&str],
    ) -> Result<bool, SqliteStoreError> {
        set.push("\"updated_at\" = ?".to_string());
        params.push(SqlValue::Text(now_rfc3339()));
        params.push(SqlValue::Integer(id.get()));
        let sql = format!(
            "UPDATE {} SET {} WHERE \"id\" = ?",
            quote_ident(&schema.physical_name()),
            set.join(", ")
        );
        self.db.with_connection(|connection| {
            let tx = connection.transaction()?;
            let changed = tx.execute(&sql, params_from_iter(params))?;
            if changed > 0 {
                ensure_finite(&tx, schema, id, finite)?;
            }
            tx.commit()?;
            Ok(changed > 0)
        })
    }
}

impl RowStore for SqliteRowStore {
    fn insert(&self, schema: &TableSchema, plan: &InsertPlan) -> Result<RowId, StoreError> {
        let now = now_rfc3339();
        let mut columns = vec!["\"created_at\"".to_string(), "\"updated_at\"".to_string()];
        let mut params = vec![SqlValue::Text(now.clone()), SqlValue::Text(now)];
        for assignment in &plan.assignments {
            columns.push(quote_ident(&assignment.field));
            params.push(to_sql(&assignment.value));
        }
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&schema.physical_name()),
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        );
        let id = self.db.with_connection(|connection| {
            connection.execute(&sql, params_from_iter(params))?;
            Ok(RowId::new(connection.last_insert_rowid()))
        })?;
        trace!(table = %schema.physical_name(), %id, "row inserted");
        Ok(id)
    }

    fn select(&self, schema: &TableSchema, id: RowId) -> Result<Option<RowData>, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE \"id\" = ?1",
            select_columns(schema),
            quote_ident(&schema.physical_name())
        );
        let width = schema.fields.len() + 3;
        let raw = self.db.with_connection(|connection| {
            Ok(connection
                .query_row(&sql, [id.get()], |row| read_raw(row, width))
                .optional()?)
        })?;
        Ok(raw.map(|raw| decode_row(schema, raw)).transpose()?)
    }

    fn update_fields(
        &self,
        schema: &TableSchema,
        id: RowId,
        assignments: &[FieldAssignment],
    ) -> Result<bool, StoreError> {
        let set = assignments
            .iter()
            .map(|assignment| format!("{} = ?", quote_ident(&assignment.field)))
            .collect();
        let params = assignments.iter().map(|assignment| to_sql(&assignment.value)).collect();
        Ok(self.update_row(schema, id, set, params, &[])?)
    }

    fn apply_operations(
        &self,
        schema: &TableSchema,
        id: RowId,
        operations: &[FieldOperation],
    ) -> Result<bool, StoreError> {
        let mut params = Vec::new();
        let set = compile_operations(operations, &mut params);
        let finite = float_arithmetic_columns(schema, operations);
        let updated = self.update_row(schema, id, set, params, &finite)?;
        trace!(
            table = %schema.physical_name(),
            %id,
            ops = operations.len(),
            updated,
            "operators applied"
        );
        Ok(updated)
    }

    fn delete(&self, schema: &TableSchema, id: RowId) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE \"id\" = ?1", quote_ident(&schema.physical_name()));
        let deleted = self
            .db
            .with_connection(|connection| Ok(connection.execute(&sql, [id.get()])? > 0))?;
        Ok(deleted)
    }

    fn search(&self, schema: &TableSchema, query: &SearchQuery) -> Result<Vec<RowData>, StoreError> {
        let compiled = compile_search(schema, query);
        let width = schema.fields.len() + 3;
        let raw_rows = self.db.with_connection(|connection| {
            query_raw(connection, &compiled.sql, compiled.params, width)
        })?;
        let rows = raw_rows
            .into_iter()
            .map(|raw| decode_row(schema, raw))
            .collect::<Result<Vec<_>, _>>()?;
        trace!(table = %schema.physical_name(), rows = rows.len(), "search executed");
        Ok(rows)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.db.check_connection().map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads every column of a row as a raw `SQLite` value.
fn read_raw(row: &rusqlite::Row<'_>, width: usize) -> rusqlite::Result<Vec<SqlValue>> {
    (0 .. width).map(|index| row.get::<_, SqlValue>(index)).collect()
}

/// Float columns whose new value comes from `$inc`, `$dec`, or `$mul`.
fn float_arithmetic_columns<'a>(
    schema: &TableSchema,
    operations: &'a [FieldOperation],
) -> Vec<&'a str> {
    operations
        .iter()
        .filter(|operation| {
            matches!(operation.op, AtomicOp::Inc(_) | AtomicOp::Dec(_) | AtomicOp::Mul(_))
        })
        .filter(|operation| {
            schema.field(&operation.field).is_some_and(|field| field.field_type == FieldType::Float)
        })
        .map(|operation| operation.field.as_str())
        .collect()
}

/// Fails when any listed column of the row holds an infinite or NaN value.
fn ensure_finite(
    connection: &Connection,
    schema: &TableSchema,
    id: RowId,
    columns: &[&str],
) -> Result<(), SqliteStoreError> {
    if columns.is_empty() {
        return Ok(());
    }
    let list = columns.iter().map(|column| quote_ident(column)).collect::<Vec<_>>().join(", ");
    let sql = format!(
        "SELECT {list} FROM {} WHERE \"id\" = ?1",
        quote_ident(&schema.physical_name())
    );
    let values = connection.query_row(&sql, [id.get()], |row| read_raw(row, columns.len()))?;
    for (column, value) in columns.iter().zip(values) {
        if let SqlValue::Real(value) = value
            && !value.is_finite()
        {
            return Err(SqliteStoreError::Db(format!(
                "float overflow in column `{column}`; row left unchanged"
            )));
        }
    }
    Ok(())
}

/// Runs a query and collects raw rows.
fn query_raw(
    connection: &Connection,
    sql: &str,
    params: Vec<SqlValue>,
    width: usize,
) -> Result<Vec<Vec<SqlValue>>, SqliteStoreError> {
    let mut stmt = connection.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(params), |row| read_raw(row, width))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}
