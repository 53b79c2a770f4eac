// crates/plugstore-store-sqlite/src/sql.rs
// ============================================================================
// Module: SQL Compilation
// Description: Identifier quoting, DDL, filter and operator compilation.
// Purpose: Turn validated plans into parameterized SQLite statements.
// Dependencies: plugstore-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Every identifier reaching SQL text is a validated field, table, or plugin
//! name, and is still double-quoted with embedded quotes escaped. Every value
//! travels as a bound parameter. Tables are `STRICT`, so an integer overflow
//! inside an atomic update fails the statement instead of silently changing
//! the column type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use plugstore_core::AtomicOp;
use plugstore_core::CellValue;
use plugstore_core::ComparisonOp;
use plugstore_core::FieldOperation;
use plugstore_core::FieldType;
use plugstore_core::FilterNode;
use plugstore_core::NumericOperand;
use plugstore_core::Operand;
use plugstore_core::RowData;
use plugstore_core::SearchQuery;
use plugstore_core::SortOrder;
use plugstore_core::TableSchema;
use rusqlite::types::Value as SqlValue;
use serde_json::Number;
use serde_json::Value;

use crate::store::SqliteStoreError;

// ============================================================================
// SECTION: Identifiers and DDL
// ============================================================================

/// Quotes an identifier for `SQLite`.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Returns the `STRICT` column type for a field type.
const fn column_type(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String | FieldType::Json => "TEXT",
        FieldType::Integer | FieldType::Boolean => "INTEGER",
        FieldType::Float => "REAL",
    }
}

/// Builds the `CREATE TABLE` statement for a schema.
pub(crate) fn create_table_sql(schema: &TableSchema) -> String {
    let mut columns = vec![
        "\"id\" INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
        "\"created_at\" TEXT NOT NULL".to_string(),
        "\"updated_at\" TEXT NOT NULL".to_string(),
    ];
    for field in &schema.fields {
        let name = quote_ident(&field.name);
        let mut column = format!("{name} {}", column_type(field.field_type));
        if field.required {
            column.push_str(" NOT NULL");
        }
        if field.field_type == FieldType::Boolean {
            column.push_str(&format!(" CHECK ({name} IN (0, 1))"));
        }
        columns.push(column);
    }
    format!(
        "CREATE TABLE {} (\n    {}\n) STRICT;",
        quote_ident(&schema.physical_name()),
        columns.join(",\n    ")
    )
}

/// Returns the projected column list: system columns then fields.
pub(crate) fn select_columns(schema: &TableSchema) -> String {
    let mut columns = vec!["\"id\"".to_string(), "\"created_at\"".to_string(), "\"updated_at\"".to_string()];
    columns.extend(schema.fields.iter().map(|field| quote_ident(&field.name)));
    columns.join(", ")
}

// ============================================================================
// SECTION: Values
// ============================================================================

/// Converts a cell into a bound `SQLite` value.
pub(crate) fn to_sql(value: &CellValue) -> SqlValue {
    match value {
        CellValue::Null => SqlValue::Null,
        CellValue::Integer(value) => SqlValue::Integer(*value),
        CellValue::Float(value) => SqlValue::Real(*value),
        CellValue::Text(value) => SqlValue::Text(value.clone()),
        CellValue::Boolean(value) => SqlValue::Integer(i64::from(*value)),
        CellValue::Json(value) => SqlValue::Text(value.to_string()),
    }
}

/// Converts a numeric operand into a bound value.
const fn numeric_sql(operand: NumericOperand) -> SqlValue {
    match operand {
        NumericOperand::Integer(value) => SqlValue::Integer(value),
        NumericOperand::Float(value) => SqlValue::Real(value),
    }
}

/// Decodes one raw row (system columns then fields) into JSON.
pub(crate) fn decode_row(schema: &TableSchema, raw: Vec<SqlValue>) -> Result<RowData, SqliteStoreError> {
    let expected = schema.fields.len() + 3;
    if raw.len() != expected {
        return Err(SqliteStoreError::Corrupt(format!(
            "row has {} columns, expected {expected}",
            raw.len()
        )));
    }
    let mut cells = raw.into_iter();
    let mut row = RowData::new();
    for name in ["id", "created_at", "updated_at"] {
        let value = match cells.next() {
            Some(SqlValue::Integer(value)) => Value::from(value),
            Some(SqlValue::Text(value)) => Value::String(value),
            _ => {
                return Err(SqliteStoreError::Corrupt(format!("system column `{name}` is malformed")));
            }
        };
        row.insert(name.to_string(), value);
    }
    for (field, cell) in schema.fields.iter().zip(cells) {
        let value = decode_cell(field.field_type, cell).ok_or_else(|| {
            SqliteStoreError::Corrupt(format!(
                "column `{}` does not hold a {} value",
                field.name,
                field.field_type.as_str()
            ))
        })?;
        row.insert(field.name.clone(), value);
    }
    Ok(row)
}

/// Decodes one stored cell for a field type.
fn decode_cell(field_type: FieldType, cell: SqlValue) -> Option<Value> {
    match (field_type, cell) {
        (_, SqlValue::Null) => Some(Value::Null),
        (FieldType::String, SqlValue::Text(text)) => Some(Value::String(text)),
        (FieldType::Integer, SqlValue::Integer(value)) => Some(Value::from(value)),
        (FieldType::Float, SqlValue::Real(value)) => Number::from_f64(value).map(Value::Number),
        #[allow(clippy::cast_precision_loss, reason = "REAL columns may surface integral values.")]
        (FieldType::Float, SqlValue::Integer(value)) => Number::from_f64(value as f64).map(Value::Number),
        (FieldType::Boolean, SqlValue::Integer(value)) => Some(Value::Bool(value != 0)),
        (FieldType::Json, SqlValue::Text(text)) => serde_json::from_str(&text).ok(),
        _ => None,
    }
}

// ============================================================================
// SECTION: Filters
// ============================================================================

/// Compiled `SELECT` statement with bound parameters.
#[derive(Debug)]
pub(crate) struct CompiledQuery {
    /// Statement text.
    pub sql: String,
    /// Positional parameters.
    pub params: Vec<SqlValue>,
}

/// Compiles a search into a single `SELECT`.
pub(crate) fn compile_search(schema: &TableSchema, query: &SearchQuery) -> CompiledQuery {
    let mut params = Vec::new();
    let mut sql = format!(
        "SELECT {} FROM {}",
        select_columns(schema),
        quote_ident(&schema.physical_name())
    );
    if let Some(filter) = &query.filter {
        sql.push_str(" WHERE ");
        sql.push_str(&compile_filter(filter, &mut params));
    }
    match &query.sort {
        Some(sort) => {
            let direction = match sort.order {
                SortOrder::Asc => "ASC",
                SortOrder::Desc => "DESC",
            };
            sql.push_str(&format!(" ORDER BY {} {direction}", quote_ident(&sort.field)));
            if sort.field != "id" {
                sql.push_str(", \"id\" ASC");
            }
        }
        None => sql.push_str(" ORDER BY \"id\" ASC"),
    }
    sql.push_str(" LIMIT ?");
    params.push(SqlValue::Integer(i64::try_from(query.limit).unwrap_or(i64::MAX)));
    CompiledQuery {
        sql,
        params,
    }
}

/// Compiles a filter tree into a boolean SQL expression.
pub(crate) fn compile_filter(node: &FilterNode, params: &mut Vec<SqlValue>) -> String {
    match node {
        FilterNode::Leaf {
            field,
            op,
            operand,
        } => compile_leaf(field, *op, operand, params),
        FilterNode::And(children) => join_children(children, " AND ", "1", params),
        FilterNode::Or(children) => join_children(children, " OR ", "0", params),
    }
}

/// Joins compiled children with a boolean connective.
fn join_children(
    children: &[FilterNode],
    connective: &str,
    empty: &str,
    params: &mut Vec<SqlValue>,
) -> String {
    if children.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> =
        children.iter().map(|child| format!("({})", compile_filter(child, params))).collect();
    parts.join(connective)
}

/// Compiles a single predicate.
fn compile_leaf(field: &str, op: ComparisonOp, operand: &Operand, params: &mut Vec<SqlValue>) -> String {
    let column = quote_ident(field);
    match operand {
        Operand::List(values) => {
            if values.is_empty() {
                return "0".to_string();
            }
            params.extend(values.iter().map(to_sql));
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("{column} IN ({placeholders})")
        }
        Operand::Single(CellValue::Null) => match op {
            ComparisonOp::Ne => format!("{column} IS NOT NULL"),
            _ => format!("{column} IS NULL"),
        },
        Operand::Single(value) => {
            params.push(to_sql(value));
            let operator = match op {
                ComparisonOp::Eq | ComparisonOp::In => "=",
                ComparisonOp::Ne => "<>",
                ComparisonOp::Gt => ">",
                ComparisonOp::Gte => ">=",
                ComparisonOp::Lt => "<",
                ComparisonOp::Lte => "<=",
                ComparisonOp::Like => "LIKE",
            };
            format!("{column} {operator} ?")
        }
    }
}

// ============================================================================
// SECTION: Atomic Operators
// ============================================================================

/// Compiles operators into a `SET` list, appending bound values.
///
/// `NULL` counts as zero for `$inc`, `$dec`, and `$mul`; `$max` and `$min`
/// against `NULL` store the operand.
pub(crate) fn compile_operations(operations: &[FieldOperation], params: &mut Vec<SqlValue>) -> Vec<String> {
    operations
        .iter()
        .map(|operation| {
            let column = quote_ident(&operation.field);
            match &operation.op {
                AtomicOp::Inc(operand) => arithmetic(&column, "+", *operand, params),
                AtomicOp::Dec(operand) => arithmetic(&column, "-", *operand, params),
                AtomicOp::Mul(operand) => arithmetic(&column, "*", *operand, params),
                AtomicOp::Max(operand) => extremum(&column, "MAX", *operand, params),
                AtomicOp::Min(operand) => extremum(&column, "MIN", *operand, params),
                AtomicOp::Set(value) => {
                    params.push(to_sql(value));
                    format!("{column} = ?")
                }
            }
        })
        .collect()
}

/// Builds `col = COALESCE(col, 0) <op> ?`.
fn arithmetic(column: &str, operator: &str, operand: NumericOperand, params: &mut Vec<SqlValue>) -> String {
    params.push(numeric_sql(operand));
    format!("{column} = COALESCE({column}, 0) {operator} ?")
}

/// Builds `col = MAX(COALESCE(col, ?), ?)` (or `MIN`).
fn extremum(column: &str, function: &str, operand: NumericOperand, params: &mut Vec<SqlValue>) -> String {
    params.push(numeric_sql(operand));
    params.push(numeric_sql(operand));
    format!("{column} = {function}(COALESCE({column}, ?), ?)")
}
