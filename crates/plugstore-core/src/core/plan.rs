// crates/plugstore-core/src/core/plan.rs
// ============================================================================
// Module: Write Plans
// Description: Validated insert and update payloads.
// Purpose: Turn untrusted `data`/`operations` maps into typed column writes.
// Dependencies: crate::core::{atomic, error, schema, value}, serde_json
// ============================================================================

//! ## Overview
//! Plans are produced before any storage call, so a backend only ever sees
//! declared fields with values that match their type. Inserts fill missing
//! fields from defaults and reject missing required fields. Updates carry
//! either plain field writes or atomic operations, never both.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::core::atomic::FieldOperation;
use crate::core::atomic::parse_operations;
use crate::core::error::ServiceError;
use crate::core::schema::TableSchema;
use crate::core::schema::is_reserved;
use crate::core::value::CellValue;
use crate::core::value::coerce_field;
use crate::core::value::json_kind;

// ============================================================================
// SECTION: Plan Types
// ============================================================================

/// Typed value for one column write.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssignment {
    /// Target field name.
    pub field: String,
    /// Coerced value.
    pub value: CellValue,
}

/// Validated insert payload.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertPlan {
    /// Column writes in schema order (defaults applied).
    pub assignments: Vec<FieldAssignment>,
}

/// Validated update payload.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdatePlan {
    /// Plain field overwrite.
    Fields(Vec<FieldAssignment>),
    /// Atomic read-modify-write operators.
    Operations(Vec<FieldOperation>),
}

// ============================================================================
// SECTION: Planning
// ============================================================================

/// Validates an insert `data` map.
///
/// # Errors
///
/// Returns [`ServiceError::MissingField`] when a required field without a
/// default is absent, and [`ServiceError::Validation`] for reserved, unknown,
/// or ill-typed fields.
pub fn plan_insert(schema: &TableSchema, data: &Value) -> Result<InsertPlan, ServiceError> {
    let map = data_object(data)?;
    check_known_fields(schema, map)?;
    let mut assignments = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let value = match (map.get(&field.name), &field.default) {
            (Some(value), _) => coerce_field(field, value)?,
            (None, Some(default)) => coerce_field(field, default)?,
            (None, None) if field.required => {
                return Err(ServiceError::MissingField(format!(
                    "required field `{}` is missing",
                    field.name
                )));
            }
            (None, None) => CellValue::Null,
        };
        assignments.push(FieldAssignment {
            field: field.name.clone(),
            value,
        });
    }
    Ok(InsertPlan {
        assignments,
    })
}

/// Validates an update request carrying exactly one of `data` or `operations`.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] when both or neither are present, or
/// when the chosen payload is invalid.
pub fn plan_update(
    schema: &TableSchema,
    data: Option<&Value>,
    operations: Option<&Value>,
) -> Result<UpdatePlan, ServiceError> {
    match (data, operations) {
        (Some(data), None) => plan_field_update(schema, data).map(UpdatePlan::Fields),
        (None, Some(operations)) => parse_operations(schema, operations).map(UpdatePlan::Operations),
        _ => Err(ServiceError::validation("provide exactly one of data or operations")),
    }
}

/// Validates a plain update `data` map.
fn plan_field_update(
    schema: &TableSchema,
    data: &Value,
) -> Result<Vec<FieldAssignment>, ServiceError> {
    let map = data_object(data)?;
    if map.is_empty() {
        return Err(ServiceError::validation("update data must not be empty"));
    }
    check_known_fields(schema, map)?;
    schema
        .fields
        .iter()
        .filter_map(|field| map.get(&field.name).map(|value| (field, value)))
        .map(|(field, value)| {
            Ok(FieldAssignment {
                field: field.name.clone(),
                value: coerce_field(field, value)?,
            })
        })
        .collect()
}

/// Requires a JSON object payload.
fn data_object(data: &Value) -> Result<&Map<String, Value>, ServiceError> {
    match data {
        Value::Object(map) => Ok(map),
        other => Err(ServiceError::validation(format!(
            "data must be an object, got {}",
            json_kind(other)
        ))),
    }
}

/// Rejects reserved and undeclared keys.
fn check_known_fields(schema: &TableSchema, map: &Map<String, Value>) -> Result<(), ServiceError> {
    for key in map.keys() {
        if is_reserved(key) {
            return Err(ServiceError::validation(format!(
                "field `{key}` is system-managed and cannot be written"
            )));
        }
        if schema.field(key).is_none() {
            return Err(ServiceError::validation(format!(
                "unknown field `{key}` for table `{}`",
                schema.table_name
            )));
        }
    }
    Ok(())
}
