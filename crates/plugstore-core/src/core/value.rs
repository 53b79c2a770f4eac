// crates/plugstore-core/src/core/value.rs
// ============================================================================
// Module: Cell Values
// Description: Typed column values and JSON coercion rules.
// Purpose: Convert untrusted JSON into values that match a field type.
// Dependencies: crate::core::{error, schema}, serde_json
// ============================================================================

//! ## Overview
//! [`CellValue`] is the typed form of a single column value. Coercion rules:
//! - `integer` accepts JSON integers and floats with a zero fraction.
//! - `float` accepts any JSON number.
//! - `boolean` accepts JSON booleans only.
//! - `string` accepts JSON strings; `max_length` counts characters.
//! - `json` accepts any JSON value.
//!
//! `null` is accepted only for non-required fields.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Number;
use serde_json::Value;

use crate::core::error::ServiceError;
use crate::core::schema::FieldDef;
use crate::core::schema::FieldType;

/// Largest float that still converts exactly into the `i64` range.
const I64_FLOAT_UPPER: f64 = 9_223_372_036_854_775_808.0;

// ============================================================================
// SECTION: Cell Values
// ============================================================================

/// Typed value for a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// SQL `NULL`.
    Null,
    /// Integer value.
    Integer(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Boolean value.
    Boolean(bool),
    /// JSON document.
    Json(Value),
}

impl CellValue {
    /// Converts the value back into its JSON representation.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Integer(value) => Value::from(*value),
            Self::Float(value) => Number::from_f64(*value).map_or(Value::Null, Value::Number),
            Self::Text(value) => Value::String(value.clone()),
            Self::Boolean(value) => Value::Bool(*value),
            Self::Json(value) => value.clone(),
        }
    }

    /// Returns true for `NULL`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

// ============================================================================
// SECTION: Coercion
// ============================================================================

/// Coerces a JSON value for storage in a field, enforcing nullability and length.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] when the value does not fit the field.
pub fn coerce_field(field: &FieldDef, value: &Value) -> Result<CellValue, ServiceError> {
    if value.is_null() {
        if field.required {
            return Err(ServiceError::validation(format!(
                "field `{}` is required and cannot be null",
                field.name
            )));
        }
        return Ok(CellValue::Null);
    }
    let cell = coerce_as(&field.name, field.field_type, value)?;
    if let (Some(max_length), CellValue::Text(text)) = (field.max_length, &cell) {
        let length = text.chars().count();
        if length > max_length {
            return Err(ServiceError::validation(format!(
                "field `{}` is {length} characters (max {max_length})",
                field.name
            )));
        }
    }
    Ok(cell)
}

/// Coerces a non-null JSON value into the given field type.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] when the value has the wrong shape.
pub fn coerce_as(
    name: &str,
    field_type: FieldType,
    value: &Value,
) -> Result<CellValue, ServiceError> {
    let cell = match field_type {
        FieldType::String => value.as_str().map(|text| CellValue::Text(text.to_string())),
        FieldType::Integer => integer_from_json(value).map(CellValue::Integer),
        FieldType::Float => value.as_f64().map(CellValue::Float),
        FieldType::Boolean => value.as_bool().map(CellValue::Boolean),
        FieldType::Json => Some(CellValue::Json(value.clone())),
    };
    cell.ok_or_else(|| {
        ServiceError::validation(format!(
            "field `{name}` expects {} but got {}",
            field_type.as_str(),
            json_kind(value)
        ))
    })
}

/// Extracts an integer from a JSON number, accepting integral floats.
#[must_use]
pub fn integer_from_json(value: &Value) -> Option<i64> {
    if let Some(integer) = value.as_i64() {
        return Some(integer);
    }
    let float = value.as_f64()?;
    if float.fract() != 0.0 || float < -I64_FLOAT_UPPER || float >= I64_FLOAT_UPPER {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, reason = "Range and fraction checked above.")]
    let integer = float as i64;
    Some(integer)
}

/// Returns a short label for the JSON kind of a value.
#[must_use]
pub const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
