// crates/plugstore-core/src/core/atomic.rs
// ============================================================================
// Module: Atomic Operators
// Description: Typed field operators for read-modify-write updates.
// Purpose: Validate `operations` maps before a backend compiles them.
// Dependencies: crate::core::{error, schema, value}, serde_json
// ============================================================================

//! ## Overview
//! An `operations` map has the shape `{field: {"$op": operand}}` with exactly
//! one operator per field. `$inc`, `$dec`, `$mul`, `$max` and `$min` apply to
//! numeric fields only; `$set` accepts any value the field would accept on
//! insert. Integer fields require integral operands so the stored column
//! type never drifts.
//!
//! Backends must apply every operation of one request as a single statement
//! so concurrent callers never lose updates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::error::ServiceError;
use crate::core::schema::FieldDef;
use crate::core::schema::FieldType;
use crate::core::schema::TableSchema;
use crate::core::schema::is_reserved;
use crate::core::value::CellValue;
use crate::core::value::coerce_field;
use crate::core::value::integer_from_json;
use crate::core::value::json_kind;

// ============================================================================
// SECTION: Operator Types
// ============================================================================

/// Numeric operand, typed to match the target field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericOperand {
    /// Operand for an integer field.
    Integer(i64),
    /// Operand for a float field.
    Float(f64),
}

impl NumericOperand {
    /// Returns the operand as a cell value.
    #[must_use]
    pub const fn to_cell(self) -> CellValue {
        match self {
            Self::Integer(value) => CellValue::Integer(value),
            Self::Float(value) => CellValue::Float(value),
        }
    }
}

/// Atomic field operator.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomicOp {
    /// `v + x`.
    Inc(NumericOperand),
    /// `v - x`.
    Dec(NumericOperand),
    /// `v * x`.
    Mul(NumericOperand),
    /// `max(v, x)`.
    Max(NumericOperand),
    /// `min(v, x)`.
    Min(NumericOperand),
    /// Unconditional overwrite.
    Set(CellValue),
}

impl AtomicOp {
    /// Returns the operator key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inc(_) => "$inc",
            Self::Dec(_) => "$dec",
            Self::Mul(_) => "$mul",
            Self::Max(_) => "$max",
            Self::Min(_) => "$min",
            Self::Set(_) => "$set",
        }
    }
}

/// Operator bound to one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOperation {
    /// Target field name.
    pub field: String,
    /// Operator and operand.
    pub op: AtomicOp,
}

// ============================================================================
// SECTION: Parsing
// ============================================================================

/// Parses an `operations` map against a schema.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] for unknown or reserved fields,
/// unknown operators, several operators on one field, numeric operators on
/// non-numeric fields, and operands that do not fit the field.
pub fn parse_operations(
    schema: &TableSchema,
    operations: &Value,
) -> Result<Vec<FieldOperation>, ServiceError> {
    let Value::Object(map) = operations else {
        return Err(ServiceError::validation(format!(
            "operations must be an object, got {}",
            json_kind(operations)
        )));
    };
    if map.is_empty() {
        return Err(ServiceError::validation("operations must not be empty"));
    }
    let mut parsed = Vec::with_capacity(map.len());
    for (name, spec) in map {
        if is_reserved(name) {
            return Err(ServiceError::validation(format!(
                "field `{name}` is system-managed and cannot be modified"
            )));
        }
        let field = schema.field(name).ok_or_else(|| {
            ServiceError::validation(format!(
                "unknown field `{name}` for table `{}`",
                schema.table_name
            ))
        })?;
        let Value::Object(ops) = spec else {
            return Err(ServiceError::validation(format!(
                "operation for `{name}` must be an object like {{\"$inc\": 1}}"
            )));
        };
        let mut entries = ops.iter();
        let (Some((key, operand)), None) = (entries.next(), entries.next()) else {
            return Err(ServiceError::validation(format!(
                "field `{name}` must carry exactly one operator"
            )));
        };
        parsed.push(FieldOperation {
            field: name.clone(),
            op: parse_op(field, key, operand)?,
        });
    }
    Ok(parsed)
}

/// Parses one operator for one field.
fn parse_op(field: &FieldDef, key: &str, operand: &Value) -> Result<AtomicOp, ServiceError> {
    let numeric: fn(NumericOperand) -> AtomicOp = match key {
        "$set" => return coerce_field(field, operand).map(AtomicOp::Set),
        "$inc" => AtomicOp::Inc,
        "$dec" => AtomicOp::Dec,
        "$mul" => AtomicOp::Mul,
        "$max" => AtomicOp::Max,
        "$min" => AtomicOp::Min,
        other => {
            return Err(ServiceError::validation(format!(
                "unknown operator `{other}` on field `{}`",
                field.name
            )));
        }
    };
    numeric_operand(field, key, operand).map(numeric)
}

/// Checks the field is numeric and coerces the operand to its type.
fn numeric_operand(
    field: &FieldDef,
    key: &str,
    operand: &Value,
) -> Result<NumericOperand, ServiceError> {
    let mismatch = || {
        ServiceError::validation(format!(
            "{key} on {} field `{}` expects a {} operand, got {}",
            field.field_type.as_str(),
            field.name,
            field.field_type.as_str(),
            json_kind(operand)
        ))
    };
    match field.field_type {
        FieldType::Integer => integer_from_json(operand).map(NumericOperand::Integer).ok_or_else(mismatch),
        FieldType::Float => operand
            .as_f64()
            .filter(|value| value.is_finite())
            .map(NumericOperand::Float)
            .ok_or_else(mismatch),
        FieldType::String | FieldType::Boolean | FieldType::Json => {
            Err(ServiceError::validation(format!(
                "{key} requires a numeric field but `{}` is {}",
                field.name,
                field.field_type.as_str()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    //! Operator parsing checks.
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use serde_json::json;

    use super::AtomicOp;
    use super::NumericOperand;
    use super::parse_operations;
    use crate::core::identifiers::PluginId;
    use crate::core::identifiers::TableName;
    use crate::core::schema::FieldDef;
    use crate::core::schema::FieldType;
    use crate::core::schema::TableSchema;
    use crate::core::value::CellValue;

    fn schema() -> TableSchema {
        TableSchema::new(
            PluginId::parse("quotes-plugin").unwrap(),
            TableName::parse("quotes").unwrap(),
            vec![
                FieldDef::new("text", FieldType::String).required(),
                FieldDef::new("score", FieldType::Integer),
                FieldDef::new("ratio", FieldType::Float),
            ],
        )
        .unwrap()
    }

    #[test]
    fn parses_numeric_and_set_ops() {
        let ops = parse_operations(
            &schema(),
            &json!({"score": {"$inc": 5}, "ratio": {"$mul": 1.5}, "text": {"$set": "x"}}),
        )
        .unwrap();
        assert_eq!(ops.len(), 3);
        assert!(ops.iter().any(|op| op.op == AtomicOp::Inc(NumericOperand::Integer(5))));
        assert!(ops.iter().any(|op| op.op == AtomicOp::Mul(NumericOperand::Float(1.5))));
        assert!(ops.iter().any(|op| op.op == AtomicOp::Set(CellValue::Text("x".to_string()))));
    }

    #[test]
    fn rejects_numeric_op_on_string() {
        let err = parse_operations(&schema(), &json!({"text": {"$mul": 2}})).unwrap_err();
        assert!(err.message().contains("numeric"));
    }

    #[test]
    fn rejects_fractional_operand_on_integer() {
        assert!(parse_operations(&schema(), &json!({"score": {"$inc": 0.5}})).is_err());
    }

    #[test]
    fn rejects_multiple_operators_per_field() {
        assert!(parse_operations(&schema(), &json!({"score": {"$inc": 1, "$max": 3}})).is_err());
    }

    #[test]
    fn rejects_reserved_and_unknown_fields() {
        assert!(parse_operations(&schema(), &json!({"id": {"$set": 4}})).is_err());
        assert!(parse_operations(&schema(), &json!({"nope": {"$inc": 1}})).is_err());
        assert!(parse_operations(&schema(), &json!({"score": {"$pow": 2}})).is_err());
    }

    #[test]
    fn set_enforces_required() {
        assert!(parse_operations(&schema(), &json!({"text": {"$set": null}})).is_err());
    }
}
