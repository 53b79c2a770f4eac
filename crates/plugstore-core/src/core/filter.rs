// crates/plugstore-core/src/core/filter.rs
// ============================================================================
// Module: Filter Grammar
// Description: Typed filter trees, sort specs, and search query assembly.
// Purpose: Validate the JSON filter grammar against a schema before storage.
// Dependencies: crate::core::{error, schema, value}, serde, serde_json
// ============================================================================

//! ## Overview
//! The filter grammar is a small JSON language:
//! - top-level keys are AND-ed,
//! - `$or: [obj, ...]` is a disjunction of implicit-AND objects,
//! - a leaf is `{field: {op: operand}}` with `op` one of
//!   `$eq $ne $gt $gte $lt $lte $like $in`; several operators on one field are
//!   AND-ed, and a bare non-object value is shorthand for `$eq`.
//!
//! Targets are the declared fields plus `id`. Every operand is coerced to the
//! field type, so a parsed [`FilterNode`] is safe to compile without further
//! checks. Unknown fields and operators are rejected before storage.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::error::ServiceError;
use crate::core::schema::FieldType;
use crate::core::schema::TableSchema;
use crate::core::value::CellValue;
use crate::core::value::coerce_as;
use crate::core::value::integer_from_json;
use crate::core::value::json_kind;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum nesting depth of `$or` groups.
pub const MAX_FILTER_DEPTH: usize = 8;
/// Maximum number of leaf predicates in one filter.
pub const MAX_FILTER_PREDICATES: usize = 128;
/// Maximum number of operands in one `$in` list.
pub const MAX_IN_OPERANDS: usize = 1_000;

// ============================================================================
// SECTION: Filter Types
// ============================================================================

/// Comparison operator of a leaf predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    /// Equality (`IS NULL` for a null operand).
    Eq,
    /// Inequality (`IS NOT NULL` for a null operand).
    Ne,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// SQL `LIKE` pattern match.
    Like,
    /// Set membership.
    In,
}

impl ComparisonOp {
    /// Parses an operator key such as `$gte`.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "$eq" => Some(Self::Eq),
            "$ne" => Some(Self::Ne),
            "$gt" => Some(Self::Gt),
            "$gte" => Some(Self::Gte),
            "$lt" => Some(Self::Lt),
            "$lte" => Some(Self::Lte),
            "$like" => Some(Self::Like),
            "$in" => Some(Self::In),
            _ => None,
        }
    }

    /// Returns the operator key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::Like => "$like",
            Self::In => "$in",
        }
    }
}

/// Coerced operand of a leaf predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Single value.
    Single(CellValue),
    /// Value list for `$in`.
    List(Vec<CellValue>),
}

/// Validated filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// Single predicate on one column.
    Leaf {
        /// Column name (`id` or a declared field).
        field: String,
        /// Comparison operator.
        op: ComparisonOp,
        /// Coerced operand.
        operand: Operand,
    },
    /// Conjunction of sub-expressions.
    And(Vec<FilterNode>),
    /// Disjunction of sub-expressions.
    Or(Vec<FilterNode>),
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// Sort clause of a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortSpec {
    /// Column to sort by (declared field or system column).
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub order: SortOrder,
}

/// Validated search request ready for a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Optional filter tree; `None` matches every row.
    pub filter: Option<FilterNode>,
    /// Optional sort clause; `None` keeps storage order by `id`.
    pub sort: Option<SortSpec>,
    /// Row cap, already clamped to the service maximum.
    pub limit: usize,
}

// ============================================================================
// SECTION: Search Assembly
// ============================================================================

/// Builds a validated search query from raw request parts.
///
/// A missing `limit` uses `max_rows`; larger limits are clamped to it.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] when the filter, sort, or limit is
/// malformed.
pub fn build_search(
    schema: &TableSchema,
    filters: Option<&Value>,
    sort: Option<&Value>,
    limit: Option<&Value>,
    max_rows: usize,
) -> Result<SearchQuery, ServiceError> {
    let filter = match filters {
        Some(value) => parse_filter(schema, value)?,
        None => None,
    };
    let sort = match sort {
        None | Some(Value::Null) => None,
        Some(value) => Some(parse_sort(schema, value)?),
    };
    let limit = match limit {
        None | Some(Value::Null) => max_rows,
        Some(value) => {
            let requested = integer_from_json(value)
                .ok_or_else(|| ServiceError::validation("limit must be an integer"))?;
            if requested < 1 {
                return Err(ServiceError::validation("limit must be at least 1"));
            }
            usize::try_from(requested).map_or(max_rows, |requested| requested.min(max_rows))
        }
    };
    Ok(SearchQuery {
        filter,
        sort,
        limit,
    })
}

/// Parses a filter object into a validated tree.
///
/// Returns `Ok(None)` for `null` or an empty object.
///
/// # Errors
///
/// Returns [`ServiceError::Validation`] on unknown fields, unknown operators,
/// or operands that do not fit the field type.
pub fn parse_filter(schema: &TableSchema, filters: &Value) -> Result<Option<FilterNode>, ServiceError> {
    let map = match filters {
        Value::Null => return Ok(None),
        Value::Object(map) => map,
        other => {
            return Err(ServiceError::validation(format!(
                "filters must be an object, got {}",
                json_kind(other)
            )));
        }
    };
    if map.is_empty() {
        return Ok(None);
    }
    let mut parser = FilterParser {
        schema,
        predicates: 0,
    };
    parser.parse_object(map, 0).map(Some)
}

/// Parses a sort clause and checks the column exists.
fn parse_sort(schema: &TableSchema, value: &Value) -> Result<SortSpec, ServiceError> {
    let sort: SortSpec = serde_json::from_value(value.clone())
        .map_err(|err| ServiceError::validation(format!("invalid sort: {err}")))?;
    if schema.column(&sort.field).is_none() {
        return Err(ServiceError::validation(format!("unknown sort field `{}`", sort.field)));
    }
    Ok(sort)
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Recursive filter parser with a predicate limit.
struct FilterParser<'a> {
    /// Schema used to resolve and type fields.
    schema: &'a TableSchema,
    /// Number of leaf predicates produced so far.
    predicates: usize,
}

impl FilterParser<'_> {
    /// Parses an implicit-AND object.
    fn parse_object(&mut self, map: &Map<String, Value>, depth: usize) -> Result<FilterNode, ServiceError> {
        if depth > MAX_FILTER_DEPTH {
            return Err(ServiceError::validation(format!(
                "filter nesting exceeds depth {MAX_FILTER_DEPTH}"
            )));
        }
        let mut clauses = Vec::with_capacity(map.len());
        for (key, value) in map {
            if key == "$or" {
                clauses.push(self.parse_or(value, depth)?);
            } else if key.starts_with('$') {
                return Err(ServiceError::validation(format!(
                    "unknown filter operator `{key}` at group level"
                )));
            } else {
                clauses.push(self.parse_field(key, value)?);
            }
        }
        Ok(collapse_and(clauses))
    }

    /// Parses a `$or` list.
    fn parse_or(&mut self, value: &Value, depth: usize) -> Result<FilterNode, ServiceError> {
        let Value::Array(branches) = value else {
            return Err(ServiceError::validation("$or expects a list of filter objects"));
        };
        if branches.is_empty() {
            return Err(ServiceError::validation("$or must contain at least one filter object"));
        }
        let mut nodes = Vec::with_capacity(branches.len());
        for branch in branches {
            let Value::Object(map) = branch else {
                return Err(ServiceError::validation("$or entries must be filter objects"));
            };
            if map.is_empty() {
                return Err(ServiceError::validation("$or entries must not be empty"));
            }
            nodes.push(self.parse_object(map, depth + 1)?);
        }
        Ok(FilterNode::Or(nodes))
    }

    /// Parses all predicates attached to one field.
    fn parse_field(&mut self, name: &str, value: &Value) -> Result<FilterNode, ServiceError> {
        let field_type = self.target_type(name)?;
        let Value::Object(ops) = value else {
            return self.leaf(name, field_type, ComparisonOp::Eq, value);
        };
        if ops.is_empty() {
            return Err(ServiceError::validation(format!(
                "filter for field `{name}` must name an operator"
            )));
        }
        let mut leaves = Vec::with_capacity(ops.len());
        for (key, operand) in ops {
            let op = ComparisonOp::parse(key).ok_or_else(|| {
                ServiceError::validation(format!("unknown filter operator `{key}` on field `{name}`"))
            })?;
            leaves.push(self.leaf(name, field_type, op, operand)?);
        }
        Ok(collapse_and(leaves))
    }

    /// Resolves the type of a filter target.
    fn target_type(&self, name: &str) -> Result<FieldType, ServiceError> {
        if name == "id" {
            return Ok(FieldType::Integer);
        }
        self.schema.field(name).map(|field| field.field_type).ok_or_else(|| {
            ServiceError::validation(format!(
                "unknown filter field `{name}` for table `{}`",
                self.schema.table_name
            ))
        })
    }

    /// Builds one leaf predicate with a coerced operand.
    fn leaf(
        &mut self,
        name: &str,
        field_type: FieldType,
        op: ComparisonOp,
        operand: &Value,
    ) -> Result<FilterNode, ServiceError> {
        self.predicates += 1;
        if self.predicates > MAX_FILTER_PREDICATES {
            return Err(ServiceError::validation(format!(
                "filter exceeds {MAX_FILTER_PREDICATES} predicates"
            )));
        }
        let operand = match op {
            ComparisonOp::In => Operand::List(in_operands(name, field_type, operand)?),
            ComparisonOp::Like => {
                if !matches!(field_type, FieldType::String | FieldType::Json) {
                    return Err(ServiceError::validation(format!(
                        "$like is not supported on {} field `{name}`",
                        field_type.as_str()
                    )));
                }
                let pattern = operand.as_str().ok_or_else(|| {
                    ServiceError::validation(format!("$like on `{name}` expects a string pattern"))
                })?;
                Operand::Single(CellValue::Text(pattern.to_string()))
            }
            ComparisonOp::Eq | ComparisonOp::Ne if operand.is_null() => {
                Operand::Single(CellValue::Null)
            }
            _ => {
                if operand.is_null() {
                    return Err(ServiceError::validation(format!(
                        "{} on `{name}` does not accept null",
                        op.as_str()
                    )));
                }
                Operand::Single(coerce_as(name, field_type, operand)?)
            }
        };
        Ok(FilterNode::Leaf {
            field: name.to_string(),
            op,
            operand,
        })
    }
}

/// Coerces the operand list of `$in`.
fn in_operands(name: &str, field_type: FieldType, operand: &Value) -> Result<Vec<CellValue>, ServiceError> {
    let Value::Array(items) = operand else {
        return Err(ServiceError::validation(format!("$in on `{name}` expects a list")));
    };
    if items.len() > MAX_IN_OPERANDS {
        return Err(ServiceError::validation(format!(
            "$in on `{name}` exceeds {MAX_IN_OPERANDS} operands"
        )));
    }
    items
        .iter()
        .map(|item| {
            if item.is_null() {
                return Err(ServiceError::validation(format!("$in on `{name}` does not accept null")));
            }
            coerce_as(name, field_type, item)
        })
        .collect()
}

/// Collapses a clause list into a single node.
fn collapse_and(mut clauses: Vec<FilterNode>) -> FilterNode {
    if clauses.len() == 1 {
        if let Some(node) = clauses.pop() {
            return node;
        }
    }
    FilterNode::And(clauses)
}
