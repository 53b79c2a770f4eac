// crates/plugstore-core/src/core/mod.rs
// ============================================================================
// Module: Plugstore Core Types
// Description: Canonical schema, request, and response structures.
// Purpose: Provide stable, typed building blocks for every storage operation.
// Dependencies: serde, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! Core types are the single source of truth for what a plugin may store and
//! how it may query it. Loosely shaped JSON requests are parsed into the sum
//! types defined here ([`FieldType`], [`FilterNode`], [`AtomicOp`]) so that
//! backends match exhaustively instead of probing maps at runtime.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod atomic;
pub mod envelope;
pub mod error;
pub mod filter;
pub mod identifiers;
pub mod plan;
pub mod schema;
pub mod time;
pub mod value;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use atomic::AtomicOp;
pub use atomic::FieldOperation;
pub use atomic::NumericOperand;
pub use atomic::parse_operations;
pub use envelope::Envelope;
pub use error::ErrorCode;
pub use error::ServiceError;
pub use filter::ComparisonOp;
pub use filter::FilterNode;
pub use filter::Operand;
pub use filter::SearchQuery;
pub use filter::SortOrder;
pub use filter::SortSpec;
pub use filter::build_search;
pub use filter::parse_filter;
pub use identifiers::PluginId;
pub use identifiers::RowId;
pub use identifiers::TableName;
pub use plan::FieldAssignment;
pub use plan::InsertPlan;
pub use plan::UpdatePlan;
pub use plan::plan_insert;
pub use plan::plan_update;
pub use schema::Column;
pub use schema::FieldDef;
pub use schema::FieldType;
pub use schema::RESERVED_FIELDS;
pub use schema::TableSchema;
pub use value::CellValue;
