// crates/plugstore-core/src/lib.rs
// ============================================================================
// Module: Plugstore Core Library
// Description: Public API surface for the Plugstore core.
// Purpose: Expose schema, filter, atomic-operator, envelope, and interface types.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Plugstore core holds the backend-agnostic half of the plugin row-storage
//! service: table schemas, value coercion, the filter grammar, atomic
//! operators, request plans, the error taxonomy, and the response envelope.
//! Storage backends plug in through [`interfaces::SchemaRegistry`] and
//! [`interfaces::RowStore`]. Every request is validated into a typed plan here
//! before any backend is touched.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::RegisterOutcome;
pub use interfaces::RowData;
pub use interfaces::RowStore;
pub use interfaces::SchemaRegistry;
pub use interfaces::SharedRowStore;
pub use interfaces::SharedSchemaRegistry;
pub use interfaces::StoreError;
