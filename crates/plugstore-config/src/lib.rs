// crates/plugstore-config/src/lib.rs
// ============================================================================
// Module: Plugstore Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for plugstore.toml semantics.
// Dependencies: plugstore-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `plugstore-config` defines the configuration model for the storage
//! service. Loading is strict and fails closed: unknown keys, oversized files,
//! and out-of-range limits are rejected before the service starts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
