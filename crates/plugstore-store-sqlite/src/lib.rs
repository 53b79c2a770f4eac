// crates/plugstore-store-sqlite/src/lib.rs
// ============================================================================
// Module: Plugstore SQLite Store
// Description: SQLite implementations of the Plugstore storage interfaces.
// Purpose: Provide the durable backend used by the storage service.
// Dependencies: plugstore-core, rusqlite
// ============================================================================

//! ## Overview
//! [`SqliteDatabase`] owns the connection; [`SqliteSchemaRegistry`] and
//! [`SqliteRowStore`] share it and implement the core storage traits.

pub mod registry;
pub mod rows;
mod sql;
pub mod store;

pub use registry::SqliteSchemaRegistry;
pub use rows::SqliteRowStore;
pub use store::DEFAULT_BUSY_TIMEOUT_MS;
pub use store::SqliteDatabase;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
