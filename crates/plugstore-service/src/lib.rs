// crates/plugstore-service/src/lib.rs
// ============================================================================
// Module: Plugstore Service Library
// Description: Transport adapter for the plugin row-storage service.
// Purpose: Bind the storage operations to a request/reply message bus.
// Dependencies: crate::{bus, gateway, router, service, subject}
// ============================================================================

//! ## Overview
//! Requests arrive on subjects of the form `{namespace}.{plugin}.{operation}`
//! with a JSON payload and are answered with a JSON envelope. The crate
//! provides the subject grammar, an in-process bus, the operation router,
//! the panic-isolating service loop, and an optional HTTP gateway.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bus;
pub mod gateway;
pub mod router;
pub mod service;
pub mod subject;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bus::BusError;
pub use bus::BusRequest;
pub use bus::BusSubscription;
pub use bus::DEFAULT_CHANNEL_CAPACITY;
pub use bus::InProcessBus;
pub use bus::MessageBus;
pub use bus::ReplyTo;
pub use gateway::GatewayState;
pub use gateway::gateway_router;
pub use gateway::serve_gateway;
pub use router::StorageRouter;
pub use service::ServiceInitError;
pub use service::StorageService;
pub use subject::Operation;
pub use subject::Subject;
