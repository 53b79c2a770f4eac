// crates/plugstore-service/tests/gateway_http.rs
// ============================================================================
// Module: HTTP Gateway Tests
// Description: Handler-level tests for the bus bridge and health check.
// Purpose: Validate forwarding, timeouts, delivery failures, and readiness.
// ============================================================================

//! ## Overview
//! Calls the gateway handlers directly with axum extractors, so no socket is
//! bound. A real storage service answers on the in-process bus.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use plugstore_config::PlugstoreConfig;
use plugstore_core::FieldAssignment;
use plugstore_core::FieldOperation;
use plugstore_core::InsertPlan;
use plugstore_core::RowData;
use plugstore_core::RowId;
use plugstore_core::RowStore;
use plugstore_core::SearchQuery;
use plugstore_core::StoreError;
use plugstore_core::TableSchema;
use plugstore_service::BusError;
use plugstore_service::GatewayState;
use plugstore_service::InProcessBus;
use plugstore_service::MessageBus;
use plugstore_service::StorageService;
use plugstore_service::gateway::handle_bus;
use plugstore_service::gateway::handle_health;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Bus that accepts requests and never answers.
struct SilentBus;

#[async_trait]
impl MessageBus for SilentBus {
    async fn request(&self, _subject: &str, _payload: Vec<u8>) -> Result<Vec<u8>, BusError> {
        std::future::pending().await
    }

    async fn publish(&self, _subject: &str, _payload: Vec<u8>) -> Result<(), BusError> {
        Ok(())
    }
}

fn open_service(dir: &TempDir) -> StorageService {
    let mut config = PlugstoreConfig::default();
    config.store.path = dir.path().join("gateway.db");
    StorageService::open(&config).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post(state: &GatewayState, subject: &str, payload: &Value) -> (StatusCode, Value) {
    let body = Bytes::from(serde_json::to_vec(payload).unwrap());
    let response = handle_bus(State(state.clone()), Path(subject.to_string()), body).await;
    let status = response.status();
    (status, body_json(response).await)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread")]
async fn gateway_forwards_requests_and_returns_envelopes() {
    let dir = TempDir::new().unwrap();
    let service = open_service(&dir);
    let rows = Arc::clone(service.router().rows());
    let (bus, subscription) = InProcessBus::channel();
    let server = tokio::spawn(service.run(subscription));
    let state = GatewayState::new(Arc::new(bus), rows, Duration::from_secs(5));

    let register = json!({
        "table": "notes",
        "schema": {"fields": [{"name": "body", "type": "string", "required": true}]}
    });
    let (status, reply) = post(&state, "db.web.schema.register", &register).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, json!({"success": true}));

    let insert = json!({"table": "notes", "data": {"body": "hello"}});
    let (_, reply) = post(&state, "db.web.insert", &insert).await;
    assert_eq!(reply, json!({"success": true, "id": 1}));

    let (status, reply) = post(&state, "db.web.select", &json!({"table": "notes"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["error"]["code"], json!("MISSING_FIELD"));

    drop(state);
    server.await.unwrap();
}

#[tokio::test]
async fn gateway_times_out_silent_buses() {
    let dir = TempDir::new().unwrap();
    let service = open_service(&dir);
    let rows = Arc::clone(service.router().rows());
    let state = GatewayState::new(Arc::new(SilentBus), rows, Duration::from_millis(50));

    let (status, reply) = post(&state, "db.web.select", &json!({})).await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(reply["success"], json!(false));
    assert_eq!(reply["error"]["code"], json!("INTERNAL_ERROR"));
}

#[tokio::test]
async fn gateway_reports_closed_bus_as_unavailable() {
    let dir = TempDir::new().unwrap();
    let service = open_service(&dir);
    let rows = Arc::clone(service.router().rows());
    let (bus, subscription) = InProcessBus::channel();
    drop(subscription);
    let state = GatewayState::new(Arc::new(bus), rows, Duration::from_secs(1));

    let (status, reply) = post(&state, "db.web.select", &json!({})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(reply["error"]["code"], json!("INTERNAL_ERROR"));
}

#[tokio::test]
async fn health_reports_store_readiness() {
    let dir = TempDir::new().unwrap();
    let service = open_service(&dir);
    let rows = Arc::clone(service.router().rows());
    let state = GatewayState::new(Arc::new(SilentBus), rows, Duration::from_secs(1));

    let response = handle_health(State(state)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn health_reports_unready_stores() {
    /// Store that is never ready.
    struct Unready;

    impl RowStore for Unready {
        fn insert(
            &self,
            _schema: &TableSchema,
            _plan: &InsertPlan,
        ) -> Result<RowId, StoreError> {
            Err(StoreError::Db("offline".to_string()))
        }

        fn select(
            &self,
            _schema: &TableSchema,
            _id: RowId,
        ) -> Result<Option<RowData>, StoreError> {
            Err(StoreError::Db("offline".to_string()))
        }

        fn update_fields(
            &self,
            _schema: &TableSchema,
            _id: RowId,
            _assignments: &[FieldAssignment],
        ) -> Result<bool, StoreError> {
            Err(StoreError::Db("offline".to_string()))
        }

        fn apply_operations(
            &self,
            _schema: &TableSchema,
            _id: RowId,
            _operations: &[FieldOperation],
        ) -> Result<bool, StoreError> {
            Err(StoreError::Db("offline".to_string()))
        }

        fn delete(
            &self,
            _schema: &TableSchema,
            _id: RowId,
        ) -> Result<bool, StoreError> {
            Err(StoreError::Db("offline".to_string()))
        }

        fn search(
            &self,
            _schema: &TableSchema,
            _query: &SearchQuery,
        ) -> Result<Vec<RowData>, StoreError> {
            Err(StoreError::Db("offline".to_string()))
        }

        fn readiness(&self) -> Result<(), StoreError> {
            Err(StoreError::Db("offline".to_string()))
        }
    }

    let state = GatewayState::new(Arc::new(SilentBus), Arc::new(Unready), Duration::from_secs(1));
    let response = handle_health(State(state)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!("unavailable"));
    assert!(body["error"].as_str().unwrap().contains("offline"));
}
