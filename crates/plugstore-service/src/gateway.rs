// crates/plugstore-service/src/gateway.rs
// ============================================================================
// Module: HTTP Gateway
// Description: HTTP bridge onto the request/reply bus plus a health check.
// Purpose: Let out-of-process callers reach the storage service.
// Dependencies: axum, plugstore-config, plugstore-core, tokio, tracing
// ============================================================================

//! ## Overview
//! `POST /bus/{subject}` forwards the raw body onto the bus and returns the
//! reply envelope verbatim. The gateway never interprets payloads, so every
//! validation rule stays in the service. Replies that do not arrive within
//! the configured timeout are answered with an `INTERNAL_ERROR` envelope.
//! `GET /healthz` reports store readiness.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use plugstore_config::GatewayConfig;
use plugstore_core::Envelope;
use plugstore_core::ServiceError;
use plugstore_core::SharedRowStore;
use serde_json::json;
use tracing::info;
use tracing::warn;

use crate::bus::BusError;
use crate::bus::MessageBus;
use crate::service::ServiceInitError;

// ============================================================================
// SECTION: State
// ============================================================================

/// Shared state for gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Bus that requests are forwarded onto.
    bus: Arc<dyn MessageBus>,
    /// Store checked by the health endpoint.
    rows: SharedRowStore,
    /// Maximum wait for a reply.
    timeout: Duration,
}

impl GatewayState {
    /// Creates gateway state.
    #[must_use]
    pub fn new(bus: Arc<dyn MessageBus>, rows: SharedRowStore, timeout: Duration) -> Self {
        Self {
            bus,
            rows,
            timeout,
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the gateway routes.
#[must_use]
pub fn gateway_router(state: GatewayState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/bus/{subject}", post(handle_bus))
        .route("/healthz", get(handle_health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// Binds the gateway and serves until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`ServiceInitError::Gateway`] when the listener cannot bind or
/// the server stops with an error.
pub async fn serve_gateway<F>(
    config: &GatewayConfig,
    state: GatewayState,
    shutdown: F,
) -> Result<(), ServiceInitError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|err| ServiceInitError::Gateway(format!("bind {} failed: {err}", config.bind)))?;
    info!(bind = %config.bind, "http gateway listening");
    let app = gateway_router(state, config.max_body_bytes);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|err| ServiceInitError::Gateway(err.to_string()))
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Forwards a request body onto the bus and returns the reply.
pub async fn handle_bus(
    State(state): State<GatewayState>,
    Path(subject): Path<String>,
    body: Bytes,
) -> Response {
    let request = state.bus.request(&subject, body.to_vec());
    match tokio::time::timeout(state.timeout, request).await {
        Ok(Ok(reply)) => (StatusCode::OK, [(CONTENT_TYPE, "application/json")], reply).into_response(),
        Ok(Err(err)) => {
            warn!(subject = %subject, error = %err, "bus delivery failed");
            let status = match err {
                BusError::Closed => StatusCode::SERVICE_UNAVAILABLE,
                BusError::NoReply(_) => StatusCode::BAD_GATEWAY,
            };
            envelope_response(status, &ServiceError::Internal(err.to_string()))
        }
        Err(_) => {
            let millis = state.timeout.as_millis();
            warn!(subject = %subject, timeout_ms = %millis, "bus reply timed out");
            envelope_response(
                StatusCode::GATEWAY_TIMEOUT,
                &ServiceError::Internal(format!("no reply within {millis} ms")),
            )
        }
    }
}

/// Reports whether the store can serve queries.
pub async fn handle_health(State(state): State<GatewayState>) -> Response {
    let rows = Arc::clone(&state.rows);
    let readiness = tokio::task::spawn_blocking(move || rows.readiness())
        .await
        .map_err(|err| err.to_string())
        .and_then(|result| result.map_err(|err| err.to_string()));
    match readiness {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(message) => {
            warn!(error = %message, "store readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "error": message })),
            )
                .into_response()
        }
    }
}

/// Renders a failure envelope with an HTTP status.
fn envelope_response(status: StatusCode, error: &ServiceError) -> Response {
    (status, [(CONTENT_TYPE, "application/json")], Envelope::failure(error).to_bytes()).into_response()
}
