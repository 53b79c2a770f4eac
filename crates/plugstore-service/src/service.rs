// crates/plugstore-service/src/service.rs
// ============================================================================
// Module: Storage Service
// Description: Bus-facing request loop with panic isolation.
// Purpose: Turn raw bus messages into reply envelopes without ever crashing.
// Dependencies: plugstore-config, plugstore-core, plugstore-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! [`StorageService`] owns the request lifecycle: subject parsing, payload
//! decoding, dispatch on an isolated task, logging, and envelope encoding.
//! Each bus message is served on its own task, so a slow request never
//! blocks the loop and a panicking handler only fails its own request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use plugstore_config::PlugstoreConfig;
use plugstore_core::Envelope;
use plugstore_core::ErrorCode;
use plugstore_core::ServiceError;
use plugstore_store_sqlite::SqliteDatabase;
use plugstore_store_sqlite::SqliteRowStore;
use plugstore_store_sqlite::SqliteSchemaRegistry;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::bus::BusSubscription;
use crate::router::StorageRouter;
use crate::subject::Subject;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failures while bringing the service up.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// The backing store could not be opened.
    #[error("store initialization failed: {0}")]
    Store(String),
    /// The HTTP gateway could not bind or stopped with an error.
    #[error("gateway failed: {0}")]
    Gateway(String),
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Storage service bound to one subject namespace.
#[derive(Clone)]
pub struct StorageService {
    /// Subject prefix, e.g. `db`.
    namespace: Arc<str>,
    /// Operation router.
    router: StorageRouter,
}

impl StorageService {
    /// Creates a service over an existing router.
    #[must_use]
    pub fn new(namespace: &str, router: StorageRouter) -> Self {
        Self {
            namespace: Arc::from(namespace),
            router,
        }
    }

    /// Opens the `SQLite` stores named by the config and builds a service.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceInitError::Store`] when the database cannot be opened
    /// or its stored schemas cannot be loaded.
    pub fn open(config: &PlugstoreConfig) -> Result<Self, ServiceInitError> {
        let store_config = config.store.sqlite_config();
        let db = SqliteDatabase::open(&store_config)
            .map_err(|err| ServiceInitError::Store(err.to_string()))?;
        let registry = SqliteSchemaRegistry::new(db.clone())
            .map_err(|err| ServiceInitError::Store(err.to_string()))?;
        info!(
            path = %db.path().display(),
            namespace = %config.bus.namespace,
            max_rows = config.search.max_rows,
            "storage opened"
        );
        let rows = SqliteRowStore::new(db);
        let router = StorageRouter::new(Arc::new(registry), Arc::new(rows), config.search.max_rows);
        Ok(Self::new(&config.bus.namespace, router))
    }

    /// Returns the subject namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the operation router.
    #[must_use]
    pub const fn router(&self) -> &StorageRouter {
        &self.router
    }

    /// Handles one raw request and always produces an envelope.
    pub async fn handle(&self, subject: &str, payload: &[u8]) -> Envelope {
        let parsed = match Subject::parse(&self.namespace, subject) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(subject, error = %err, "rejected malformed subject");
                return Envelope::failure(&err);
            }
        };
        let plugin = parsed.plugin.as_str();
        let operation = parsed.operation.as_str();
        debug!(subject, plugin, operation, bytes = payload.len(), "request received");

        let payload: Value = match serde_json::from_slice(payload) {
            Ok(payload) => payload,
            Err(err) => {
                let err = ServiceError::InvalidJson(err.to_string());
                debug!(subject, plugin, operation, error = %err, "request rejected");
                return Envelope::failure(&err);
            }
        };

        let router = self.router.clone();
        let task_subject = parsed.clone();
        let handler = tokio::spawn(async move { router.dispatch(&task_subject, payload).await });
        let result = match handler.await {
            Ok(result) => result,
            Err(join) if join.is_panic() => {
                Err(ServiceError::Internal("request handler panicked".to_string()))
            }
            Err(_) => Err(ServiceError::Internal("request handler was cancelled".to_string())),
        };

        match &result {
            Ok(_) => debug!(subject, plugin, operation, "request completed"),
            Err(err) if matches!(err.code(), ErrorCode::DatabaseError | ErrorCode::InternalError) => {
                error!(subject, plugin, operation, code = %err.code(), error = %err, "request failed");
            }
            Err(err) => {
                debug!(subject, plugin, operation, code = %err.code(), error = %err, "request rejected");
            }
        }
        Envelope::from(result)
    }

    /// Serves bus requests until every publisher is dropped.
    pub async fn run(self, mut subscription: BusSubscription) {
        info!(namespace = %self.namespace, "storage service listening");
        while let Some(request) = subscription.recv().await {
            let service = self.clone();
            tokio::spawn(async move {
                let (subject, payload, reply) = request.into_parts();
                let envelope = service.handle(&subject, &payload).await;
                if reply.is_expected() && !reply.send(envelope.to_bytes()) {
                    debug!(subject = %subject, "requester left before the reply");
                }
            });
        }
        info!(namespace = %self.namespace, "storage service stopped");
    }
}
