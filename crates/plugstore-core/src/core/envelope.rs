// crates/plugstore-core/src/core/envelope.rs
// ============================================================================
// Module: Response Envelope
// Description: Uniform success/error wrapper for every reply.
// Purpose: Shape all service responses identically.
// Dependencies: crate::core::error, serde, serde_json
// ============================================================================

//! ## Overview
//! Replies are flat JSON objects: `{success:true, ...fields}` on success and
//! `{success:false, error:{code, message}}` on failure. The envelope is built
//! incrementally so handlers only add their operation-specific fields.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::core::error::ServiceError;

/// Fallback bytes used when a reply cannot be serialized.
const SERIALIZATION_FALLBACK: &[u8] = br#"{"success":false,"error":{"code":"INTERNAL_ERROR","message":"response serialization failed"}}"#;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Response envelope sent on the reply channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    /// Starts a successful envelope.
    #[must_use]
    pub fn success() -> Self {
        let mut map = Map::new();
        map.insert("success".to_string(), Value::Bool(true));
        Self(map)
    }

    /// Builds a failure envelope from a service error.
    #[must_use]
    pub fn failure(error: &ServiceError) -> Self {
        let mut map = Map::new();
        map.insert("success".to_string(), Value::Bool(false));
        map.insert(
            "error".to_string(),
            json!({
                "code": error.code().as_str(),
                "message": error.message(),
            }),
        );
        Self(map)
    }

    /// Adds a field to the envelope.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Converts the envelope into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Serializes the envelope into reply bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.0).unwrap_or_else(|_| SERIALIZATION_FALLBACK.to_vec())
    }
}

impl From<Result<Self, ServiceError>> for Envelope {
    fn from(result: Result<Self, ServiceError>) -> Self {
        match result {
            Ok(envelope) => envelope,
            Err(error) => Self::failure(&error),
        }
    }
}
