//! Protocol types shared by every adapter.
//!
//! These are defined standalone (not tied to axum or any HTTP framework)
//! so they can be serialized in any transport context.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RpcError;

/// The unit of a single call, transport-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcPayload {
    /// Route name, e.g. `"getCounter"`.
    pub path: String,
    /// Positional arguments, JSON-encoded.
    pub args: Vec<Value>,
}

impl RpcPayload {
    pub fn new(path: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }
}

/// The `{ok, value}` outcome envelope.
///
/// `value` is the route's return value when `ok`, and a serialized
/// [`RpcError`] otherwise. The same shape travels as the HTTP response body
/// and as the `result` field of a port response frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResult {
    pub ok: bool,
    pub value: Value,
}

impl RpcResult {
    pub fn ok(value: Value) -> Self {
        Self { ok: true, value }
    }

    pub fn err(error: &RpcError) -> Self {
        Self {
            ok: false,
            value: error.serialize(),
        }
    }

    /// Unwrap the envelope, reconstructing the error arm.
    pub fn into_result(self) -> Result<Value, RpcError> {
        if self.ok {
            Ok(self.value)
        } else {
            Err(RpcError::from_unknown(self.value))
        }
    }
}

/// A request frame on a duplex port: correlation ID plus payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: String,
    pub data: RpcPayload,
}

/// A response frame on a duplex port, matched to its request by `id`.
/// Responses may arrive in any order relative to requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: String,
    pub result: RpcResult,
}

/// Explicit per-call context.
///
/// Replaces ambient (task-local) context: adapters build one per call — the
/// HTTP adapter from request headers, port adapters from a per-connection
/// context attached at registration — and the dispatcher threads it into
/// every route invocation. Routes that need caller identity read it here.
#[derive(Debug, Clone, Default)]
pub struct RpcContext {
    metadata: HashMap<String, String>,
}

impl RpcContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_envelope_round_trips_errors() {
        let err = RpcError::new("nope").set_status(400);
        let envelope = RpcResult::err(&err);
        assert!(!envelope.ok);

        let back = envelope.into_result().unwrap_err();
        assert_eq!(back.message, "nope");
        assert_eq!(back.status, 400);
    }

    #[test]
    fn request_envelope_wire_shape() {
        let req = RequestEnvelope {
            id: "abc".into(),
            data: RpcPayload::new("sum", vec![json!(1), json!(2)]),
        };
        let wire = serde_json::to_value(&req).unwrap();
        assert_eq!(
            wire,
            json!({"id": "abc", "data": {"path": "sum", "args": [1, 2]}})
        );
    }
}
