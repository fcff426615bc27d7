//! The RPC error type and its wire serialization.
//!
//! `RpcError` is the only error callers ever see, on either side of a
//! connection. Errors do not cross transport boundaries as Rust values; the
//! throwing side serializes the shape `{message, stack?, cause?, status}`
//! and the receiving side reconstructs it with [`RpcError::from_unknown`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_status() -> u16 {
    500
}

/// Unified RPC error.
///
/// `status` follows HTTP status-code convention on every transport, HTTP or
/// not — it is a generic severity/kind code (400 validation, 405 method
/// mismatch, 500 anything unexpected).
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RpcError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Value>,
    #[serde(default = "default_status")]
    pub status: u16,
}

impl RpcError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
            cause: None,
            status: default_status(),
        }
    }

    /// Attach a structured cause (the unknown path, the offending input, …).
    pub fn with_cause(mut self, cause: Value) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Fluent status setter.
    pub fn set_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// The wire shape: `{message, stack?, cause?, status}` — exactly what
    /// [`RpcError::from_unknown`] knows how to reconstruct.
    pub fn serialize(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({ "message": self.message, "status": self.status })
        })
    }

    /// Reconstruct an error from whatever crossed the transport boundary.
    ///
    /// If `value` is already `RpcError`-shaped (an object with a string
    /// `message`), its `message`/`stack`/`cause`/`status` fields are copied
    /// over, `status` defaulting to 500 when absent. Anything else becomes
    /// an `"unknown"` error carrying the original value as `cause`.
    pub fn from_unknown(value: Value) -> Self {
        if let Some(obj) = value.as_object() {
            if let Some(message) = obj.get("message").and_then(Value::as_str) {
                return Self {
                    message: message.to_string(),
                    stack: obj.get("stack").and_then(Value::as_str).map(str::to_string),
                    cause: obj.get("cause").filter(|c| !c.is_null()).cloned(),
                    status: obj
                        .get("status")
                        .and_then(Value::as_u64)
                        .and_then(|s| u16::try_from(s).ok())
                        .unwrap_or_else(default_status),
                };
            }
        }
        Self::new("unknown").with_cause(value)
    }

    /// Normalize a native error, keeping its display text and source chain.
    pub fn from_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut rpc = Self::new(err.to_string());
        if let Some(source) = err.source() {
            rpc.cause = Some(Value::String(source.to_string()));
        }
        rpc
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        Self::from_error(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trip_preserves_message_and_status() {
        let err = RpcError::new("route exploded")
            .with_cause(json!({"input": 42}))
            .set_status(400);

        // through a real JSON string, as any transport would carry it
        let text = serde_json::to_string(&err.serialize()).unwrap();
        let back = RpcError::from_unknown(serde_json::from_str(&text).unwrap());

        assert_eq!(back.message, "route exploded");
        assert_eq!(back.status, 400);
        assert_eq!(back.cause, Some(json!({"input": 42})));
    }

    #[test]
    fn status_defaults_to_500_when_absent() {
        let back = RpcError::from_unknown(json!({"message": "boom"}));
        assert_eq!(back.message, "boom");
        assert_eq!(back.status, 500);
        assert!(back.cause.is_none());
    }

    #[test]
    fn non_error_shapes_become_unknown_with_cause() {
        let back = RpcError::from_unknown(json!(["not", "an", "error"]));
        assert_eq!(back.message, "unknown");
        assert_eq!(back.cause, Some(json!(["not", "an", "error"])));
        assert_eq!(back.status, 500);
    }

    #[test]
    fn from_error_keeps_display_text() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        let rpc = RpcError::from_error(&io);
        assert_eq!(rpc.message, "disk on fire");
        assert_eq!(rpc.status, 500);
    }
}
