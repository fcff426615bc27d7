//! Injectable JSON codec.
//!
//! The HTTP adapters never assume native JSON: they call `parse`/`stringify`
//! on a codec, so a JSON-superset encoding (dates, big integers, shared
//! references) can be substituted without touching protocol logic.

use serde_json::Value;

use crate::error::RpcError;

pub trait JsonCodec: Send + Sync {
    fn parse(&self, text: &str) -> Result<Value, RpcError>;
    fn stringify(&self, value: &Value) -> Result<String, RpcError>;
}

/// Plain serde_json encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultJson;

impl JsonCodec for DefaultJson {
    fn parse(&self, text: &str) -> Result<Value, RpcError> {
        serde_json::from_str(text)
            .map_err(|err| RpcError::from_error(&err).set_status(400))
    }

    fn stringify(&self, value: &Value) -> Result<String, RpcError> {
        serde_json::to_string(value).map_err(|err| RpcError::from_error(&err))
    }
}
