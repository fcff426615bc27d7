//! Adapter traits and the client call surface.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::RpcError;
use crate::routes::{RouteInvoker, RpcRoutes};
use crate::types::RpcPayload;

/// A transport-specific server binding.
///
/// `on` receives the dispatcher and returns whatever the transport needs to
/// be mounted: an `axum::Router` for HTTP, a running dispatcher handle for
/// port transports. The output is an adapter-specific escape hatch, not part
/// of the invocation protocol.
pub trait RpcServerAdapter {
    type Output;

    fn on(self, invoker: RouteInvoker) -> Self::Output;
}

/// A transport-specific client binding.
///
/// Implementations must normalize every failure path into [`RpcError`]
/// before returning, so callers see the same error shape regardless of
/// transport.
#[async_trait]
pub trait RpcClientAdapter: Send + Sync {
    async fn send(&self, data: RpcPayload) -> Result<Value, RpcError>;
}

/// Bind a route table to a server adapter.
pub fn expose_rpc<A: RpcServerAdapter>(routes: RpcRoutes, adapter: A) -> A::Output {
    adapter.on(RouteInvoker::new(routes))
}

/// Client call surface over any [`RpcClientAdapter`].
///
/// Lookup is fully dynamic — any string is a valid candidate path; the wire
/// protocol carries the name as-is and unknown routes come back as
/// `"invalid path"` errors from the remote dispatcher.
pub struct RpcClient<A> {
    adapter: A,
}

impl<A: RpcClientAdapter> RpcClient<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    /// Invoke a route and return the raw JSON result.
    pub async fn call_value(&self, path: &str, args: Vec<Value>) -> Result<Value, RpcError> {
        self.adapter.send(RpcPayload::new(path, args)).await
    }

    /// Invoke a route and deserialize the result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        path: &str,
        args: Vec<Value>,
    ) -> Result<T, RpcError> {
        let value = self.call_value(path, args).await?;
        serde_json::from_value(value)
            .map_err(|err| RpcError::new(format!("invalid response payload: {err}")))
    }
}
