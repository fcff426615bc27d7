//! Portside core — transport-agnostic RPC.
//!
//! This crate defines the pieces of the RPC runtime that are independent of
//! any concrete transport:
//!
//! - [`RpcRoutes`] / [`RouteInvoker`]: the route table and dispatcher
//! - [`RpcError`]: the single error type and its wire serialization
//! - [`MessagePort`]: the uniform duplex interface implemented by WebSocket,
//!   in-process channel pairs, and the SSE emulation
//! - [`PortServerAdapter`] / [`PortClientAdapter`]: request/response
//!   correlation on top of any [`MessagePort`]
//! - [`validated`]: the validate-then-call wrapper for typed route inputs
//!
//! Transport bindings live in `portside-server` (axum) and `portside-client`
//! (reqwest / tungstenite). This crate intentionally has no HTTP dependency
//! so it can back any of them.
//!
//! # Example
//!
//! ```
//! use portside_core::{expose_rpc, RpcClient, RpcRoutes};
//! use portside_core::port::{channel_port_pair, PortClientAdapter, PortServerAdapter};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), portside_core::RpcError> {
//! let routes = RpcRoutes::new().route("hello", |args| async move {
//!     let name = args.first().and_then(|v| v.as_str()).unwrap_or("world");
//!     Ok(json!(format!("hello {name}")))
//! });
//!
//! let (server_port, client_port) = channel_port_pair();
//! let _handle = expose_rpc(routes, PortServerAdapter::new(server_port));
//!
//! let client = RpcClient::new(PortClientAdapter::new(client_port));
//! let greeting: String = client.call("hello", vec![json!("port")]).await?;
//! assert_eq!(greeting, "hello port");
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod error;
pub mod json;
pub mod port;
pub mod routes;
pub mod types;
pub mod validate;

pub use adapter::{expose_rpc, RpcClient, RpcClientAdapter, RpcServerAdapter};
pub use error::RpcError;
pub use json::{DefaultJson, JsonCodec};
pub use port::{
    MessagePort, PortClientAdapter, PortEvent, PortServerAdapter, PortServerHandle,
    PortSubscription,
};
pub use routes::{RouteInvoker, RpcRoutes};
pub use types::{RpcContext, RpcPayload, RpcResult};
pub use validate::validated;
