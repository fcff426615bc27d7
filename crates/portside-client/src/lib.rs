//! Portside client adapters.
//!
//! Counterparts to the `portside-server` bindings:
//!
//! - [`http::HttpClientAdapter`]: unary HTTP calls via reqwest
//! - [`sse::SseClientPort`]: client half of the SSE duplex emulation
//! - [`ws::WsClientPort`]: WebSocket port via tokio-tungstenite
//!
//! The port types plug into `portside_core::PortClientAdapter`; the HTTP
//! adapter implements `RpcClientAdapter` directly. Either way the caller
//! ends up with an [`RpcClient`](portside_core::RpcClient) whose failure
//! mode is always a normalized `RpcError`.

pub mod http;
pub mod sse;
pub mod ws;

pub use http::HttpClientAdapter;
pub use sse::SseClientPort;
pub use ws::WsClientPort;
