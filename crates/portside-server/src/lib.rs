//! Portside server adapters — axum bindings on top of `portside-core`.
//!
//! Three transports, one protocol:
//!
//! - [`http::HttpServerAdapter`]: unary HTTP request/response
//! - [`sse::SseEndpoint`]: a duplex channel emulated on a one-way SSE stream
//!   plus a POST reverse channel
//! - [`ws::WebSocketPort`]: full-duplex WebSocket
//!
//! Each adapter produces plain `axum::Router` values (or works inside an
//! `on_upgrade` callback) so it composes with whatever else the application
//! serves; requests outside an adapter's endpoint never reach it.
//!
//! ```ignore
//! let app = axum::Router::new()
//!     .merge(expose_rpc(routes, HttpServerAdapter::new("/rpc")))
//!     .nest("/sse", sse.router());
//! axum::serve(listener, app).await?;
//! ```

pub mod http;
pub mod sse;
pub mod ws;

pub use http::HttpServerAdapter;
pub use sse::{SseConnection, SseEndpoint};
pub use ws::{serve_socket, WebSocketPort};
