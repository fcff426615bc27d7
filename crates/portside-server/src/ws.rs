//! WebSocket server port.
//!
//! Wraps an upgraded `axum` WebSocket as a [`MessagePort`]: every RPC
//! envelope travels as one JSON text frame, decoded back to structured data
//! on receive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use portside_core::port::{PortEvents, PortSubscription};
use portside_core::{
    MessagePort, PortServerAdapter, PortServerHandle, RouteInvoker, RpcError, RpcServerAdapter,
};

const FRAME_BUFFER: usize = 64;

/// A [`MessagePort`] over an accepted WebSocket.
pub struct WebSocketPort {
    outbound: mpsc::Sender<String>,
    events: PortEvents,
    closed: Arc<AtomicBool>,
}

impl WebSocketPort {
    /// Take ownership of an upgraded socket, spawning its reader and writer
    /// tasks. The port emits `Close` when the peer goes away.
    pub fn new(socket: WebSocket) -> Arc<Self> {
        let (mut sink, mut stream) = socket.split();
        let (outbound, mut outbound_rx) = mpsc::channel::<String>(FRAME_BUFFER);
        let events = PortEvents::new();
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if sink.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        });

        {
            let events = events.clone();
            let closed = closed.clone();
            tokio::spawn(async move {
                while let Some(frame) = stream.next().await {
                    match frame {
                        Ok(Message::Text(text)) => match serde_json::from_str(text.as_str()) {
                            Ok(data) => events.emit_message(data),
                            Err(err) => {
                                tracing::warn!(%err, "dropping malformed websocket frame")
                            }
                        },
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(err) => {
                            tracing::debug!(%err, "websocket receive error");
                            break;
                        }
                    }
                }
                closed.store(true, Ordering::SeqCst);
                events.emit_close();
            });
        }

        Arc::new(Self {
            outbound,
            events,
            closed,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagePort for WebSocketPort {
    async fn post_message(&self, data: Value) -> Result<(), RpcError> {
        if self.is_closed() {
            return Err(RpcError::new("connection closed"));
        }
        let text = serde_json::to_string(&data)?;
        self.outbound
            .send(text)
            .await
            .map_err(|_| RpcError::new("connection closed"))
    }

    fn subscribe(&self) -> PortSubscription {
        self.events.subscribe()
    }
}

/// Serve a route table over one accepted socket. Call from an `on_upgrade`
/// callback, cloning the invoker per connection:
///
/// ```ignore
/// let app = Router::new().route(
///     "/ws",
///     get(move |upgrade: WebSocketUpgrade| {
///         let invoker = invoker.clone();
///         async move {
///             upgrade.on_upgrade(move |socket| async move {
///                 let _handle = serve_socket(socket, invoker);
///             })
///         }
///     }),
/// );
/// ```
pub fn serve_socket(socket: WebSocket, invoker: RouteInvoker) -> PortServerHandle {
    PortServerAdapter::new(WebSocketPort::new(socket)).on(invoker)
}
