//! WebSocket client port.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use portside_core::port::{PortEvents, PortSubscription};
use portside_core::{MessagePort, RpcError};

const FRAME_BUFFER: usize = 64;

/// A [`MessagePort`] over an outbound WebSocket connection. Envelopes travel
/// as JSON text frames, matching the server-side port.
pub struct WsClientPort {
    outbound: mpsc::Sender<String>,
    events: PortEvents,
    closed: Arc<AtomicBool>,
}

impl WsClientPort {
    /// Connect to `url` (`ws://…`) and spawn the reader/writer tasks. The
    /// port emits `Close` when the server goes away.
    pub async fn connect(url: &str) -> Result<Arc<Self>, RpcError> {
        let (socket, _response) = connect_async(url)
            .await
            .map_err(|err| RpcError::from_error(&err))?;
        let (mut sink, mut stream) = socket.split();

        let (outbound, mut outbound_rx) = mpsc::channel::<String>(FRAME_BUFFER);
        let events = PortEvents::new();
        let closed = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if sink.send(Message::Text(text)).await.is_err() {
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
                        Ok(Message::Text(text)) => match serde_json::from_str(&text) {
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

        Ok(Arc::new(Self {
            outbound,
            events,
            closed,
        }))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessagePort for WsClientPort {
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
