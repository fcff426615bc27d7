//! Client half of the SSE duplex emulation.
//!
//! `connect` opens the `GET ?id=` event stream (generating the connection
//! ID) and spawns a reader that decodes `data:` frames into port messages;
//! comment frames — the server's keep-alive — are skipped. Outbound messages
//! travel as `POST ?id=` requests acknowledged with `{"ok": true}`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header;
use serde_json::Value;
use uuid::Uuid;

use portside_core::port::{PortEvents, PortSubscription};
use portside_core::{MessagePort, RpcError};

/// A [`MessagePort`] whose carrier is an SSE stream plus a POST reverse
/// channel.
#[derive(Debug)]
pub struct SseClientPort {
    endpoint: String,
    id: String,
    http: reqwest::Client,
    events: PortEvents,
    closed: Arc<AtomicBool>,
}

impl SseClientPort {
    /// Open a connection against a server `SseEndpoint` mounted at
    /// `endpoint`. Fails terminally if the stream does not open (the server
    /// rejected the ID, or the endpoint is unreachable).
    pub async fn connect(endpoint: &str) -> Result<Arc<Self>, RpcError> {
        Self::connect_with(endpoint, reqwest::Client::new()).await
    }

    pub async fn connect_with(
        endpoint: &str,
        http: reqwest::Client,
    ) -> Result<Arc<Self>, RpcError> {
        let id = Uuid::new_v4().to_string();
        let response = http
            .get(endpoint)
            .query(&[("id", id.as_str())])
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|err| RpcError::from_error(&err))?;

        if !response.status().is_success() {
            return Err(RpcError::new("failed to open event stream")
                .set_status(response.status().as_u16()));
        }

        let events = PortEvents::new();
        let closed = Arc::new(AtomicBool::new(false));
        {
            let events = events.clone();
            let closed = closed.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let mut stream = response.bytes_stream();
                let mut buffer = String::new();
                while let Some(chunk) = stream.next().await {
                    let Ok(chunk) = chunk else { break };
                    buffer.push_str(&String::from_utf8_lossy(&chunk));
                    while let Some(end) = buffer.find("\n\n") {
                        let frame = buffer[..end].to_string();
                        buffer.drain(..end + 2);
                        if let Some(data) = decode_frame(&frame) {
                            match serde_json::from_str(&data) {
                                Ok(value) => events.emit_message(value),
                                Err(err) => {
                                    tracing::warn!(%id, %err, "dropping malformed sse frame")
                                }
                            }
                        }
                    }
                }
                tracing::debug!(%id, "sse stream ended");
                closed.store(true, Ordering::SeqCst);
                events.emit_close();
            });
        }

        Ok(Arc::new(Self {
            endpoint: endpoint.to_string(),
            id,
            http,
            events,
            closed,
        }))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Extract the payload of one SSE frame, or `None` for keep-alive comments
/// and fieldless frames. Multiple `data:` lines concatenate with newlines.
fn decode_frame(frame: &str) -> Option<String> {
    let mut data_lines: Vec<&str> = Vec::new();
    for line in frame.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
        // other fields (event:, id:, retry:) carry no payload for this
        // protocol and are ignored
    }
    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}

#[async_trait]
impl MessagePort for SseClientPort {
    async fn post_message(&self, data: Value) -> Result<(), RpcError> {
        if self.is_closed() {
            return Err(RpcError::new("connection closed"));
        }
        let body = serde_json::to_string(&data)?;
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("id", self.id.as_str())])
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|err| RpcError::from_error(&err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::new("failed to push message").set_status(status.as_u16()));
        }
        let ack: Value = response
            .json()
            .await
            .map_err(|err| RpcError::from_error(&err))?;
        if ack.get("ok") != Some(&Value::Bool(true)) {
            return Err(RpcError::new("push not acknowledged").with_cause(ack));
        }
        Ok(())
    }

    fn subscribe(&self) -> PortSubscription {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::decode_frame;

    #[test]
    fn decodes_data_frames() {
        assert_eq!(decode_frame("data: {\"a\":1}"), Some("{\"a\":1}".into()));
        assert_eq!(decode_frame("data:{\"a\":1}"), Some("{\"a\":1}".into()));
    }

    #[test]
    fn skips_keep_alive_comments() {
        assert_eq!(decode_frame(":ping"), None);
        assert_eq!(decode_frame(": ping"), None);
    }

    #[test]
    fn joins_multi_line_data() {
        assert_eq!(decode_frame("data: a\ndata: b"), Some("a\nb".into()));
    }
}
