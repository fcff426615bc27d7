//! Request/response correlation over any [`MessagePort`].
//!
//! The server side dispatches every inbound `{id, data}` frame on its own
//! task, so a slow route never blocks the receive loop; responses are posted
//! back as `{id, result}` and may leave in any order. The client side matches
//! responses to calls purely by correlation ID.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::{MessagePort, PortEvent};
use crate::adapter::{RpcClientAdapter, RpcServerAdapter};
use crate::error::RpcError;
use crate::routes::RouteInvoker;
use crate::types::{RequestEnvelope, ResponseEnvelope, RpcContext, RpcPayload, RpcResult};

/// Server side of the port transport.
pub struct PortServerAdapter {
    port: Arc<dyn MessagePort>,
    context: RpcContext,
}

impl PortServerAdapter {
    pub fn new(port: Arc<dyn MessagePort>) -> Self {
        Self {
            port,
            context: RpcContext::new(),
        }
    }

    /// Attach a per-connection context handed to every route invoked over
    /// this port (e.g. identity captured at connection time).
    pub fn with_context(mut self, context: RpcContext) -> Self {
        self.context = context;
        self
    }
}

impl RpcServerAdapter for PortServerAdapter {
    type Output = PortServerHandle;

    fn on(self, invoker: RouteInvoker) -> PortServerHandle {
        // Subscribe before spawning so no frame posted right after
        // registration can slip past the dispatcher.
        let mut sub = self.port.subscribe();
        let port = self.port;
        let context = self.context;

        let task = tokio::spawn(async move {
            while let Some(event) = sub.next().await {
                let raw = match event {
                    PortEvent::Message(raw) => raw,
                    PortEvent::Close => break,
                };
                // A frame that is not a request is someone else's traffic on
                // a shared port (e.g. responses, when both ends expose).
                let request: RequestEnvelope = match serde_json::from_value(raw) {
                    Ok(request) => request,
                    Err(err) => {
                        tracing::debug!(%err, "skipping non-request frame");
                        continue;
                    }
                };

                let invoker = invoker.clone();
                let port = Arc::clone(&port);
                let ctx = context.clone();
                tokio::spawn(async move {
                    let result = match invoker.invoke(ctx, request.data).await {
                        Ok(value) => RpcResult::ok(value),
                        Err(err) => {
                            tracing::error!(error = %err, status = err.status, "route dispatch failed");
                            RpcResult::err(&err)
                        }
                    };
                    let response = ResponseEnvelope {
                        id: request.id,
                        result,
                    };
                    let frame = match serde_json::to_value(&response) {
                        Ok(frame) => frame,
                        Err(err) => {
                            tracing::error!(%err, "failed to encode response envelope");
                            return;
                        }
                    };
                    if let Err(err) = port.post_message(frame).await {
                        tracing::warn!(%err, "failed to post response");
                    }
                });
            }
        });

        PortServerHandle { task }
    }
}

/// Handle for a running port dispatcher.
///
/// The dispatch loop ends on its own when the port closes; dropping the
/// handle leaves it running until then. [`shutdown`] stops it early.
///
/// [`shutdown`]: PortServerHandle::shutdown
pub struct PortServerHandle {
    task: JoinHandle<()>,
}

impl PortServerHandle {
    pub fn shutdown(self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Client side of the port transport.
pub struct PortClientAdapter {
    port: Arc<dyn MessagePort>,
}

impl PortClientAdapter {
    pub fn new(port: Arc<dyn MessagePort>) -> Self {
        Self { port }
    }
}

#[async_trait]
impl RpcClientAdapter for PortClientAdapter {
    async fn send(&self, data: RpcPayload) -> Result<Value, RpcError> {
        let id = Uuid::new_v4().to_string();

        // Subscribe before posting: the response could otherwise win the
        // race and be emitted with no listener attached.
        let mut sub = self.port.subscribe();

        let request = RequestEnvelope {
            id: id.clone(),
            data,
        };
        self.port
            .post_message(serde_json::to_value(&request)?)
            .await?;

        // No timeout here: a call whose response never arrives waits until
        // the port closes, or forever. See the concurrency notes in
        // DESIGN.md.
        loop {
            match sub.next().await {
                Some(PortEvent::Message(raw)) => {
                    let Ok(response) = serde_json::from_value::<ResponseEnvelope>(raw) else {
                        continue;
                    };
                    if response.id != id {
                        continue;
                    }
                    return response.result.into_result();
                }
                Some(PortEvent::Close) | None => {
                    return Err(RpcError::new("connection closed"))
                }
            }
        }
    }
}
