//! Duplex channel emulated on Server-Sent Events.
//!
//! SSE is server→client only, so the duplex port is synthesized from two
//! halves sharing a connection ID:
//!
//! - `GET {endpoint}?id=<id>` opens the event stream; server→client messages
//!   travel as `data: <json>` frames, with comment-frame keep-alives.
//! - `POST {endpoint}?id=<id>` is the reverse channel; the body surfaces as
//!   an inbound message on the registered connection's port.
//!
//! Per connection: `CONNECTING → OPEN → CLOSED`. Only one live connection
//! per ID may exist; a second GET with a live ID is rejected and does not
//! displace the first. Teardown happens when the client drops the stream —
//! there is no server-initiated close path.

use std::collections::HashMap;
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

use portside_core::port::{PortEvents, PortSubscription};
use portside_core::{MessagePort, RpcError};

const FRAME_BUFFER: usize = 64;
const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(10);

type ConnectionMap = Arc<Mutex<HashMap<String, Arc<SseConnection>>>>;
type OnConnection = Arc<dyn Fn(Arc<SseConnection>) + Send + Sync>;

/// Server side of one SSE-backed duplex connection.
///
/// Hand it to a `PortServerAdapter` (or any other [`MessagePort`] consumer);
/// the correlation and dispatch logic does not care that the carrier is an
/// emulated channel.
pub struct SseConnection {
    id: String,
    frames: mpsc::Sender<Result<Event, Infallible>>,
    events: PortEvents,
    closed: Arc<AtomicBool>,
}

impl SseConnection {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn notify_message(&self, data: Value) {
        self.events.emit_message(data);
    }
}

#[async_trait]
impl MessagePort for SseConnection {
    async fn post_message(&self, data: Value) -> Result<(), RpcError> {
        if self.is_closed() {
            return Err(RpcError::new("connection closed"));
        }
        let text = serde_json::to_string(&data)?;
        self.frames
            .send(Ok(Event::default().data(text)))
            .await
            .map_err(|_| RpcError::new("connection closed"))
    }

    fn subscribe(&self) -> PortSubscription {
        self.events.subscribe()
    }
}

/// The SSE endpoint: connection registry plus the GET/POST handler pair.
///
/// ```ignore
/// let sse = SseEndpoint::new(move |conn| {
///     let _ = PortServerAdapter::new(conn).on(invoker.clone());
/// });
/// let app = Router::new().nest("/sse", sse.router());
/// ```
#[derive(Clone)]
pub struct SseEndpoint {
    connections: ConnectionMap,
    on_connection: OnConnection,
    keep_alive: Duration,
}

impl SseEndpoint {
    /// `on_connection` runs once per accepted GET, with the freshly
    /// registered connection.
    pub fn new<F>(on_connection: F) -> Self
    where
        F: Fn(Arc<SseConnection>) + Send + Sync + 'static,
    {
        Self {
            connections: Arc::new(Mutex::new(HashMap::new())),
            on_connection: Arc::new(on_connection),
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }

    /// Interval between `:ping` comment frames on idle streams.
    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    /// Router serving the endpoint at its mount point (`nest` it).
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(open_stream).post(push_message))
            .with_state(self.clone())
    }

    /// Look up a live connection.
    pub fn connection(&self, id: &str) -> Option<Arc<SseConnection>> {
        self.connections.lock().unwrap().get(id).cloned()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }
}

/// `GET ?id=` — open the event stream and register the connection.
async fn open_stream(
    State(endpoint): State<SseEndpoint>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(id) = params.get("id") else {
        return failure(StatusCode::BAD_REQUEST, "missing id");
    };

    let (frames, rx) = mpsc::channel(FRAME_BUFFER);
    let conn = Arc::new(SseConnection {
        id: id.clone(),
        frames,
        events: PortEvents::new(),
        closed: Arc::new(AtomicBool::new(false)),
    });

    {
        let mut map = endpoint.connections.lock().unwrap();
        if map.contains_key(id) {
            tracing::warn!(%id, "rejecting duplicate sse connection");
            return failure(StatusCode::CONFLICT, "connection id already in use");
        }
        map.insert(id.clone(), conn.clone());
    }
    tracing::debug!(%id, "sse connection opened");

    (endpoint.on_connection)(conn.clone());

    let stream = ConnectionStream {
        inner: ReceiverStream::new(rx),
        _guard: CloseGuard {
            conn,
            connections: endpoint.connections.clone(),
        },
    };
    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(endpoint.keep_alive).text("ping"))
        .into_response()
}

/// `POST ?id=` — the client→server half of the duplex channel.
async fn push_message(
    State(endpoint): State<SseEndpoint>,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let Some(id) = params.get("id") else {
        return failure(StatusCode::BAD_REQUEST, "missing id");
    };
    let Some(conn) = endpoint.connection(id) else {
        return failure(StatusCode::NOT_FOUND, "connection not registered");
    };
    let data: Value = match serde_json::from_str(&body) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(%id, %err, "dropping malformed sse payload");
            return failure(StatusCode::BAD_REQUEST, "malformed payload");
        }
    };
    conn.notify_message(data);
    Json(json!({"ok": true})).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"ok": false, "error": message}))).into_response()
}

/// The outbound frame stream, with teardown tied to its lifetime: axum drops
/// the response body when the client goes away, which deregisters the
/// connection and emits `Close` to local subscribers.
struct ConnectionStream {
    inner: ReceiverStream<Result<Event, Infallible>>,
    _guard: CloseGuard,
}

impl Stream for ConnectionStream {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

struct CloseGuard {
    conn: Arc<SseConnection>,
    connections: ConnectionMap,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        self.conn.closed.store(true, Ordering::SeqCst);
        {
            let mut map = self.connections.lock().unwrap();
            if let Some(live) = map.get(self.conn.id()) {
                if Arc::ptr_eq(live, &self.conn) {
                    map.remove(self.conn.id());
                }
            }
        }
        tracing::debug!(id = %self.conn.id(), "sse connection closed");
        self.conn.events.emit_close();
    }
}
