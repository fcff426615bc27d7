//! Unary HTTP server adapter.
//!
//! Wire contract: `POST {endpoint}/{route}` with a JSON argument array as
//! body, or `GET {endpoint}/{route}?payload=<json>` for allow-listed routes.
//! The response body is always the `{ok, value}` envelope; the HTTP status
//! mirrors the error's `status` field (200 on success).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use serde_json::Value;

use portside_core::{
    DefaultJson, JsonCodec, RouteInvoker, RpcContext, RpcError, RpcPayload, RpcResult,
    RpcServerAdapter,
};

const GET_PAYLOAD_PARAM: &str = "payload";

/// HTTP server adapter builder.
///
/// `on` returns an `axum::Router` owning only `{endpoint}/{route}`; mounting
/// it next to other routers is the passthrough composition — paths outside
/// the endpoint never reach the adapter.
pub struct HttpServerAdapter {
    endpoint: String,
    paths_for_get: HashSet<String>,
    codec: Arc<dyn JsonCodec>,
}

impl HttpServerAdapter {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            paths_for_get: HashSet::new(),
            codec: Arc::new(DefaultJson),
        }
    }

    /// Routes served over GET (cacheable, side-effect-free). Everything else
    /// expects POST; a mismatch fails closed with 405.
    pub fn paths_for_get<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths_for_get = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Substitute a richer JSON encoding. The adapter only ever calls
    /// `parse`/`stringify`.
    pub fn codec(mut self, codec: Arc<dyn JsonCodec>) -> Self {
        self.codec = codec;
        self
    }
}

#[derive(Clone)]
struct HttpAdapterState {
    paths_for_get: Arc<HashSet<String>>,
    codec: Arc<dyn JsonCodec>,
    invoker: RouteInvoker,
}

impl RpcServerAdapter for HttpServerAdapter {
    type Output = Router;

    fn on(self, invoker: RouteInvoker) -> Router {
        let state = HttpAdapterState {
            paths_for_get: Arc::new(self.paths_for_get),
            codec: self.codec,
            invoker,
        };
        Router::new()
            .route(&format!("{}/{{path}}", self.endpoint), any(handle))
            .with_state(state)
    }
}

async fn handle(
    State(state): State<HttpAdapterState>,
    method: Method,
    Path(path): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let outcome = invoke(&state, &method, &path, &query, &headers, body).await;

    let (status, envelope) = match outcome {
        Ok(value) => (StatusCode::OK, RpcResult::ok(value)),
        Err(err) => {
            tracing::error!(%path, error = %err, status = err.status, "rpc request failed");
            let status =
                StatusCode::from_u16(err.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, RpcResult::err(&err))
        }
    };

    let body = state
        .codec
        .stringify(&serde_json::to_value(&envelope).unwrap_or(Value::Null))
        .unwrap_or_else(|_| r#"{"ok":false,"value":{"message":"unknown","status":500}}"#.into());

    (
        status,
        [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
        body,
    )
        .into_response()
}

async fn invoke(
    state: &HttpAdapterState,
    method: &Method,
    path: &str,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    body: String,
) -> Result<Value, RpcError> {
    let expected = if state.paths_for_get.contains(path) {
        Method::GET
    } else {
        Method::POST
    };
    if *method != expected {
        return Err(RpcError::new("invalid method")
            .with_cause(Value::String(method.to_string()))
            .set_status(405));
    }

    let raw_args = if expected == Method::GET {
        query
            .get(GET_PAYLOAD_PARAM)
            .cloned()
            .ok_or_else(|| RpcError::new("missing payload").set_status(400))?
    } else {
        body
    };

    let args = match state.codec.parse(&raw_args)? {
        Value::Array(args) => args,
        other => {
            return Err(RpcError::new("malformed arguments")
                .with_cause(other)
                .set_status(400))
        }
    };

    let ctx = context_from_headers(headers);
    state
        .invoker
        .invoke(ctx, RpcPayload::new(path, args))
        .await
}

fn context_from_headers(headers: &HeaderMap) -> RpcContext {
    let mut ctx = RpcContext::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            ctx.insert(name.as_str(), value);
        }
    }
    ctx
}
