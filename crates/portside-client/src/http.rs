//! Unary HTTP client adapter.
//!
//! Mirrors the server's wire contract: POST with a JSON argument array, or
//! GET with the array in the `payload` query parameter for allow-listed
//! routes. The `{ok, value}` envelope is parsed from the body; the error arm
//! reconstructs the server's `RpcError` exactly.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header;
use serde_json::Value;

use portside_core::{
    DefaultJson, JsonCodec, RpcClientAdapter, RpcError, RpcPayload, RpcResult,
};

const GET_PAYLOAD_PARAM: &str = "payload";

/// HTTP client adapter builder.
pub struct HttpClientAdapter {
    endpoint: String,
    paths_for_get: HashSet<String>,
    codec: Arc<dyn JsonCodec>,
    headers: Vec<(String, String)>,
    http: reqwest::Client,
}

impl HttpClientAdapter {
    /// `endpoint` is the absolute URL prefix the server adapter is mounted
    /// at, e.g. `http://127.0.0.1:3210/rpc`.
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            paths_for_get: HashSet::new(),
            codec: Arc::new(DefaultJson),
            headers: Vec::new(),
            http: reqwest::Client::new(),
        }
    }

    /// Must match the server's GET allow-list.
    pub fn paths_for_get<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths_for_get = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Must match the server's codec.
    pub fn codec(mut self, codec: Arc<dyn JsonCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Attach a static header to every request (e.g. authorization).
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Substitute a pre-configured reqwest client.
    pub fn client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }
}

#[async_trait]
impl RpcClientAdapter for HttpClientAdapter {
    async fn send(&self, data: RpcPayload) -> Result<Value, RpcError> {
        let url = format!("{}/{}", self.endpoint, data.path);
        let payload = self.codec.stringify(&Value::Array(data.args))?;

        let mut request = if self.paths_for_get.contains(&data.path) {
            self.http
                .get(&url)
                .query(&[(GET_PAYLOAD_PARAM, payload.as_str())])
        } else {
            self.http
                .post(&url)
                .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
                .body(payload)
        };
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|err| RpcError::from_error(&err))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| RpcError::from_error(&err))?;

        let parsed = self.codec.parse(&text).map_err(|err| {
            // a non-envelope body (e.g. a framework 404) keeps its status
            if status.is_success() {
                err
            } else {
                err.set_status(status.as_u16())
            }
        })?;
        let envelope: RpcResult = serde_json::from_value(parsed).map_err(|err| {
            RpcError::new(format!("malformed response envelope: {err}"))
                .set_status(status.as_u16())
        })?;
        envelope.into_result()
    }
}
