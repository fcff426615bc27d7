//! Route table and dispatcher.
//!
//! `RpcRoutes` is built once at server setup and immutable afterwards;
//! `RouteInvoker` is the cheap, cloneable handle adapters dispatch through.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::error::RpcError;
use crate::types::{RpcContext, RpcPayload};

/// Boxed future returned by every route function.
pub type RouteFuture = Pin<Box<dyn Future<Output = Result<Value, RpcError>> + Send>>;

type RouteFn = Arc<dyn Fn(RpcContext, Vec<Value>) -> RouteFuture + Send + Sync>;

/// Mapping from route name to an invocable async function.
#[derive(Default)]
pub struct RpcRoutes {
    routes: HashMap<String, RouteFn>,
}

impl RpcRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route that ignores the call context.
    pub fn route<F, Fut>(self, name: &str, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        self.context_route(name, move |_ctx, args| f(args))
    }

    /// Register a route that reads the caller-supplied [`RpcContext`]
    /// (request headers over HTTP, connection context over ports).
    pub fn context_route<F, Fut>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(RpcContext, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
    {
        let route: RouteFn =
            Arc::new(move |ctx, args| -> RouteFuture { Box::pin(f(ctx, args)) });
        self.routes.insert(name.to_string(), route);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// All registered route names, sorted. Useful for discovery endpoints.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Cloneable dispatch handle over an immutable route table.
#[derive(Clone)]
pub struct RouteInvoker {
    routes: Arc<RpcRoutes>,
}

impl RouteInvoker {
    pub fn new(routes: RpcRoutes) -> Self {
        Self {
            routes: Arc::new(routes),
        }
    }

    /// Look up `payload.path` and await the route function.
    ///
    /// Unknown paths fail with message `"invalid path"` and the path as
    /// `cause`; route errors propagate untouched — the calling adapter is
    /// responsible for catching and serializing them.
    pub async fn invoke(&self, ctx: RpcContext, payload: RpcPayload) -> Result<Value, RpcError> {
        let Some(route) = self.routes.routes.get(&payload.path) else {
            return Err(RpcError::new("invalid path").with_cause(Value::String(payload.path)));
        };
        route(ctx, payload.args).await
    }

    pub fn route_names(&self) -> Vec<&str> {
        self.routes.names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_routes() -> RouteInvoker {
        let routes = RpcRoutes::new()
            .route("sum", |args| async move {
                let total: i64 = args.iter().filter_map(Value::as_i64).sum();
                Ok(json!(total))
            })
            .context_route("whoami", |ctx, _args| async move {
                Ok(json!(ctx.get("user").unwrap_or("anonymous")))
            });
        RouteInvoker::new(routes)
    }

    #[tokio::test]
    async fn dispatches_by_name() {
        let invoker = sample_routes();
        let value = invoker
            .invoke(
                RpcContext::new(),
                RpcPayload::new("sum", vec![json!(1), json!(2), json!(3)]),
            )
            .await
            .unwrap();
        assert_eq!(value, json!(6));
    }

    #[tokio::test]
    async fn unknown_path_is_invalid_path() {
        let invoker = sample_routes();
        let err = invoker
            .invoke(RpcContext::new(), RpcPayload::new("missing", vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.message, "invalid path");
        assert_eq!(err.cause, Some(json!("missing")));
        assert_eq!(err.status, 500);
    }

    #[tokio::test]
    async fn context_reaches_routes() {
        let invoker = sample_routes();
        let ctx = RpcContext::new().with("user", "ada");
        let value = invoker
            .invoke(ctx, RpcPayload::new("whoami", vec![]))
            .await
            .unwrap();
        assert_eq!(value, json!("ada"));
    }

    #[test]
    fn names_are_sorted() {
        let routes = RpcRoutes::new()
            .route("b", |_| async { Ok(Value::Null) })
            .route("a", |_| async { Ok(Value::Null) });
        assert_eq!(routes.names(), vec!["a", "b"]);
    }
}
