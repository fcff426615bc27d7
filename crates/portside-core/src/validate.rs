//! Validate-then-call route wrapper.
//!
//! serde is the schema layer: `validated(f)` deserializes the first call
//! argument into `f`'s typed input and only then runs the body. A failing
//! argument rejects with status 400 and the body never executes.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::RpcError;
use crate::routes::RouteFuture;

/// Wrap a typed async route function in an argument check.
///
/// ```
/// use portside_core::{validated, RpcRoutes};
/// use serde::Deserialize;
/// use serde_json::json;
///
/// #[derive(Deserialize)]
/// struct Increment {
///     #[serde(default = "one")]
///     delta: i64,
/// }
/// fn one() -> i64 { 1 }
///
/// let routes = RpcRoutes::new().route(
///     "increment",
///     validated(|input: Increment| async move { Ok(json!(input.delta)) }),
/// );
/// ```
pub fn validated<T, F, Fut>(
    f: F,
) -> impl Fn(Vec<Value>) -> RouteFuture + Send + Sync + Clone + 'static
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = Result<Value, RpcError>> + Send + 'static,
{
    move |mut args: Vec<Value>| {
        let f = f.clone();
        Box::pin(async move {
            let raw = if args.is_empty() {
                Value::Null
            } else {
                args.swap_remove(0)
            };
            let input: T = serde_json::from_value(raw)
                .map_err(|err| RpcError::from_error(&err).set_status(400))?;
            f(input).await
        }) as RouteFuture
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::RpcRoutes;
    use crate::types::{RpcContext, RpcPayload};
    use crate::RouteInvoker;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Deserialize)]
    struct Increment {
        #[serde(default = "default_delta")]
        delta: i64,
    }

    fn default_delta() -> i64 {
        1
    }

    #[tokio::test]
    async fn rejects_bad_input_before_the_body_runs() {
        let executed = Arc::new(AtomicBool::new(false));
        let seen = executed.clone();
        let invoker = RouteInvoker::new(RpcRoutes::new().route(
            "increment",
            validated(move |input: Increment| {
                let seen = seen.clone();
                async move {
                    seen.store(true, Ordering::SeqCst);
                    Ok(json!(input.delta))
                }
            }),
        ));

        let err = invoker
            .invoke(
                RpcContext::new(),
                RpcPayload::new("increment", vec![json!({"delta": "2"})]),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status, 400);
        assert!(!executed.load(Ordering::SeqCst), "body must not run");
    }

    #[tokio::test]
    async fn applies_serde_defaults() {
        let invoker = RouteInvoker::new(RpcRoutes::new().route(
            "increment",
            validated(|input: Increment| async move { Ok(json!(input.delta)) }),
        ));

        let value = invoker
            .invoke(
                RpcContext::new(),
                RpcPayload::new("increment", vec![json!({})]),
            )
            .await
            .unwrap();
        assert_eq!(value, json!(1));

        let value = invoker
            .invoke(
                RpcContext::new(),
                RpcPayload::new("increment", vec![json!({"delta": 2})]),
            )
            .await
            .unwrap();
        assert_eq!(value, json!(2));
    }
}
