//! End-to-end tests: start a real axum server and drive every adapter
//! through portside-client.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::WebSocketUpgrade;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use portside_client::{HttpClientAdapter, SseClientPort, WsClientPort};
use portside_core::port::PortClientAdapter;
use portside_core::{
    expose_rpc, validated, PortServerAdapter, RouteInvoker, RpcClient, RpcClientAdapter,
    RpcRoutes, RpcServerAdapter,
};
use portside_server::{serve_socket, HttpServerAdapter, SseEndpoint};

#[derive(Deserialize)]
struct Increment {
    #[serde(default = "default_delta")]
    delta: i64,
}

fn default_delta() -> i64 {
    1
}

fn counter_routes() -> RpcRoutes {
    let counter = Arc::new(AtomicI64::new(0));
    let read = counter.clone();
    RpcRoutes::new()
        .route("checkId", |args| async move {
            Ok(json!(args.first() == Some(&json!("good"))))
        })
        .route("getCounter", move |_args| {
            let read = read.clone();
            async move { Ok(json!(read.load(Ordering::SeqCst))) }
        })
        .route(
            "incrementCounter",
            validated(move |input: Increment| {
                let counter = counter.clone();
                async move {
                    Ok(json!(counter.fetch_add(input.delta, Ordering::SeqCst) + input.delta))
                }
            }),
        )
        .context_route("checkAuth", |ctx, _args| async move {
            Ok(json!(ctx.get("x-auth") == Some("good")))
        })
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Run the shared counter scenario against any client.
async fn run_counter_scenario<A: RpcClientAdapter>(client: &RpcClient<A>) {
    assert!(client.call::<bool>("checkId", vec![json!("good")]).await.unwrap());
    assert!(!client.call::<bool>("checkId", vec![json!("bad")]).await.unwrap());

    assert_eq!(client.call::<i64>("getCounter", vec![]).await.unwrap(), 0);
    assert_eq!(
        client.call::<i64>("incrementCounter", vec![json!({})]).await.unwrap(),
        1
    );
    assert_eq!(
        client
            .call::<i64>("incrementCounter", vec![json!({"delta": 2})])
            .await
            .unwrap(),
        3
    );
    assert_eq!(client.call::<i64>("getCounter", vec![]).await.unwrap(), 3);

    // validation failure: 400, counter untouched
    let err = client
        .call::<i64>("incrementCounter", vec![json!({"delta": "2"})])
        .await
        .unwrap_err();
    assert_eq!(err.status, 400);
    assert_eq!(client.call::<i64>("getCounter", vec![]).await.unwrap(), 3);

    // unknown route
    let err = client.call_value("incrementCounterXXX", vec![]).await.unwrap_err();
    assert_eq!(err.message, "invalid path");
}

// ── HTTP ────────────────────────────────────────────────────────────

#[tokio::test]
async fn http_counter_scenario() {
    let app = expose_rpc(
        counter_routes(),
        HttpServerAdapter::new("/rpc").paths_for_get(["getCounter"]),
    );
    let addr = serve(app).await;

    let client = RpcClient::new(
        HttpClientAdapter::new(&format!("http://{addr}/rpc")).paths_for_get(["getCounter"]),
    );
    run_counter_scenario(&client).await;
}

#[tokio::test]
async fn http_method_mismatch_is_405() {
    let app = expose_rpc(
        counter_routes(),
        HttpServerAdapter::new("/rpc").paths_for_get(["getCounter"]),
    );
    let addr = serve(app).await;
    let base = format!("http://{addr}/rpc");
    let http = reqwest::Client::new();

    // allow-listed route via POST
    let resp = http
        .post(format!("{base}/getCounter"))
        .body("[]")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));
    assert_eq!(body["value"]["message"], json!("invalid method"));
    assert_eq!(body["value"]["status"], json!(405));

    // non-allow-listed route via GET
    let resp = http
        .get(format!("{base}/incrementCounter"))
        .query(&[("payload", "[{}]")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);

    // neither mismatch ran the route
    let client = RpcClient::new(
        HttpClientAdapter::new(&base).paths_for_get(["getCounter"]),
    );
    assert_eq!(client.call::<i64>("getCounter", vec![]).await.unwrap(), 0);
}

#[tokio::test]
async fn http_headers_become_call_context() {
    let app = expose_rpc(counter_routes(), HttpServerAdapter::new("/rpc"));
    let addr = serve(app).await;
    let base = format!("http://{addr}/rpc");

    let good = RpcClient::new(HttpClientAdapter::new(&base).header("x-auth", "good"));
    assert!(good.call::<bool>("checkAuth", vec![]).await.unwrap());

    let anonymous = RpcClient::new(HttpClientAdapter::new(&base));
    assert!(!anonymous.call::<bool>("checkAuth", vec![]).await.unwrap());
}

// ── SSE ─────────────────────────────────────────────────────────────

fn sse_app(invoker: RouteInvoker, keep_alive: Duration) -> (Router, SseEndpoint) {
    let endpoint = SseEndpoint::new(move |conn| {
        let _handle = PortServerAdapter::new(conn).on(invoker.clone());
    })
    .keep_alive(keep_alive);
    let app = Router::new().nest("/sse", endpoint.router());
    (app, endpoint)
}

#[tokio::test]
async fn sse_counter_scenario() {
    let invoker = RouteInvoker::new(counter_routes());
    // aggressive keep-alive so ping frames interleave with responses
    let (app, _endpoint) = sse_app(invoker, Duration::from_millis(50));
    let addr = serve(app).await;

    let port = SseClientPort::connect(&format!("http://{addr}/sse"))
        .await
        .unwrap();
    let client = RpcClient::new(PortClientAdapter::new(port));

    run_counter_scenario(&client).await;

    // sit across a few keep-alive intervals, then keep calling
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.call::<i64>("getCounter", vec![]).await.unwrap(), 3);
}

#[tokio::test]
async fn sse_duplicate_id_is_rejected() {
    let invoker = RouteInvoker::new(counter_routes());
    let (app, endpoint) = sse_app(invoker, Duration::from_secs(10));
    let addr = serve(app).await;
    let url = format!("http://{addr}/sse");
    let http = reqwest::Client::new();

    let first = http
        .get(&url)
        .query(&[("id", "dup")])
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);
    assert_eq!(endpoint.connection_count(), 1);

    // a second GET with the live id fails and must not displace the first
    let second = http
        .get(&url)
        .query(&[("id", "dup")])
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), 409);
    assert_eq!(endpoint.connection_count(), 1);
    assert!(endpoint.connection("dup").is_some());

    // pushing at an unregistered id is a registry miss
    let miss = http
        .post(&url)
        .query(&[("id", "ghost")])
        .body("{}")
        .send()
        .await
        .unwrap();
    assert_eq!(miss.status(), 404);

    // dropping the stream deregisters the connection
    drop(first);
    for _ in 0..50 {
        if endpoint.connection_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(endpoint.connection_count(), 0);
}

#[tokio::test]
async fn sse_connect_fails_terminally_on_error() {
    // nothing is listening at this endpoint path
    let app = Router::new();
    let addr = serve(app).await;

    let err = SseClientPort::connect(&format!("http://{addr}/sse"))
        .await
        .unwrap_err();
    assert_eq!(err.status, 404);
}

// ── WebSocket ───────────────────────────────────────────────────────

fn ws_app(invoker: RouteInvoker) -> Router {
    Router::new().route(
        "/ws",
        get(move |upgrade: WebSocketUpgrade| {
            let invoker = invoker.clone();
            async move {
                upgrade.on_upgrade(move |socket| async move {
                    let _handle = serve_socket(socket, invoker);
                })
            }
        }),
    )
}

#[tokio::test]
async fn ws_counter_scenario() {
    let addr = serve(ws_app(RouteInvoker::new(counter_routes()))).await;

    let port = WsClientPort::connect(&format!("ws://{addr}/ws")).await.unwrap();
    let client = RpcClient::new(PortClientAdapter::new(port));

    run_counter_scenario(&client).await;
}

#[tokio::test]
async fn ws_concurrent_calls_keep_their_results() {
    let routes = RpcRoutes::new().route("echoAfter", |args| async move {
        let delay = args.first().and_then(Value::as_u64).unwrap_or(0);
        let tag = args.get(1).cloned().unwrap_or(Value::Null);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        Ok(tag)
    });
    let addr = serve(ws_app(RouteInvoker::new(routes))).await;

    let port = WsClientPort::connect(&format!("ws://{addr}/ws")).await.unwrap();
    let client = Arc::new(RpcClient::new(PortClientAdapter::new(port)));

    // responses come back in reverse order of the requests
    let mut calls = Vec::new();
    for tag in 0..8u64 {
        let client = client.clone();
        calls.push(tokio::spawn(async move {
            let delay = (8 - tag) * 25;
            client
                .call::<u64>("echoAfter", vec![json!(delay), json!(tag)])
                .await
        }));
    }
    for (tag, call) in calls.into_iter().enumerate() {
        assert_eq!(call.await.unwrap().unwrap(), tag as u64);
    }
}
