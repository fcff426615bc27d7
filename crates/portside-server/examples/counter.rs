//! Quick tour: the same counter routes served over HTTP, SSE, and WebSocket.
//!
//! Usage: cargo run -p portside-server --example counter

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::json;

use portside_client::{HttpClientAdapter, SseClientPort, WsClientPort};
use portside_core::port::PortClientAdapter;
use portside_core::{
    validated, PortServerAdapter, RouteInvoker, RpcClient, RpcRoutes, RpcServerAdapter,
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portside_server=debug,portside_client=debug".into()),
        )
        .init();

    let counter = Arc::new(AtomicI64::new(0));
    let read = counter.clone();
    let routes = RpcRoutes::new()
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
        );
    let invoker = RouteInvoker::new(routes);

    // one Router, three transports
    let sse = SseEndpoint::new({
        let invoker = invoker.clone();
        move |conn| {
            let _handle = PortServerAdapter::new(conn).on(invoker.clone());
        }
    });
    let app = Router::new()
        .merge(
            HttpServerAdapter::new("/rpc")
                .paths_for_get(["getCounter"])
                .on(invoker.clone()),
        )
        .nest("/sse", sse.router())
        .route(
            "/ws",
            get({
                let invoker = invoker.clone();
                move |upgrade: WebSocketUpgrade| {
                    let invoker = invoker.clone();
                    async move {
                        upgrade.on_upgrade(move |socket| async move {
                            let _handle = serve_socket(socket, invoker);
                        })
                    }
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    println!("serving on {addr}");

    println!("\n=== HTTP ===");
    let http = RpcClient::new(
        HttpClientAdapter::new(&format!("http://{addr}/rpc")).paths_for_get(["getCounter"]),
    );
    println!("increment({{}})      -> {}", http.call::<i64>("incrementCounter", vec![json!({})]).await?);
    println!("increment(delta 2) -> {}", http.call::<i64>("incrementCounter", vec![json!({"delta": 2})]).await?);
    println!("getCounter         -> {}", http.call::<i64>("getCounter", vec![]).await?);

    println!("\n=== SSE ===");
    let port = SseClientPort::connect(&format!("http://{addr}/sse")).await?;
    let sse_client = RpcClient::new(PortClientAdapter::new(port));
    println!("increment({{}})      -> {}", sse_client.call::<i64>("incrementCounter", vec![json!({})]).await?);
    println!("getCounter         -> {}", sse_client.call::<i64>("getCounter", vec![]).await?);

    println!("\n=== WebSocket ===");
    let port = WsClientPort::connect(&format!("ws://{addr}/ws")).await?;
    let ws_client = RpcClient::new(PortClientAdapter::new(port));
    println!("increment({{}})      -> {}", ws_client.call::<i64>("incrementCounter", vec![json!({})]).await?);
    println!("getCounter         -> {}", ws_client.call::<i64>("getCounter", vec![]).await?);

    Ok(())
}
