//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use cdp_proxy::config::ProxyConfig;
use cdp_proxy::lifecycle::{self, Running, Shutdown};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Largest message the mock browser accepts.
pub const MOCK_MAX_MESSAGE: usize = 256 * 1024 * 1024;

/// A port nothing listens on.
pub fn dead_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Start a proxy in front of `target`, admin endpoint disabled.
pub async fn start_proxy(target: SocketAddr) -> (Running, Shutdown) {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.target.host = target.ip().to_string();
    config.target.port = target.port();
    config.admin.enabled = false;
    config.websocket.heartbeat_secs = 0;
    start_proxy_with(config).await
}

pub async fn start_proxy_with(config: ProxyConfig) -> (Running, Shutdown) {
    let shutdown = Shutdown::new();
    let running = lifecycle::start(&config, &shutdown)
        .await
        .expect("proxy should start");
    (running, shutdown)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Start a mock browser DevTools endpoint on an ephemeral port.
///
/// HTTP:
/// - `/json/version`, `/json/list`, `/json`: discovery payloads advertising
///   `ws://localhost:<port>/...`
/// - `/json/protocol`: a non-discovery body that also mentions a debugger URL
/// - `/headers`: echoes the request headers as JSON
///
/// WebSocket on `/devtools/*`: `"ping"` → `"pong"`, `"uri"` → request URI,
/// `"bye"` → close frame, `"drop"` → socket dropped, anything else echoed.
pub async fn start_mock_browser() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new()
        .route("/json/version", get(version))
        .route("/json/list", get(list))
        .route("/json", get(list))
        .route("/json/protocol", get(protocol))
        .route("/headers", any(headers))
        .route("/devtools/{*path}", any(devtools))
        .with_state(Arc::new(addr));

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn version(State(addr): State<Arc<SocketAddr>>) -> Json<Value> {
    Json(json!({
        "Browser": "Chrome/120.0.6099.109",
        "Protocol-Version": "1.3",
        "webSocketDebuggerUrl": format!("ws://localhost:{}/devtools/browser/abc", addr.port()),
    }))
}

async fn list(State(addr): State<Arc<SocketAddr>>) -> Json<Value> {
    let port = addr.port();
    Json(json!([
        {
            "id": "PAGE1",
            "type": "page",
            "url": "about:blank",
            "webSocketDebuggerUrl": format!("ws://localhost:{port}/devtools/page/PAGE1"),
        },
        {
            "id": "PAGE2",
            "type": "page",
            "url": "https://example.com/",
            "webSocketDebuggerUrl": format!("ws://localhost:{port}/devtools/page/PAGE2"),
        },
        {
            "id": "WORKER",
            "type": "service_worker",
            "url": "https://example.com/sw.js",
        },
    ]))
}

/// Deliberately odd spacing so byte-identity is observable.
pub const PROTOCOL_BODY: &str =
    "{ \"webSocketDebuggerUrl\" :  \"ws://localhost:1/devtools/browser/x\",\n  \"domains\": [] }";

async fn protocol() -> Response {
    ([("content-type", "application/json")], PROTOCOL_BODY).into_response()
}

async fn headers(headers: HeaderMap) -> Json<Value> {
    let mut map = Map::new();
    for name in headers.keys() {
        let values: Vec<Value> = headers
            .get_all(name)
            .iter()
            .map(|v| Value::String(v.to_str().unwrap_or_default().to_owned()))
            .collect();
        map.insert(name.as_str().to_owned(), Value::Array(values));
    }
    Json(Value::Object(map))
}

async fn devtools(
    uri: Uri,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Ok(upgrade) = upgrade else {
        return (StatusCode::BAD_REQUEST, "WebSocket only").into_response();
    };
    upgrade
        .max_message_size(MOCK_MAX_MESSAGE)
        .max_frame_size(MOCK_MAX_MESSAGE)
        .on_upgrade(move |socket| browser_session(socket, uri))
}

async fn browser_session(mut socket: WebSocket, uri: Uri) {
    while let Some(Ok(msg)) = socket.recv().await {
        let reply = match msg {
            Message::Text(text) => match text.as_str() {
                "ping" => Message::Text("pong".into()),
                "uri" => Message::Text(uri.to_string().into()),
                "bye" => {
                    let _ = socket.send(Message::Close(None)).await;
                    return;
                }
                "drop" => return,
                _ => Message::Text(text),
            },
            Message::Binary(data) => Message::Binary(data),
            Message::Close(_) => return,
            Message::Ping(_) | Message::Pong(_) => continue,
        };
        if socket.send(reply).await.is_err() {
            return;
        }
    }
}

/// Start a raw HTTP/1.1 backend on an ephemeral port; `respond` maps the
/// request head to the full response bytes. The connection is closed after.
pub async fn start_raw_backend<F>(respond: F) -> SocketAddr
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let respond = respond.clone();
            tokio::spawn(async move {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let response = respond(&String::from_utf8_lossy(&head));
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// `HTTP/1.1 <status>` response with a Content-Length body and extra headers.
pub fn raw_response(status: &str, extra_headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        body.len()
    );
    for (name, value) in extra_headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str("\r\n");
    response.push_str(body);
    response
}
