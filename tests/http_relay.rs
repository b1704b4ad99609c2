//! End-to-end tests for the HTTP relay and discovery rewrite.

use axum::http::{header, StatusCode};
use serde_json::Value;

mod common;

#[tokio::test]
async fn version_url_points_at_client_host() {
    let browser = common::start_mock_browser().await;
    let (proxy, _shutdown) = common::start_proxy(browser).await;

    let res = common::http_client()
        .get(format!("http://{}/json/version", proxy.proxy_addr))
        .header(header::HOST, "proxy.example:9222")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let length: usize = res.headers()[header::CONTENT_LENGTH]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    let body = res.bytes().await.unwrap();
    assert_eq!(length, body.len());

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        json["webSocketDebuggerUrl"],
        "ws://proxy.example:9222/devtools/browser/abc"
    );
    assert_eq!(json["Browser"], "Chrome/120.0.6099.109");
}

#[tokio::test]
async fn list_rewrites_every_entry_with_a_url() {
    let browser = common::start_mock_browser().await;
    let (proxy, _shutdown) = common::start_proxy(browser).await;
    let client = common::http_client();

    for path in ["/json/list", "/json"] {
        let json: Value = client
            .get(format!("http://{}{path}", proxy.proxy_addr))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        let entries = json.as_array().expect("list stays a list");
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0]["webSocketDebuggerUrl"],
            format!("ws://{}/devtools/page/PAGE1", proxy.proxy_addr)
        );
        assert_eq!(
            entries[1]["webSocketDebuggerUrl"],
            format!("ws://{}/devtools/page/PAGE2", proxy.proxy_addr)
        );
        assert!(entries[2].get("webSocketDebuggerUrl").is_none());
        assert_eq!(entries[2]["url"], "https://example.com/sw.js");
    }
}

#[tokio::test]
async fn rewrite_is_idempotent_per_host() {
    let browser = common::start_mock_browser().await;
    let (proxy, _shutdown) = common::start_proxy(browser).await;
    let client = common::http_client();

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let body = client
            .get(format!("http://{}/json/version", proxy.proxy_addr))
            .header(header::HOST, "devtools.internal:443")
            .send()
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        bodies.push(body);
    }
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn other_paths_are_byte_identical() {
    let browser = common::start_mock_browser().await;
    let (proxy, _shutdown) = common::start_proxy(browser).await;

    let body = common::http_client()
        .get(format!("http://{}/json/protocol", proxy.proxy_addr))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, common::PROTOCOL_BODY);
}

#[tokio::test]
async fn head_on_discovery_keeps_upstream_length() {
    let backend = common::start_raw_backend(|head| {
        assert!(head.starts_with("HEAD /json/version "));
        "HTTP/1.1 200 OK\r\n\
         Content-Type: application/json\r\n\
         Content-Length: 42\r\n\
         Connection: close\r\n\
         \r\n"
            .to_string()
    })
    .await;
    let (proxy, _shutdown) = common::start_proxy(backend).await;

    let res = common::http_client()
        .head(format!("http://{}/json/version", proxy.proxy_addr))
        .header(header::HOST, "proxy.example:9222")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_LENGTH], "42");
    assert!(res.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn non_200_discovery_response_is_untouched() {
    let body = r#"{"webSocketDebuggerUrl":"ws://localhost:9223/devtools/browser/abc"}"#;
    let backend = common::start_raw_backend(move |_| {
        common::raw_response("404 Not Found", &[], body)
    })
    .await;
    let (proxy, _shutdown) = common::start_proxy(backend).await;

    let res = common::http_client()
        .get(format!("http://{}/json/version", proxy.proxy_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), body);
}

#[tokio::test]
async fn malformed_discovery_body_passes_through() {
    let backend = common::start_raw_backend(|_| {
        common::raw_response("200 OK", &[], "{\"webSocketDebuggerUrl\": ")
    })
    .await;
    let (proxy, _shutdown) = common::start_proxy(backend).await;

    let res = common::http_client()
        .get(format!("http://{}/json/version", proxy.proxy_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "{\"webSocketDebuggerUrl\": ");
}

#[tokio::test]
async fn encoding_headers_are_stripped() {
    let backend = common::start_raw_backend(|_| {
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/plain\r\n\
         Content-Encoding: identity\r\n\
         Transfer-Encoding: chunked\r\n\
         Connection: close\r\n\
         \r\n\
         5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n"
            .to_string()
    })
    .await;
    let (proxy, _shutdown) = common::start_proxy(backend).await;

    let res = common::http_client()
        .get(format!("http://{}/anything", proxy.proxy_addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(header::CONTENT_ENCODING).is_none());
    assert!(res.headers().get(header::TRANSFER_ENCODING).is_none());
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(res.text().await.unwrap(), "hello world");
}

#[tokio::test]
async fn request_headers_reach_the_target() {
    let browser = common::start_mock_browser().await;
    let (proxy, _shutdown) = common::start_proxy(browser).await;

    let json: Value = common::http_client()
        .post(format!("http://{}/headers", proxy.proxy_addr))
        .header(header::HOST, "proxy.example:9222")
        .header(header::ACCEPT_ENCODING, "gzip, br")
        .header("x-devtools-client", "one")
        .header("x-devtools-client", "two")
        .body("{}")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(json["host"][0], browser.to_string());
    assert!(json.get("accept-encoding").is_none());
    assert_eq!(json["x-devtools-client"], serde_json::json!(["one", "two"]));
    assert!(json.get("x-request-id").is_some());
}

#[tokio::test]
async fn refused_target_is_bad_gateway() {
    let target = format!("127.0.0.1:{}", common::dead_port()).parse().unwrap();
    let (proxy, _shutdown) = common::start_proxy(target).await;

    let res = common::http_client()
        .get(format!("http://{}/json/version", proxy.proxy_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert!(res.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn upstream_status_and_headers_are_relayed() {
    let backend = common::start_raw_backend(|head| {
        assert!(head.starts_with("DELETE /json/close/PAGE1 "));
        common::raw_response("418 I'm a teapot", &[("X-Browser", "mock")], "short and stout")
    })
    .await;
    let (proxy, _shutdown) = common::start_proxy(backend).await;

    let res = common::http_client()
        .delete(format!("http://{}/json/close/PAGE1", proxy.proxy_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 418);
    assert_eq!(res.headers()["x-browser"], "mock");
    assert_eq!(res.text().await.unwrap(), "short and stout");
}
