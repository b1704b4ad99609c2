//! Buffered HTTP relay to the browser.
//!
//! # Data Flow
//! ```text
//! client request
//!     → buffer body (limit → 400)
//!     → request.rs (rebuild headers, Host = target)
//!     → upstream exchange (timeout / refused → 502)
//!     → buffer upstream body (limit → 502)
//!     → discovery.rs (rewrite on 200 + discovery path + client Host)
//!     → response.rs (strip encodings, fix Content-Length)
//! ```
//!
//! # Design Decisions
//! - No retries and no connection reuse: one fresh exchange per request
//! - A body that fails to rewrite is relayed untouched

use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::config::{LimitsConfig, TimeoutConfig};
use crate::http::discovery::{self, RewriteError};
use crate::http::request::{self, build_outbound};
use crate::http::response::{bad_gateway, finalize};
use crate::observability::metrics;
use crate::routing::Target;

/// Forwards plain HTTP requests to the target.
#[derive(Clone)]
pub struct Relay {
    target: Target,
    client: Client<HttpConnector, Body>,
    request_timeout: Duration,
    limits: LimitsConfig,
}

impl Relay {
    pub fn new(target: Target, timeouts: &TimeoutConfig, limits: &LimitsConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .build(connector);

        Self {
            target,
            client,
            request_timeout: Duration::from_secs(timeouts.request_secs),
            limits: limits.clone(),
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Relay one request. Never fails: upstream problems become a 502.
    pub async fn forward(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let (parts, body) = request.into_parts();
        let request_id = request::request_id(&parts.headers).to_owned();
        let method = parts.method.clone();
        let path = parts.uri.path().to_owned();

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            "Relaying request"
        );

        let body = match axum::body::to_bytes(body, self.limits.max_request_body_bytes).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
                metrics::record_request(method.as_str(), 400, start);
                return (StatusCode::BAD_REQUEST, "Invalid request body").into_response();
            }
        };

        let outbound = match build_outbound(&parts, body, &self.target) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to build upstream request");
                return self.fail(&request_id, method.as_str(), "invalid_request", start);
            }
        };

        let upstream = match tokio::time::timeout(self.request_timeout, self.client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(request_id = %request_id, target = %self.target, error = %e, "Upstream request failed");
                return self.fail(&request_id, method.as_str(), "connect", start);
            }
            Err(_) => {
                tracing::error!(
                    request_id = %request_id,
                    target = %self.target,
                    timeout = ?self.request_timeout,
                    "Upstream request timed out"
                );
                return self.fail(&request_id, method.as_str(), "timeout", start);
            }
        };

        let (upstream_parts, upstream_body) = upstream.into_parts();
        let remaining = self.request_timeout.saturating_sub(start.elapsed());
        let read = axum::body::to_bytes(Body::new(upstream_body), self.limits.max_response_body_bytes);
        let body = match tokio::time::timeout(remaining, read).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                tracing::error!(request_id = %request_id, error = %e, "Failed to read upstream body");
                return self.fail(&request_id, method.as_str(), "body", start);
            }
            Err(_) => {
                tracing::error!(request_id = %request_id, "Upstream body timed out");
                return self.fail(&request_id, method.as_str(), "timeout", start);
            }
        };

        let status = upstream_parts.status;
        let (body, rewritten) = if discovery::should_rewrite(&path, status) {
            let host = request::client_host(&parts.headers);
            rewrite(&request_id, &path, host.as_deref(), body)
        } else {
            (body, false)
        };

        metrics::record_request(method.as_str(), status.as_u16(), start);
        tracing::debug!(
            request_id = %request_id,
            status = status.as_u16(),
            rewritten,
            duration_ms = start.elapsed().as_millis() as u64,
            "Relayed response"
        );
        finalize(upstream_parts, body, rewritten)
    }

    fn fail(&self, request_id: &str, method: &str, reason: &'static str, start: Instant) -> Response {
        metrics::record_upstream_failure(reason);
        metrics::record_request(method, 502, start);
        tracing::debug!(request_id = %request_id, reason, "Answering 502");
        bad_gateway()
    }
}

/// Rewrite a discovery body for the client's Host, falling back to `body`.
fn rewrite(request_id: &str, path: &str, host: Option<&str>, body: Bytes) -> (Bytes, bool) {
    // HEAD responses and empty 200s carry nothing to rewrite.
    if body.is_empty() {
        metrics::record_rewrite("empty");
        return (body, false);
    }
    let Some(host) = host else {
        tracing::debug!(request_id = %request_id, path = %path, "No Host header, discovery body left as is");
        metrics::record_rewrite("no_host");
        return (body, false);
    };

    match discovery::rewrite_debugger_urls(&body, host) {
        Ok(rewritten) => {
            metrics::record_rewrite("rewritten");
            (Bytes::from(rewritten), true)
        }
        Err(RewriteError::NoDebuggerUrl) => {
            tracing::debug!(request_id = %request_id, path = %path, "Discovery body has no debugger URL");
            metrics::record_rewrite("no_url");
            (body, false)
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, path = %path, error = %e, "Discovery rewrite failed, relaying body as is");
            metrics::record_rewrite("failed");
            (body, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    fn call(host: Option<&str>, body: &'static [u8]) -> (Bytes, bool) {
        rewrite("test", "/json/version", host, Bytes::from_static(body))
    }

    #[test]
    fn rewrites_for_client_host() {
        let (body, rewritten) = call(
            Some("proxy.example:9222"),
            br#"{"webSocketDebuggerUrl":"ws://localhost:9223/devtools/browser/abc"}"#,
        );
        assert!(rewritten);
        assert_eq!(
            &body[..],
            br#"{"webSocketDebuggerUrl":"ws://proxy.example:9222/devtools/browser/abc"}"#
        );
    }

    #[test]
    fn missing_host_leaves_body() {
        let original: &[u8] = br#"{"webSocketDebuggerUrl":"ws://localhost:9223/x"}"#;
        let (body, rewritten) = call(None, br#"{"webSocketDebuggerUrl":"ws://localhost:9223/x"}"#);
        assert!(!rewritten);
        assert_eq!(&body[..], original);
    }

    #[test]
    fn malformed_json_passes_through() {
        let (body, rewritten) = call(Some("proxy:1"), b"{not json");
        assert!(!rewritten);
        assert_eq!(&body[..], b"{not json");
    }

    #[test]
    fn empty_body_is_not_parsed() {
        let (body, rewritten) = call(Some("proxy:1"), b"");
        assert!(!rewritten);
        assert!(body.is_empty());
    }

    #[test]
    fn payload_without_url_passes_through() {
        let (body, rewritten) = call(Some("proxy:1"), br#"{"Browser":"Chrome/120"}"#);
        assert!(!rewritten);
        assert_eq!(&body[..], br#"{"Browser":"Chrome/120"}"#);
    }

    #[tokio::test]
    async fn refused_connection_is_bad_gateway() {
        // Bind then drop to get a port nothing listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let relay = Relay::new(
            Target::new("127.0.0.1", port).unwrap(),
            &TimeoutConfig::default(),
            &LimitsConfig::default(),
        );
        let request = Request::builder()
            .uri("/json/version")
            .header(header::HOST, "proxy.example:9222")
            .body(Body::empty())
            .unwrap();

        let response = relay.forward(request).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn oversized_request_body_is_rejected() {
        let limits = LimitsConfig {
            max_request_body_bytes: 4,
            ..LimitsConfig::default()
        };
        let relay = Relay::new(
            Target::new("127.0.0.1", 9).unwrap(),
            &TimeoutConfig::default(),
            &limits,
        );
        let request = Request::builder()
            .method("POST")
            .uri("/json/new")
            .body(Body::from("far too long"))
            .unwrap();

        let response = relay.forward(request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
