//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for every inbound request
//! - Rebuild the inbound header list for the target
//! - Construct the outbound relay request
//!
//! # Design Decisions
//! - Headers are rebuilt per request as an ordered list; duplicates survive
//! - `Host` always names the target authority
//! - `Accept-Encoding` is withheld so the body we relay is never encoded

use axum::body::{Body, Bytes};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::routing::Target;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Read the correlation ID set by the request-id layer.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// The `Host` the client presented, if any.
pub fn client_host(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Copy `inbound` for the target, skipping `skip` and pinning `Host`.
pub fn forward_headers(inbound: &HeaderMap, target: &Target, skip: &[HeaderName]) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if name == header::HOST || skip.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers.insert(header::HOST, target.host_header());
    headers
}

/// Build the relay request for `parts` + `body` aimed at `target`.
pub fn build_outbound(
    parts: &Parts,
    body: Bytes,
    target: &Target,
) -> Result<Request<Body>, axum::http::Error> {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri = target.http_uri(path_and_query)?;

    let mut request = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .body(Body::from(body))?;
    *request.headers_mut() =
        forward_headers(&parts.headers, target, &[header::ACCEPT_ENCODING]);
    Ok(request)
}
