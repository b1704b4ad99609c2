//! Response handling and transformation.
//!
//! # Responsibilities
//! - Turn a buffered upstream response into the client response
//! - Strip encoding headers that no longer describe the relayed body
//! - Map upstream failures to 502 Bad Gateway
//!
//! # Design Decisions
//! - Bodies are fully buffered; `Transfer-Encoding` never applies to them
//! - `Content-Length` is recomputed only when the body was rewritten

use axum::body::{Body, Bytes};
use axum::http::response::Parts;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

/// Remove headers describing an encoding the relay does not apply.
pub fn strip_encoding_headers(headers: &mut HeaderMap) {
    headers.remove(header::CONTENT_ENCODING);
    headers.remove(header::TRANSFER_ENCODING);
}

/// Assemble the client response from upstream `parts` and a buffered `body`.
pub fn finalize(mut parts: Parts, body: Bytes, rewritten: bool) -> Response {
    strip_encoding_headers(&mut parts.headers);
    if rewritten {
        parts
            .headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    }
    Response::from_parts(parts, Body::from(body))
}

/// Plain-text 502 for unreachable or failing upstreams.
pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
}
