//! Protocol-upgrade detection.
//!
//! # Responsibilities
//! - Recognise WebSocket upgrade requests from their headers
//!
//! # Design Decisions
//! - Header value comparison is case-insensitive (`WebSocket`, `websocket`)
//! - Only the `Upgrade` header is consulted; `Connection` is left to the
//!   handshake extractor, which rejects inconsistent requests itself

use axum::http::{header, HeaderMap};

/// Returns true if the request asks to be upgraded to a WebSocket.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}
