//! Request dispatch.
//!
//! # Responsibilities
//! - Decide between the HTTP relay and the WebSocket tunnel
//!
//! # Design Decisions
//! - Pure function of the request headers; no path-based branching
//! - Discovery paths (`/json`, `/json/list`, `/json/version`) go through the
//!   same rule as every other path

use axum::http::HeaderMap;

use crate::routing::matcher::is_websocket_upgrade;

/// Where an inbound request is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Plain request/response exchange.
    Relay,
    /// Upgraded, long-lived frame relay.
    Tunnel,
}

impl Route {
    /// Pick the handler for a request with the given headers.
    pub fn for_headers(headers: &HeaderMap) -> Self {
        if is_websocket_upgrade(headers) {
            Route::Tunnel
        } else {
            Route::Relay
        }
    }
}
