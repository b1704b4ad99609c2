//! Discovery response rewriting.
//!
//! The browser advertises `webSocketDebuggerUrl`s that point at its private
//! port. Clients must instead dial the proxy, so the authority of each URL is
//! replaced with the `Host` the client used to reach us.
//!
//! # Design Decisions
//! - Typed parse: a body is either one object or a list of objects
//! - Any shape mismatch is an error; the caller forwards the original bytes
//! - Only the authority changes; scheme, path, query and fragment are kept
//!   byte-for-byte

use axum::http::uri::Authority;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field carrying the WebSocket URL of a debuggable target.
pub const DEBUGGER_URL_KEY: &str = "webSocketDebuggerUrl";

/// Endpoints whose bodies carry debugger URLs.
pub const DISCOVERY_PATHS: [&str; 3] = ["/json", "/json/list", "/json/version"];

/// Why a discovery body was forwarded untouched.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("body is not a discovery payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("`webSocketDebuggerUrl` is not a string")]
    NotAString,

    #[error("`{0}` has no scheme://authority prefix")]
    InvalidUrl(String),

    #[error("Host header `{0}` is not a valid authority")]
    InvalidHost(String),

    #[error("no `webSocketDebuggerUrl` entries present")]
    NoDebuggerUrl,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
enum DiscoveryPayload {
    List(Vec<Map<String, Value>>),
    Single(Map<String, Value>),
}

impl DiscoveryPayload {
    fn entries_mut(&mut self) -> &mut [Map<String, Value>] {
        match self {
            DiscoveryPayload::List(entries) => entries,
            DiscoveryPayload::Single(entry) => std::slice::from_mut(entry),
        }
    }
}

/// Exact match against the discovery endpoints.
pub fn is_discovery_path(path: &str) -> bool {
    DISCOVERY_PATHS.contains(&path)
}

/// Whether a response to `path` with `status` is a rewrite candidate.
pub fn should_rewrite(path: &str, status: StatusCode) -> bool {
    status == StatusCode::OK && is_discovery_path(path)
}

/// Point every debugger URL in `body` at `host`, returning the new body.
///
/// A single object stays an object and a list stays a list.
pub fn rewrite_debugger_urls(body: &[u8], host: &str) -> Result<Vec<u8>, RewriteError> {
    host.parse::<Authority>()
        .map_err(|_| RewriteError::InvalidHost(host.to_string()))?;

    let mut payload: DiscoveryPayload = serde_json::from_slice(body)?;
    let mut rewritten = 0usize;

    for entry in payload.entries_mut() {
        let Some(value) = entry.get_mut(DEBUGGER_URL_KEY) else {
            continue;
        };
        let url = value.as_str().ok_or(RewriteError::NotAString)?;
        *value = Value::String(replace_authority(url, host)?);
        rewritten += 1;
    }

    if rewritten == 0 {
        return Err(RewriteError::NoDebuggerUrl);
    }

    tracing::debug!(host = %host, rewritten, "Rewrote webSocketDebuggerUrl entries");
    Ok(serde_json::to_vec(&payload)?)
}

/// Replace the `host:port` part of `url` with `authority`.
pub fn replace_authority(url: &str, authority: &str) -> Result<String, RewriteError> {
    let invalid = || RewriteError::InvalidUrl(url.to_string());

    let (scheme, rest) = url.split_once("://").ok_or_else(invalid)?;
    let scheme_ok = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !scheme_ok {
        return Err(invalid());
    }

    let end = rest
        .find(|c: char| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());
    if end == 0 {
        return Err(invalid());
    }

    Ok(format!("{scheme}://{authority}{}", &rest[end..]))
}
