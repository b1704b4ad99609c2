//! The browser's private DevTools endpoint.

use std::fmt;

use axum::http::header::InvalidHeaderValue;
use axum::http::uri::{Authority, InvalidUri};
use axum::http::{HeaderValue, Uri};

use crate::config::TargetConfig;

/// Why a `(host, port)` pair cannot be used as the target.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("not a valid authority: {0}")]
    Authority(#[from] InvalidUri),

    #[error("not a valid Host header: {0}")]
    HostHeader(#[from] InvalidHeaderValue),
}

/// Fixed destination of every proxied request and tunnel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    authority: Authority,
    host_header: HeaderValue,
}

impl Target {
    /// Create a target, checking that `host:port` forms a valid authority
    /// and `Host` header.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, TargetError> {
        let host = host.into();
        let authority = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };
        let authority = authority.parse::<Authority>()?;
        let host_header = HeaderValue::from_str(authority.as_str())?;
        Ok(Self {
            host,
            authority,
            host_header,
        })
    }

    pub fn from_config(config: &TargetConfig) -> Result<Self, TargetError> {
        Self::new(config.host.clone(), config.port)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// `host:port`.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// The authority as sent in the outbound `Host` header.
    pub fn host_header(&self) -> HeaderValue {
        self.host_header.clone()
    }

    /// `http://host:port{path_and_query}`.
    pub fn http_uri(&self, path_and_query: &str) -> Result<Uri, InvalidUri> {
        format!("http://{}{}", self.authority, path_and_query).parse()
    }

    /// `ws://host:port{path_and_query}`.
    pub fn ws_uri(&self, path_and_query: &str) -> Result<Uri, InvalidUri> {
        format!("ws://{}{}", self.authority, path_and_query).parse()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.authority.as_str())
    }
}
