//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Smallest single WebSocket message the tunnel must be able to carry.
///
/// Browser automation clients ship whole DOM snapshots in one message.
pub const MIN_MESSAGE_BYTES: usize = 200 * 1024 * 1024;

/// Root configuration for the CDP proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Public listener (the port clients connect to).
    pub listener: ListenerConfig,

    /// The browser's private DevTools endpoint.
    pub target: TargetConfig,

    /// Upstream timeouts.
    pub timeouts: TimeoutConfig,

    /// WebSocket tunnel settings.
    pub websocket: WebSocketConfig,

    /// Buffered body limits for the HTTP relay.
    pub limits: LimitsConfig,

    /// Browser restart endpoint.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9222").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9222".to_string(),
        }
    }
}

/// Location of the real CDP endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Host the browser listens on.
    pub host: String,

    /// Port the browser listens on.
    pub port: u16,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9223,
        }
    }
}

/// Timeout configuration for upstream operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds (HTTP connect, WS handshake).
    pub connect_secs: u64,

    /// Total time allowed for one upstream HTTP exchange, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// WebSocket tunnel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Maximum size of a single message (and frame) in bytes.
    pub max_message_bytes: usize,

    /// Keep-alive ping interval in seconds. 0 disables probing.
    pub heartbeat_secs: u64,

    /// Deadline in seconds for shutting down each side of a finished tunnel.
    pub close_timeout_secs: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: MIN_MESSAGE_BYTES,
            heartbeat_secs: 30,
            close_timeout_secs: 10,
        }
    }
}

/// Body size limits for the buffered HTTP relay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound request body in bytes.
    pub max_request_body_bytes: usize,

    /// Maximum upstream response body in bytes.
    pub max_response_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_body_bytes: 200 * 1024 * 1024,
            max_response_body_bytes: 200 * 1024 * 1024,
        }
    }
}

/// Browser restart endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the restart endpoint.
    pub enabled: bool,

    /// Admin bind address.
    pub bind_address: String,

    /// Optional bearer token. When unset the endpoint is unauthenticated.
    pub api_key: Option<String>,

    /// Human-readable name of the supervised browser process.
    pub process_name: String,

    /// Program and arguments that restart the browser.
    pub restart_command: Vec<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:9221".to_string(),
            api_key: None,
            process_name: "Chromium".to_string(),
            restart_command: vec![
                "supervisorctl".to_string(),
                "-c".to_string(),
                "/config/supervisord.conf".to_string(),
                "restart".to_string(),
                "Chromium".to_string(),
            ],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: ProxyConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:9222");
        assert_eq!(config.target.host, "localhost");
        assert_eq!(config.target.port, 9223);
        assert_eq!(config.websocket.max_message_bytes, MIN_MESSAGE_BYTES);
        assert_eq!(config.websocket.heartbeat_secs, 30);
        assert!(config.admin.api_key.is_none());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [target]
            port = 9333

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.target.host, "localhost");
        assert_eq!(config.target.port, 9333);
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.log_level, "info");
    }
}
