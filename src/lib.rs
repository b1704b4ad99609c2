//! CDP reverse proxy library.
//!
//! Relays DevTools HTTP discovery requests (rewriting the advertised
//! `webSocketDebuggerUrl` to the proxy's public address) and tunnels
//! DevTools WebSocket sessions to a fixed browser endpoint.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod tunnel;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::{start, Running, Shutdown};
