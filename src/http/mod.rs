//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → routing (Upgrade: websocket?)
//!         ├─ relay.rs
//!         │     → request.rs (rebuild headers for the target)
//!         │     → discovery.rs (webSocketDebuggerUrl rewrite)
//!         │     → response.rs (strip encodings, fix length)
//!         └─ websocket.rs (upgrade, browser handshake)
//!               → tunnel
//! ```

pub mod discovery;
pub mod relay;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use relay::Relay;
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{build_router, AppState, HttpServer};
pub use websocket::{TunnelEndpoint, TunnelError};
