//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (headers)
//!     → matcher.rs (is this a WebSocket upgrade?)
//!     → router.rs (Route::Relay | Route::Tunnel)
//!     → target.rs supplies the destination authority to either handler
//! ```
//!
//! # Design Decisions
//! - Single fixed target, resolved once at startup
//! - Deterministic: same headers always yield the same route
//! - No per-path routing; every path is wildcard-routed

pub mod matcher;
pub mod router;
pub mod target;

pub use matcher::is_websocket_upgrade;
pub use router::Route;
pub use target::{Target, TargetError};
