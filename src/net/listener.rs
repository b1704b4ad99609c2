//! TCP listener binding.
//!
//! # Responsibilities
//! - Parse and bind configured addresses
//! - Report bind failures as fatal startup errors

use std::net::SocketAddr;

use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// Address did not parse.
    #[error("Invalid listen address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Failed to bind to address.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Parse `address`, bind it and return the listener with its bound address.
///
/// Port 0 binds an ephemeral port.
pub async fn bind(
    address: &str,
    name: &'static str,
) -> Result<(TcpListener, SocketAddr), ListenerError> {
    let addr: SocketAddr = address.parse().map_err(|source| ListenerError::Address {
        address: address.to_string(),
        source,
    })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    tracing::info!(listener = name, address = %local_addr, "Listener bound");
    Ok((listener, local_addr))
}
