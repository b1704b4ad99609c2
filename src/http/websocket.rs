//! WebSocket tunnel establishment.
//!
//! # Responsibilities
//! - Complete the upgrade handshake with the client
//! - Open the companion WebSocket to the browser, same path and query
//! - Hand both channels to a [`Tunnel`]
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Proxy ←──── WebSocket frames ────→ Browser
//! ```
//!
//! # Design Decisions
//! - The client is upgraded first; if the browser then refuses, the client
//!   channel is closed with 1011 and no tunnel is created
//! - Handshake headers are regenerated for the browser, never copied
//! - Both sides accept messages up to the configured limit (>= 200 MiB)

use std::time::Duration;

use axum::body::Body;
use axum::extract::ws::{close_code, CloseFrame, Message as ClientMessage, WebSocket, WebSocketUpgrade};
use axum::extract::FromRequestParts;
use axum::http::uri::InvalidUri;
use axum::http::{header, HeaderMap, HeaderName, Request};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request as TargetRequest;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig as TargetConfig;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::config::{TimeoutConfig, WebSocketConfig};
use crate::http::request::{self, forward_headers};
use crate::http::response::bad_gateway;
use crate::observability::metrics;
use crate::routing::Target;
use crate::tunnel::{Session, SessionTracker, Tunnel, TunnelSettings};

type TargetSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Headers owned by each hop's own WebSocket handshake.
const HANDSHAKE_HEADERS: [HeaderName; 6] = [
    header::CONNECTION,
    header::UPGRADE,
    header::SEC_WEBSOCKET_KEY,
    header::SEC_WEBSOCKET_VERSION,
    header::SEC_WEBSOCKET_EXTENSIONS,
    header::SEC_WEBSOCKET_ACCEPT,
];

/// Failure to bring up the browser side of a tunnel.
#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error("Invalid target URI: {0}")]
    InvalidUri(#[from] InvalidUri),

    #[error("Invalid handshake request: {0}")]
    Request(#[source] tokio_tungstenite::tungstenite::Error),

    #[error("Browser handshake failed: {0}")]
    Handshake(#[source] tokio_tungstenite::tungstenite::Error),

    #[error("Browser handshake timed out after {0:?}")]
    Timeout(Duration),
}

/// Accepts WebSocket upgrades and tunnels them to the target.
#[derive(Clone)]
pub struct TunnelEndpoint {
    target: Target,
    max_message_bytes: usize,
    connect_timeout: Duration,
    settings: TunnelSettings,
    sessions: SessionTracker,
}

impl TunnelEndpoint {
    pub fn new(
        target: Target,
        websocket: &WebSocketConfig,
        timeouts: &TimeoutConfig,
        sessions: SessionTracker,
    ) -> Self {
        Self {
            target,
            max_message_bytes: websocket.max_message_bytes,
            connect_timeout: Duration::from_secs(timeouts.connect_secs),
            settings: TunnelSettings::from_config(websocket),
            sessions,
        }
    }

    /// Upgrade `request` and tunnel it once the client side is open.
    pub async fn accept(&self, request: Request<Body>) -> Response {
        let (mut parts, _body) = request.into_parts();
        let request_id = request::request_id(&parts.headers).to_owned();

        let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
            Ok(upgrade) => upgrade,
            Err(rejection) => {
                tracing::warn!(request_id = %request_id, error = %rejection, "Rejected WebSocket upgrade");
                return rejection.into_response();
            }
        };

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/")
            .to_owned();
        let target_request = match target_request(&self.target, &path_and_query, &parts.headers) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Cannot address browser WebSocket");
                return bad_gateway();
            }
        };

        tracing::info!(request_id = %request_id, path = %path_and_query, "WebSocket upgrade");

        let endpoint = self.clone();
        let failed_id = request_id.clone();
        upgrade
            .max_message_size(self.max_message_bytes)
            .max_frame_size(self.max_message_bytes)
            .on_failed_upgrade(move |e| {
                tracing::warn!(request_id = %failed_id, error = %e, "Client upgrade failed");
            })
            .on_upgrade(move |socket| endpoint.serve(socket, target_request, request_id))
    }

    async fn serve(self, mut client: WebSocket, request: TargetRequest, request_id: String) {
        let session = self.sessions.track();
        let id = session.id();

        let target = match self.connect(request).await {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!(session = %id, request_id = %request_id, target = %self.target, error = %e, "Browser WebSocket unavailable");
                metrics::record_upstream_failure("websocket");
                close_client(&mut client, &session, self.settings.close_timeout).await;
                return;
            }
        };

        tracing::info!(
            session = %id,
            request_id = %request_id,
            target = %self.target,
            active = self.sessions.active_count(),
            "WebSocket tunnel established"
        );
        let (client_sink, client_stream) = client.split();
        let (target_sink, target_stream) = target.split();
        Tunnel::new(session, self.settings)
            .run(client_sink, client_stream, target_sink, target_stream)
            .await;
    }

    async fn connect(&self, request: TargetRequest) -> Result<TargetSocket, TunnelError> {
        let config = TargetConfig::default()
            .max_message_size(Some(self.max_message_bytes))
            .max_frame_size(Some(self.max_message_bytes));
        let handshake = tokio_tungstenite::connect_async_with_config(request, Some(config), true);

        match tokio::time::timeout(self.connect_timeout, handshake).await {
            Ok(Ok((stream, _response))) => Ok(stream),
            Ok(Err(e)) => Err(TunnelError::Handshake(e)),
            Err(_) => Err(TunnelError::Timeout(self.connect_timeout)),
        }
    }
}

async fn close_client(client: &mut WebSocket, session: &Session, limit: Duration) {
    let frame = CloseFrame {
        code: close_code::ERROR,
        reason: "target unavailable".into(),
    };
    match tokio::time::timeout(limit, client.send(ClientMessage::Close(Some(frame)))).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::debug!(session = %session.id(), error = %e, "Failed to close client channel");
        }
        Err(_) => {
            tracing::warn!(session = %session.id(), "Client did not accept close frame in time");
        }
    }
}

/// Handshake request for the browser: same path and query, inbound headers
/// minus the ones each handshake generates for itself.
pub fn target_request(
    target: &Target,
    path_and_query: &str,
    inbound: &HeaderMap,
) -> Result<TargetRequest, TunnelError> {
    let mut request = target
        .ws_uri(path_and_query)?
        .into_client_request()
        .map_err(TunnelError::Request)?;
    request
        .headers_mut()
        .extend(forward_headers(inbound, target, &HANDSHAKE_HEADERS));
    Ok(request)
}
