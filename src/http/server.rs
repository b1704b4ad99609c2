//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (request ID, tracing)
//! - Dispatch each request to the relay or the tunnel
//! - Serve until shutdown is signalled

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, Request},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::relay::Relay;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::http::websocket::TunnelEndpoint;
use crate::routing::{Route, Target};
use crate::tunnel::SessionTracker;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub relay: Relay,
    pub tunnels: TunnelEndpoint,
}

impl AppState {
    pub fn new(config: &ProxyConfig, target: Target) -> Self {
        Self {
            relay: Relay::new(target.clone(), &config.timeouts, &config.limits),
            tunnels: TunnelEndpoint::new(
                target,
                &config.websocket,
                &config.timeouts,
                SessionTracker::new(),
            ),
        }
    }
}

/// HTTP server for the CDP proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server for `target`.
    pub fn new(config: &ProxyConfig, target: Target) -> Self {
        let state = AppState::new(config, target);
        let router = build_router(state.clone());
        Self { router, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            target = %self.state.relay.target(),
            "CDP proxy listening"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Proxy server shutting down");
            })
            .await?;

        tracing::info!("Proxy server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static(X_REQUEST_ID);
    Router::new()
        .route("/{*path}", any(proxy_handler))
        .route("/", any(proxy_handler))
        .with_state(state)
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, UuidRequestId))
}

/// Catch-all handler: upgrades go to the tunnel, everything else is relayed.
async fn proxy_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Response {
    let route = Route::for_headers(request.headers());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    tracing::trace!(
        peer = ?peer,
        route = ?route,
        path = %request.uri().path(),
        "Dispatching"
    );

    match route {
        Route::Tunnel => state.tunnels.accept(request).await,
        Route::Relay => state.relay.forward(request).await,
    }
}
