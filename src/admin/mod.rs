//! Administrative endpoint for restarting the browser.
//!
//! Served on its own listener; the proxy itself never calls it.
//!
//! ```text
//! POST /restart-chromium  → run restart_command
//! non-POST <any path>     → 405, Allow: POST
//! POST <other path>       → 404
//! ```

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::post, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::AdminConfig;

use self::auth::admin_auth_middleware;
use self::handlers::{fallback, method_not_allowed, restart_browser};

/// Path of the restart endpoint.
pub const RESTART_PATH: &str = "/restart-chromium";

/// State shared by admin handlers.
#[derive(Debug, Clone)]
pub struct AdminState {
    pub config: Arc<AdminConfig>,
}

impl AdminState {
    pub fn new(config: AdminConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

pub fn setup_admin_router(state: AdminState) -> Router {
    Router::new()
        .route(
            RESTART_PATH,
            post(restart_browser).fallback(method_not_allowed),
        )
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

/// Serve the admin router until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    tracing::info!(address = %listener.local_addr()?, "Admin server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    tracing::info!("Admin server stopped");
    Ok(())
}
