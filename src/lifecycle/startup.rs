//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve the target and install the metrics exporter
//! - Bind the proxy listener, and the admin listener when enabled
//! - Spawn both servers against a shared [`Shutdown`]
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Every listener is bound before any server is spawned

use std::net::SocketAddr;

use tokio::task::JoinHandle;

use crate::admin;
use crate::config::ProxyConfig;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::net::{self, ListenerError};
use crate::observability::metrics;
use crate::routing::{Target, TargetError};

/// Errors that prevent the proxy from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Invalid target: {0}")]
    Target(#[from] TargetError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("Invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Handles to the started servers.
#[derive(Debug)]
pub struct Running {
    pub proxy_addr: SocketAddr,
    pub admin_addr: Option<SocketAddr>,
    tasks: Vec<JoinHandle<()>>,
}

impl Running {
    /// Wait for every server task to finish.
    pub async fn wait(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Server task failed");
            }
        }
    }
}

/// Bind listeners and spawn the servers.
pub async fn start(config: &ProxyConfig, shutdown: &Shutdown) -> Result<Running, StartupError> {
    let target = Target::from_config(&config.target)?;

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    let (proxy_listener, proxy_addr) = net::bind(&config.listener.bind_address, "proxy").await?;
    let admin = if config.admin.enabled {
        Some(net::bind(&config.admin.bind_address, "admin").await?)
    } else {
        None
    };
    let admin_addr = admin.as_ref().map(|(_, addr)| *addr);

    let mut tasks = Vec::with_capacity(2);

    let server = HttpServer::new(config, target.clone());
    let proxy_shutdown = shutdown.subscribe();
    tasks.push(tokio::spawn(async move {
        if let Err(e) = server.run(proxy_listener, proxy_shutdown).await {
            tracing::error!(error = %e, "Proxy server failed");
        }
    }));

    if let Some((listener, _)) = admin {
        let router = admin::setup_admin_router(admin::AdminState::new(config.admin.clone()));
        let admin_shutdown = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = admin::serve(listener, router, admin_shutdown).await {
                tracing::error!(error = %e, "Admin server failed");
            }
        }));
    }

    tracing::info!(
        proxy = %proxy_addr,
        admin = ?admin_addr,
        target = %target,
        "CDP proxy started"
    );

    Ok(Running {
        proxy_addr,
        admin_addr,
        tasks,
    })
}
