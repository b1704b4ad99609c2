//! CDP reverse proxy.
//!
//! Exposes a browser's private DevTools endpoint on a public address.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────┐
//!                          │                    CDP PROXY                      │
//!                          │                                                   │
//!   Client request         │  ┌─────────┐    ┌─────────┐    ┌──────────────┐  │
//!   ───────────────────────┼─▶│   net   │───▶│  http   │───▶│   routing    │  │
//!                          │  │listener │    │ server  │    │ upgrade?     │  │
//!                          │  └─────────┘    └─────────┘    └──┬────────┬──┘  │
//!                          │                                   │        │     │
//!                          │                      plain HTTP   ▼        ▼ WS  │
//!                          │                         ┌──────────┐  ┌────────┐ │
//!   Client response        │                         │  relay + │  │ tunnel │ │
//!   ◀──────────────────────┼─────────────────────────│ discovery│  │ 2 pumps│◀┼──▶ Browser
//!                          │                         └──────────┘  └────────┘ │    (DevTools)
//!                          │                                                   │
//!                          │  config · lifecycle · observability · admin       │
//!                          └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use cdp_proxy::config::{self, ConfigError, ProxyConfig};
use cdp_proxy::lifecycle::{self, signals, Shutdown};
use cdp_proxy::observability::logging;

#[derive(Parser)]
#[command(name = "cdp-proxy")]
#[command(about = "Reverse proxy for the Chrome DevTools Protocol", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Public listen address, e.g. 0.0.0.0:9222.
    #[arg(long)]
    listen: Option<String>,

    /// Browser DevTools host.
    #[arg(long)]
    target_host: Option<String>,

    /// Browser DevTools port.
    #[arg(long)]
    target_port: Option<u16>,
}

impl Args {
    fn load(&self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => config::load_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(listen) = &self.listen {
            config.listener.bind_address = listen.clone();
        }
        if let Some(host) = &self.target_host {
            config.target.host = host.clone();
        }
        if let Some(port) = self.target_port {
            config.target.port = port;
        }

        config::validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = args.load()?;

    logging::init(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cdp-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        target = %format!("{}:{}", config.target.host, config.target.port),
        admin_enabled = config.admin.enabled,
        heartbeat_secs = config.websocket.heartbeat_secs,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let running = lifecycle::start(&config, &shutdown).await?;

    signals::wait_for_shutdown_signal().await;
    shutdown.trigger();
    running.wait().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
