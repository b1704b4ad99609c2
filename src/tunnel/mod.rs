//! WebSocket tunnel subsystem.
//!
//! # Data Flow
//! ```text
//!                 ┌──────────── target→client pump ────────────┐
//! Client (axum) ◀─┤                                             ├─◀ Browser (tungstenite)
//!               ─▶┤                                             ├▶─
//!                 └──────────── client→target pump ────────────┘
//!                          shared TerminationSignal
//! ```
//!
//! # Lifecycle
//! 1. Both pumps are spawned (`Forwarding`)
//! 2. The first pump to exit raises the signal (`Draining`)
//! 3. The other pump is aborted and joined before anything is closed
//! 4. Client channel shut down, then the browser channel (`Closed`); a side
//!    that started the closing handshake gets its reply flushed. Each shutdown
//!    is bounded by the close timeout; a channel that misses it is dropped
//!
//! # Design Decisions
//! - Rendezvous is "first of two join handles, then abort + join the loser";
//!   joining guarantees no write is in flight when sockets are closed
//! - Transport errors end a pump normally; they never escape the tunnel
//! - Cleanup failures are logged and swallowed

pub mod frame;
pub mod pump;
pub mod session;
pub mod signal;

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message as ClientMessage;
use futures_util::{Sink, Stream};
use tokio::task::JoinError;
use tokio::time;
use tokio_tungstenite::tungstenite::Message as TargetMessage;

use crate::config::WebSocketConfig;
use crate::observability::metrics;

pub use pump::{Direction, Exit};
pub use session::{Session, SessionId, SessionState, SessionTracker};
pub use signal::TerminationSignal;

use pump::{Outbound, Pump};

/// Per-tunnel settings.
#[derive(Debug, Clone, Copy)]
pub struct TunnelSettings {
    /// Keep-alive probe period; `None` disables probing.
    pub heartbeat: Option<Duration>,
    /// Upper bound on shutting down each channel at teardown.
    pub close_timeout: Duration,
}

impl TunnelSettings {
    pub fn from_config(config: &WebSocketConfig) -> Self {
        Self {
            heartbeat: (config.heartbeat_secs > 0)
                .then(|| Duration::from_secs(config.heartbeat_secs)),
            close_timeout: Duration::from_secs(config.close_timeout_secs),
        }
    }
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self::from_config(&WebSocketConfig::default())
    }
}

/// How a tunnel ended.
#[derive(Debug, Clone)]
pub struct TunnelReport {
    pub session: SessionId,
    pub state: SessionState,
    /// Direction whose pump exited first.
    pub first: Direction,
    pub first_exit: Exit,
    pub other_exit: Exit,
    pub frames_to_client: u64,
    pub frames_to_target: u64,
}

/// Bridges one client channel with one browser channel.
pub struct Tunnel {
    session: Session,
    settings: TunnelSettings,
}

impl Tunnel {
    pub fn new(session: Session, settings: TunnelSettings) -> Self {
        Self { session, settings }
    }

    /// Relay frames until either side ends, then tear both sides down.
    pub async fn run<CK, CS, CE, TK, TS, TE>(
        mut self,
        client_sink: CK,
        client_stream: CS,
        target_sink: TK,
        target_stream: TS,
    ) -> TunnelReport
    where
        CK: Sink<ClientMessage> + Send + Unpin + 'static,
        CK::Error: Display + Send + 'static,
        CS: Stream<Item = Result<ClientMessage, CE>> + Send + Unpin + 'static,
        CE: Display + Send + 'static,
        TK: Sink<TargetMessage> + Send + Unpin + 'static,
        TK::Error: Display + Send + 'static,
        TS: Stream<Item = Result<TargetMessage, TE>> + Send + Unpin + 'static,
        TE: Display + Send + 'static,
    {
        let id = self.session.id();
        let signal = TerminationSignal::new();
        let client_out = Arc::new(Outbound::new(client_sink));
        let target_out = Arc::new(Outbound::new(target_sink));
        let to_client = Arc::new(AtomicU64::new(0));
        let to_target = Arc::new(AtomicU64::new(0));

        self.session.advance(SessionState::Forwarding);

        let mut to_client_task = tokio::spawn(
            Pump {
                direction: Direction::TargetToClient,
                source: target_stream,
                source_closed: target_out.closed_flag(),
                sink: Arc::clone(&client_out),
                classify: frame::from_target,
                signal: signal.clone(),
                heartbeat: self.settings.heartbeat,
                forwarded: Arc::clone(&to_client),
            }
            .run(),
        );
        let mut to_target_task = tokio::spawn(
            Pump {
                direction: Direction::ClientToTarget,
                source: client_stream,
                source_closed: client_out.closed_flag(),
                sink: Arc::clone(&target_out),
                classify: frame::from_client,
                signal: signal.clone(),
                heartbeat: self.settings.heartbeat,
                forwarded: Arc::clone(&to_target),
            }
            .run(),
        );

        let (first, first_result) = tokio::select! {
            result = &mut to_client_task => (Direction::TargetToClient, result),
            result = &mut to_target_task => (Direction::ClientToTarget, result),
        };
        let first_exit = exit_of(id, first, first_result);

        // A panicking pump never reached its own raise.
        signal.raise();
        self.session.advance(SessionState::Draining);

        let loser = match first {
            Direction::TargetToClient => &mut to_target_task,
            Direction::ClientToTarget => &mut to_client_task,
        };
        loser.abort();
        let other_exit = exit_of(id, first.opposite(), loser.await);

        // A stalled client must not keep the browser side open.
        let close_timeout = self.settings.close_timeout;
        shut_down(id, "client", close_timeout, client_out.close::<ClientMessage>()).await;
        shut_down(id, "browser", close_timeout, target_out.close::<TargetMessage>()).await;
        drop(client_out);
        drop(target_out);
        self.session.advance(SessionState::Closed);

        let report = TunnelReport {
            session: id,
            state: self.session.state(),
            first,
            first_exit,
            other_exit,
            frames_to_client: to_client.load(Ordering::Relaxed),
            frames_to_target: to_target.load(Ordering::Relaxed),
        };

        metrics::record_frames(Direction::TargetToClient.as_str(), report.frames_to_client);
        metrics::record_frames(Direction::ClientToTarget.as_str(), report.frames_to_target);
        metrics::tunnel_closed(first_exit.as_str());

        tracing::info!(
            session = %id,
            first = %report.first,
            first_exit = first_exit.as_str(),
            other_exit = other_exit.as_str(),
            frames_to_client = report.frames_to_client,
            frames_to_target = report.frames_to_target,
            "WebSocket tunnel closed"
        );
        report
    }
}

/// Await one channel's shutdown, bounded by `limit`. Failures are logged only.
async fn shut_down<F, E>(id: SessionId, side: &'static str, limit: Duration, close: F)
where
    F: Future<Output = Result<bool, E>>,
    E: Display,
{
    match time::timeout(limit, close).await {
        Ok(Ok(_)) => {}
        // Either side may already be gone.
        Ok(Err(e)) => {
            tracing::debug!(session = %id, side, error = %e, "Failed to close channel");
        }
        Err(_) => {
            metrics::record_close_timeout(side);
            tracing::warn!(
                session = %id,
                side,
                timeout_secs = limit.as_secs_f64(),
                "Channel did not close in time, dropping it"
            );
        }
    }
}

fn exit_of(id: SessionId, direction: Direction, result: Result<Exit, JoinError>) -> Exit {
    match result {
        Ok(exit) => exit,
        Err(e) if e.is_cancelled() => Exit::Cancelled,
        Err(e) => {
            tracing::error!(session = %id, direction = %direction, error = %e, "Forwarding loop panicked");
            Exit::Panicked
        }
    }
}
