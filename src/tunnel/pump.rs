//! One direction of a tunnel.
//!
//! # Responsibilities
//! - Read frames from a source channel, in order
//! - Write data frames to the destination channel, same type and payload
//! - Probe the destination periodically and detect a silent source
//! - Raise the shared termination signal on exit, whatever the reason
//!
//! # Design Decisions
//! - Single reader, single writer per direction: no reordering
//! - The destination sink sits behind a mutex shared with the tunnel, so the
//!   tunnel can only close it once no write is in flight
//! - Writes to a destination that has already closed are dropped, not errors

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::Mutex;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use crate::tunnel::frame::{Inbound, Probe};
use crate::tunnel::signal::TerminationSignal;

/// Which way frames flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToTarget,
    TargetToClient,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToTarget => "client_to_target",
            Direction::TargetToClient => "target_to_client",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Direction::ClientToTarget => Direction::TargetToClient,
            Direction::TargetToClient => Direction::ClientToTarget,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a forwarding loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Source sent a close frame.
    PeerClosed,
    /// Source stream ended without a close frame.
    SourceEnded,
    /// Read or write failed.
    TransportError,
    /// Source stayed silent past the keep-alive window.
    KeepaliveTimeout,
    /// The other loop finished first.
    Signalled,
    /// Aborted by the tunnel.
    Cancelled,
    /// The loop task panicked.
    Panicked,
}

impl Exit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exit::PeerClosed => "peer_closed",
            Exit::SourceEnded => "source_ended",
            Exit::TransportError => "transport_error",
            Exit::KeepaliveTimeout => "keepalive_timeout",
            Exit::Signalled => "signalled",
            Exit::Cancelled => "cancelled",
            Exit::Panicked => "panicked",
        }
    }
}

/// Closed-state of one channel, shared between its reader and writer.
#[derive(Debug, Clone, Default)]
pub struct ClosedFlag(Arc<AtomicBool>);

impl ClosedFlag {
    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a write attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Destination already closed; the frame was discarded.
    Dropped,
}

/// Write half of a channel, shareable between a loop and the tunnel.
///
/// `closed` stops data writes as soon as either side starts the closing
/// handshake; the sink itself is shut down exactly once, by [`Outbound::close`],
/// which also flushes the reply to a peer-initiated close.
#[derive(Debug)]
pub struct Outbound<K> {
    sink: Mutex<K>,
    closed: ClosedFlag,
    shut: AtomicBool,
}

impl<K> Outbound<K> {
    pub fn new(sink: K) -> Self {
        Self {
            sink: Mutex::new(sink),
            closed: ClosedFlag::default(),
            shut: AtomicBool::new(false),
        }
    }

    pub fn closed_flag(&self) -> ClosedFlag {
        self.closed.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Send `msg` unless the channel is closed.
    pub async fn send<M>(&self, msg: M) -> Result<Delivery, K::Error>
    where
        K: Sink<M> + Unpin,
    {
        let mut sink = self.sink.lock().await;
        if self.closed.get() {
            return Ok(Delivery::Dropped);
        }
        sink.send(msg).await?;
        Ok(Delivery::Sent)
    }

    /// Shut the channel down. Returns false if it was already shut.
    pub async fn close<M>(&self) -> Result<bool, K::Error>
    where
        K: Sink<M> + Unpin,
    {
        let mut sink = self.sink.lock().await;
        self.closed.set();
        if self.shut.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }
        <K as SinkExt<M>>::close(&mut *sink).await?;
        Ok(true)
    }
}

/// A forwarding loop, ready to run.
pub struct Pump<S, K, In, Out> {
    pub direction: Direction,
    pub source: S,
    /// Flag of the channel `source` belongs to; set when it sends close.
    pub source_closed: ClosedFlag,
    pub sink: Arc<Outbound<K>>,
    pub classify: fn(In) -> Inbound<Out>,
    pub signal: TerminationSignal,
    /// Keep-alive period; `None` disables probing.
    pub heartbeat: Option<Duration>,
    pub forwarded: Arc<AtomicU64>,
}

impl<S, K, In, Out, E> Pump<S, K, In, Out>
where
    S: Stream<Item = Result<In, E>> + Unpin,
    E: fmt::Display,
    K: Sink<Out> + Unpin,
    K::Error: fmt::Display,
    Out: Probe,
{
    /// Forward until the source ends, fails or the signal is raised.
    pub async fn run(mut self) -> Exit {
        let exit = self.forward().await;
        self.signal.raise();
        tracing::debug!(
            direction = %self.direction,
            exit = exit.as_str(),
            forwarded = self.forwarded.load(Ordering::Relaxed),
            "Forwarding loop finished"
        );
        exit
    }

    async fn forward(&mut self) -> Exit {
        let direction = self.direction;
        let mut ticker = self.heartbeat.map(|period| {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        let mut last_seen = Instant::now();

        loop {
            if self.signal.is_raised() {
                return Exit::Signalled;
            }

            let next = tokio::select! {
                biased;
                _ = self.signal.raised() => return Exit::Signalled,
                _ = next_tick(&mut ticker) => {
                    let period = self.heartbeat.unwrap_or_default();
                    if last_seen.elapsed() > period + period / 2 {
                        tracing::warn!(
                            direction = %direction,
                            silent_for = ?last_seen.elapsed(),
                            "Source missed keep-alive window"
                        );
                        return Exit::KeepaliveTimeout;
                    }
                    if let Err(e) = self.sink.send(Out::probe()).await {
                        tracing::warn!(direction = %direction, error = %e, "Keep-alive probe failed");
                        return Exit::TransportError;
                    }
                    continue;
                }
                next = self.source.next() => next,
            };

            let msg = match next {
                None => {
                    tracing::info!(direction = %direction, "Source stream ended");
                    return Exit::SourceEnded;
                }
                Some(Err(e)) => {
                    tracing::warn!(direction = %direction, error = %e, "Read failed");
                    return Exit::TransportError;
                }
                Some(Ok(msg)) => msg,
            };
            last_seen = Instant::now();

            match (self.classify)(msg) {
                Inbound::Forward(out) => match self.sink.send(out).await {
                    Ok(Delivery::Sent) => {
                        self.forwarded.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(Delivery::Dropped) => {
                        tracing::trace!(direction = %direction, "Destination closed, frame dropped");
                    }
                    Err(e) => {
                        tracing::warn!(direction = %direction, error = %e, "Write failed");
                        return Exit::TransportError;
                    }
                },
                Inbound::Control => {
                    tracing::trace!(direction = %direction, "Control frame");
                }
                Inbound::Close => {
                    self.source_closed.set();
                    tracing::info!(direction = %direction, "Peer sent close frame");
                    return Exit::PeerClosed;
                }
            }
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
