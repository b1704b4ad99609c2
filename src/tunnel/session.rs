//! Tunnel session identity, state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique session IDs for tracing
//! - Track session state (Established → Forwarding → Draining → Closed)
//! - Count live sessions and publish the count as `cdp_proxy_tunnels_active`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Global atomic counter for session IDs.
/// Relaxed ordering is enough: only uniqueness matters.
static SESSION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a tunnel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new() -> Self {
        Self(SESSION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tunnel-{}", self.0)
    }
}

/// Tunnel lifecycle. Transitions only move forward; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// Both channels connected, no loop running yet.
    Established,
    /// Both forwarding loops running.
    Forwarding,
    /// One loop exited; the other is being cancelled.
    Draining,
    /// Both channels closed.
    Closed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Established => "established",
            SessionState::Forwarding => "forwarding",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
        }
    }
}

/// Counts live tunnel sessions.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    active_count: Arc<AtomicU64>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session. The guard releases it on drop.
    pub fn track(&self) -> Session {
        let active = self.active_count.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_tunnels_active(active);
        let session = Session {
            active_count: Arc::clone(&self.active_count),
            id: SessionId::new(),
            state: SessionState::Established,
        };
        tracing::trace!(session = %session.id, "Session established");
        session
    }

    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// A live tunnel session. Decrements the tracker when dropped.
#[derive(Debug)]
pub struct Session {
    active_count: Arc<AtomicU64>,
    id: SessionId,
    state: SessionState,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `next`. Returns false, leaving the state alone, for backward moves.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if next <= self.state {
            tracing::warn!(
                session = %self.id,
                from = self.state.as_str(),
                to = next.as_str(),
                "Ignoring backward session transition"
            );
            return false;
        }
        tracing::debug!(
            session = %self.id,
            from = self.state.as_str(),
            to = next.as_str(),
            "Session transition"
        );
        self.state = next;
        true
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let active = self.active_count.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_tunnels_active(active);
        tracing::trace!(session = %self.id, active, "Session released");
    }
}
