//! Network layer subsystem.
//!
//! Listeners are bound before any server starts; a bind failure stops the
//! process before traffic is accepted.

pub mod listener;

pub use listener::{bind, ListenerError};
