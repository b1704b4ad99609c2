//! Frame classification between the client-facing (axum) and target-facing
//! (tungstenite) message types.
//!
//! Text and binary payloads cross the tunnel with their frame type intact.
//! Ping and pong are answered per hop and never forwarded. A close frame ends
//! the direction it arrived on.

use axum::body::Bytes;
use axum::extract::ws::Message as ClientMessage;
use tokio_tungstenite::tungstenite::Message as TargetMessage;

/// What a forwarding loop does with one frame read from its source.
#[derive(Debug, PartialEq)]
pub enum Inbound<M> {
    /// Data frame to deliver to the other side.
    Forward(M),
    /// Ping, pong or raw frame; proof of life only.
    Control,
    /// Peer started the closing handshake.
    Close,
}

/// A message type a forwarding loop can write keep-alive probes with.
pub trait Probe {
    fn probe() -> Self;
}

impl Probe for ClientMessage {
    fn probe() -> Self {
        ClientMessage::Ping(Bytes::new())
    }
}

impl Probe for TargetMessage {
    fn probe() -> Self {
        TargetMessage::Ping(Bytes::new())
    }
}

/// Classify a frame read from the client.
pub fn from_client(msg: ClientMessage) -> Inbound<TargetMessage> {
    match msg {
        ClientMessage::Text(text) => Inbound::Forward(TargetMessage::Text(text.as_str().into())),
        ClientMessage::Binary(data) => Inbound::Forward(TargetMessage::Binary(data)),
        ClientMessage::Ping(_) | ClientMessage::Pong(_) => Inbound::Control,
        ClientMessage::Close(_) => Inbound::Close,
    }
}

/// Classify a frame read from the browser.
pub fn from_target(msg: TargetMessage) -> Inbound<ClientMessage> {
    match msg {
        TargetMessage::Text(text) => Inbound::Forward(ClientMessage::Text(text.as_str().into())),
        TargetMessage::Binary(data) => Inbound::Forward(ClientMessage::Binary(data)),
        TargetMessage::Ping(_) | TargetMessage::Pong(_) | TargetMessage::Frame(_) => {
            Inbound::Control
        }
        TargetMessage::Close(_) => Inbound::Close,
    }
}
