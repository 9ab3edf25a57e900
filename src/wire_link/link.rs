use async_trait::async_trait;
use mavlink::MavHeader;
use mavlink::common::MavMessage;
use std::time::Duration;
use strum_macros::Display;

/// A bidirectional, message-framed connection to a single vehicle.
///
/// Implementations stamp outgoing frames with their own source identity.
/// Delivery is never confirmed.
#[async_trait]
pub trait WireLink: Send + Sync {
    /// Encodes and sends one message. Fire-and-forget.
    async fn send(&self, msg: &MavMessage) -> Result<(), LinkError>;
    /// Waits for the next successfully decoded frame.
    async fn recv(&self) -> Result<(MavHeader, MavMessage), LinkError>;
}

#[derive(Debug, Display)]
pub enum LinkError {
    Io(std::io::Error),
    Encode(String),
    InvalidAddress(String),
    /// Nothing to send to: no datagram from the vehicle has been seen yet.
    NoPeer,
    /// No vehicle heartbeat arrived within the handshake window.
    NoHeartbeat(Duration),
    /// The telemetry reader of the session is gone.
    Closed,
}

impl std::error::Error for LinkError {}

impl From<std::io::Error> for LinkError {
    fn from(value: std::io::Error) -> Self { LinkError::Io(value) }
}
