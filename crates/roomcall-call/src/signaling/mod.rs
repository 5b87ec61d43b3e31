//! Room-scoped signaling over a WebSocket relay.
//!
//! The relay announces membership changes, fans out topic messages to the
//! room and routes directed negotiation messages between participants.

mod client;
mod connection;
mod handler;
mod types;

use async_trait::async_trait;
use roomcall_common::{ParticipantId, SignalingError};

use crate::protocol::NegotiationSignal;

pub use client::RelayClient;
pub use types::{RelayFrame, RelaySettings, SignalingEvent};

/// Outbound side of the signaling channel. Observed events arrive on the
/// receiver returned alongside the implementation.
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Announce the local participant in `room`.
    async fn join(&self, room: &str, local_id: &ParticipantId) -> Result<(), SignalingError>;

    async fn leave(&self) -> Result<(), SignalingError>;

    /// Publish a topic message to every other participant in the room.
    async fn publish(&self, topic: &str, payload: serde_json::Value)
        -> Result<(), SignalingError>;

    /// Route a negotiation message to one participant.
    async fn send_signal(
        &self,
        to: &ParticipantId,
        signal: NegotiationSignal,
    ) -> Result<(), SignalingError>;
}
