//! Public handle for interacting with the relay connection.

use std::sync::Arc;

use async_trait::async_trait;
use roomcall_common::{ParticipantId, SignalingError};
use tokio::sync::{mpsc, RwLock};

use super::connection::connection_loop;
use super::types::{RelayCommand, RelaySettings, SignalingEvent};
use super::SignalingChannel;
use crate::protocol::NegotiationSignal;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// WebSocket relay client.
///
/// All methods are non-blocking and send commands to the background
/// connection task. Commands issued while disconnected are delivered after
/// the next reconnect.
pub struct RelayClient {
    command_tx: mpsc::Sender<RelayCommand>,
    connected: Arc<RwLock<bool>>,
}

impl RelayClient {
    /// Create a new client and start the background connection.
    /// Returns `(client, event_receiver)`.
    pub fn connect(settings: RelaySettings) -> (Self, mpsc::Receiver<SignalingEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);
        let connected = Arc::new(RwLock::new(false));

        let client = Self {
            command_tx,
            connected: Arc::clone(&connected),
        };

        tokio::spawn(connection_loop(settings, connected, event_tx, command_rx));

        (client, event_rx)
    }

    /// Clone the command sender to create a lightweight handle
    /// that sends commands to the same connection.
    pub fn clone_sender(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            connected: Arc::clone(&self.connected),
        }
    }

    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Leave the room and close the connection. The background task exits.
    pub async fn disconnect(&self) {
        let _ = self.command_tx.send(RelayCommand::Disconnect).await;
    }

    async fn send(&self, cmd: RelayCommand) -> Result<(), SignalingError> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| SignalingError::Disconnected)
    }
}

#[async_trait]
impl SignalingChannel for RelayClient {
    async fn join(&self, room: &str, local_id: &ParticipantId) -> Result<(), SignalingError> {
        self.send(RelayCommand::Join {
            room: room.to_string(),
            participant_id: local_id.clone(),
        })
        .await
    }

    async fn leave(&self) -> Result<(), SignalingError> {
        self.send(RelayCommand::Leave).await
    }

    async fn publish(
        &self,
        topic: &str,
        payload: serde_json::Value,
    ) -> Result<(), SignalingError> {
        self.send(RelayCommand::Publish {
            topic: topic.to_string(),
            payload,
        })
        .await
    }

    async fn send_signal(
        &self,
        to: &ParticipantId,
        signal: NegotiationSignal,
    ) -> Result<(), SignalingError> {
        self.send(RelayCommand::Signal {
            to: to.clone(),
            signal,
        })
        .await
    }
}
