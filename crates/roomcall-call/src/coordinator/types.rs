//! Settings, commands and channel bundles for the call coordinator.

use roomcall_common::ParticipantId;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::chat::ChatHistoryConfig;
use crate::negotiation::{IncomingOffer, SessionState};
use crate::registry::RegistrySettings;
use crate::signaling::SignalingEvent;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CallSettings {
    pub room: String,
    /// Name shown to other participants in chat.
    pub display_name: String,
    pub registry: RegistrySettings,
    pub chat: ChatHistoryConfig,
}

impl CallSettings {
    pub fn new(room: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            room: room.into(),
            display_name: display_name.into(),
            registry: RegistrySettings::default(),
            chat: ChatHistoryConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// User actions delivered to the running call.
#[derive(Debug)]
pub enum CallCommand {
    ToggleAudio,
    ToggleVideo,
    /// Start sharing if not sharing, stop otherwise.
    ToggleScreenShare,
    StartScreenShare,
    StopScreenShare,
    SendChat(String),
    /// Start cinema mode from a YouTube URL.
    StartCinema(String),
    QueryPeers(oneshot::Sender<Vec<PeerSummary>>),
    EndCall,
}

/// One row of the peer list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerSummary {
    pub participant_id: ParticipantId,
    pub state: SessionState,
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Receivers the coordinator drains alongside user commands.
pub struct CallChannels {
    /// Events from the signaling client.
    pub signaling: mpsc::Receiver<SignalingEvent>,
    /// Offers delivered by the negotiator.
    pub incoming: mpsc::Receiver<IncomingOffer>,
}
