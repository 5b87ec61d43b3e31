//! Application payloads carried over the relay.
//!
//! Chat and cinema payloads ride inside `publish` frames and are opaque to
//! the relay. Negotiation signals are addressed to a single participant and
//! carry the SDP exchanged by the session negotiator. The relay envelope
//! itself lives in `signaling::types`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Publish/subscribe topics
// ---------------------------------------------------------------------------

/// Topic names used with `SignalingChannel::publish`.
pub mod topics {
    pub const CHAT_MESSAGE: &str = "chat:message";
    pub const CINEMA_START: &str = "cinema:start";
}

// ---------------------------------------------------------------------------
// Topic payloads
// ---------------------------------------------------------------------------

/// Payload for `chat:message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub sender: String,
    pub message: String,
}

/// Payload for `cinema:start`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CinemaPayload {
    #[serde(rename = "videoId")]
    pub video_id: String,
    /// Display name of the participant who started the video. Older
    /// clients only send the id.
    #[serde(
        rename = "startedBy",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub started_by: Option<String>,
}

// ---------------------------------------------------------------------------
// Negotiation signals
// ---------------------------------------------------------------------------

/// Directed messages between two negotiators.
///
/// `session_id` names one negotiated session so that crossing offers for the
/// same pair of participants can be told apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NegotiationSignal {
    /// SDP offer with all ICE candidates gathered.
    Offer { session_id: String, sdp: String },
    /// SDP answer in response to an offer.
    Answer { session_id: String, sdp: String },
    /// The sender closed the session.
    Hangup { session_id: String },
}

impl NegotiationSignal {
    pub fn session_id(&self) -> &str {
        match self {
            Self::Offer { session_id, .. }
            | Self::Answer { session_id, .. }
            | Self::Hangup { session_id } => session_id,
        }
    }
}
