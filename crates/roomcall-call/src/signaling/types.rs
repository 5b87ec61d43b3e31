//! Settings, wire frames and the event/command enums for the relay client.

use roomcall_common::ParticipantId;
use serde::{Deserialize, Serialize};

use crate::protocol::NegotiationSignal;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Connection settings for [`RelayClient`](super::RelayClient).
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// WebSocket URL of the relay (`ws://` or `wss://`).
    pub url: String,
    pub connect_timeout_secs: u64,
    pub heartbeat_interval_secs: u64,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:3000/ws".to_string(),
            connect_timeout_secs: 15,
            heartbeat_interval_secs: 25,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire frames
// ---------------------------------------------------------------------------

/// One JSON text frame exchanged with the relay.
///
/// Encoded as `{"event": "<kebab-case name>", "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum RelayFrame {
    /// Client → relay: enter a room.
    JoinRoom {
        room: String,
        participant_id: ParticipantId,
    },
    /// Client → relay: leave the current room.
    LeaveRoom { room: String },
    /// Relay → client: another participant entered the room.
    UserConnected { participant_id: ParticipantId },
    /// Relay → client: a participant's relay connection closed.
    UserDisconnected { participant_id: ParticipantId },
    /// Both directions: a topic message fanned out to the room.
    Publish {
        topic: String,
        payload: serde_json::Value,
    },
    /// Both directions: a negotiation message for one participant.
    ///
    /// Outgoing frames carry `to`, the relay rewrites it to `from`.
    Signal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<ParticipantId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<ParticipantId>,
        signal: NegotiationSignal,
    },
    Heartbeat {},
}

// ---------------------------------------------------------------------------
// Events & Commands
// ---------------------------------------------------------------------------

/// Events observed on the relay connection.
#[derive(Debug, Clone)]
pub enum SignalingEvent {
    /// WebSocket connection established (also after a reconnect).
    Connected,
    /// WebSocket connection lost. Peer sessions are unaffected.
    Disconnected,
    PeerJoined(ParticipantId),
    PeerLeft(ParticipantId),
    /// A message published on a topic by another participant.
    Message {
        topic: String,
        payload: serde_json::Value,
    },
    Signal {
        from: ParticipantId,
        signal: NegotiationSignal,
    },
    Error(String),
}

/// Commands sent from the client handle to the background connection task.
#[derive(Debug)]
pub(crate) enum RelayCommand {
    Join {
        room: String,
        participant_id: ParticipantId,
    },
    Leave,
    Publish {
        topic: String,
        payload: serde_json::Value,
    },
    Signal {
        to: ParticipantId,
        signal: NegotiationSignal,
    },
    Disconnect,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_frame_shape() {
        let frame = RelayFrame::JoinRoom {
            room: "lobby".into(),
            participant_id: "p1".into(),
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({ "event": "join-room", "payload": { "room": "lobby", "participant_id": "p1" } })
        );
    }

    #[test]
    fn heartbeat_frame_has_empty_payload() {
        assert_eq!(
            serde_json::to_value(RelayFrame::Heartbeat {}).unwrap(),
            json!({ "event": "heartbeat", "payload": {} })
        );
    }

    #[test]
    fn parses_user_connected() {
        let frame: RelayFrame = serde_json::from_value(
            json!({ "event": "user-connected", "payload": { "participant_id": "p2" } }),
        )
        .unwrap();
        assert_eq!(
            frame,
            RelayFrame::UserConnected {
                participant_id: "p2".into()
            }
        );
    }

    #[test]
    fn outgoing_signal_omits_from() {
        let frame = RelayFrame::Signal {
            from: None,
            to: Some("p2".into()),
            signal: NegotiationSignal::Hangup {
                session_id: "s".into(),
            },
        };
        let value = serde_json::to_value(&frame).unwrap();
        assert!(value["payload"].get("from").is_none());
        assert_eq!(value["payload"]["to"], "p2");
        assert_eq!(value["payload"]["signal"]["kind"], "hangup");
    }

    #[test]
    fn incoming_signal_parses_without_to() {
        let frame: RelayFrame = serde_json::from_value(json!({
            "event": "signal",
            "payload": {
                "from": "p3",
                "signal": { "kind": "answer", "session_id": "s9", "sdp": "v=0" }
            }
        }))
        .unwrap();
        match frame {
            RelayFrame::Signal { from, to, signal } => {
                assert_eq!(from, Some("p3".into()));
                assert!(to.is_none());
                assert_eq!(signal.session_id(), "s9");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_is_rejected() {
        let parsed =
            serde_json::from_value::<RelayFrame>(json!({ "event": "bogus", "payload": {} }));
        assert!(parsed.is_err());
    }
}
