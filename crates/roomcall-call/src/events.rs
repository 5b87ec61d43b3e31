//! Events delivered to the presentation layer.

use roomcall_common::{MediaAccessError, NegotiationError, ParticipantId};

use crate::chat::ChatMessage;
use crate::media::MediaStream;

/// Why a peer session disappeared from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalReason {
    /// The relay reported that the participant left.
    Left,
    /// The remote side closed the session.
    Closed,
    /// Negotiation or the connection failed.
    Failed(NegotiationError),
    /// The local participant ended the call.
    LocalTeardown,
}

/// Everything the presentation layer needs to render a call.
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// The room was joined with the local id.
    Joined {
        room: String,
        local_id: ParticipantId,
    },
    /// The local preview stream (camera, or screen while sharing).
    LocalStream(MediaStream),
    RemoteStream {
        participant_id: ParticipantId,
        stream: MediaStream,
    },
    PeerRemoved {
        participant_id: ParticipantId,
        reason: RemovalReason,
    },
    AudioToggled(bool),
    VideoToggled(bool),
    ScreenShareStarted,
    ScreenShareStopped,
    /// A capture request failed. The call continues.
    MediaError(MediaAccessError),
    ChatMessage(ChatMessage),
    CinemaStarted {
        video_id: String,
        started_by: Option<String>,
    },
    /// The URL given to start cinema mode had no YouTube id.
    CinemaRejected {
        url: String,
    },
    RelayConnected,
    RelayDisconnected,
    /// The call ended and every local resource was released.
    Ended,
}
