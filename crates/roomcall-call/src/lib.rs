//! Peer-session coordination for small multi-party video calls.
//!
//! The [`coordinator`] runs one event loop per call. It feeds relay
//! membership events, negotiation results and user commands into the
//! [`registry`], which owns every peer session, and into the local
//! [`media`] source. Chat and cinema mode ride on the relay's
//! publish/subscribe topics.

pub mod chat;
pub mod cinema;
pub mod coordinator;
pub mod events;
pub mod media;
pub mod negotiation;
pub mod protocol;
pub mod registry;
pub mod signaling;

#[cfg(test)]
pub(crate) mod test_support;

pub use chat::{ChatHistory, ChatHistoryConfig, ChatMessage};
pub use cinema::{extract_youtube_id, is_video_id, CinemaSession, CinemaState};
pub use coordinator::{
    CallChannels, CallCommand, CallCoordinator, CallHandle, CallSettings, PeerSummary,
};
pub use events::{CallEvent, RemovalReason};
pub use media::{HeadlessDevices, LocalMedia, MediaDevices, MediaStream, MediaTrack, TrackKind};
pub use negotiation::{
    IncomingOffer, MediaSession, NegotiatedSession, Negotiator, SessionEvent, SessionState,
};
pub use protocol::{ChatPayload, CinemaPayload, NegotiationSignal};
pub use registry::{PeerRegistry, RegistryInput, RegistrySettings, SubstitutionReport};
pub use signaling::{RelayClient, RelaySettings, SignalingChannel, SignalingEvent};

#[cfg(feature = "webrtc-backend")]
pub use negotiation::webrtc::{WebRtcNegotiator, WebRtcSession, WebRtcSettings};
