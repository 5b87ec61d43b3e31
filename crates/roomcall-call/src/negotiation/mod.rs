//! Session negotiation: the seam between the registry and the peer
//! connection library.
//!
//! A [`Negotiator`] turns a participant id and an outgoing stream into a
//! [`NegotiatedSession`]. Each session reports its progress on its own event
//! channel, so the registry never polls connection state.

#[cfg(feature = "webrtc-backend")]
pub mod webrtc;

use std::sync::Arc;

use async_trait::async_trait;
use roomcall_common::{NegotiationError, ParticipantId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::media::{MediaStream, MediaTrack, TrackKind};
use crate::protocol::NegotiationSignal;

/// Lifecycle of one peer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Connecting,
    Active,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Active)
                | (Self::Connecting, Self::Closed)
                | (Self::Connecting, Self::Failed)
                | (Self::Active, Self::Closed)
        )
    }
}

/// Progress notifications from one session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The remote side's media arrived. The session is now active.
    RemoteStream(MediaStream),
    /// The remote side closed the session or the connection dropped.
    Closed,
    Failed(NegotiationError),
}

/// A negotiated connection to one remote participant.
#[async_trait]
pub trait MediaSession: Send + Sync {
    fn participant_id(&self) -> &ParticipantId;

    /// Whether the session sends a track of this kind.
    async fn has_sender(&self, kind: TrackKind) -> bool;

    /// Swap the outgoing track of `kind` without renegotiating.
    ///
    /// Returns `false` when the session has no sender of that kind.
    async fn replace_outgoing_track(&self, kind: TrackKind, track: &MediaTrack) -> bool;

    /// Close the connection. Idempotent.
    async fn close(&self);
}

/// A session handle paired with its event stream.
pub struct NegotiatedSession {
    pub session: Arc<dyn MediaSession>,
    pub events: mpsc::Receiver<SessionEvent>,
}

impl std::fmt::Debug for NegotiatedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NegotiatedSession")
            .field("participant_id", self.session.participant_id())
            .finish_non_exhaustive()
    }
}

/// An offer from a remote participant waiting to be answered.
#[derive(Debug, Clone)]
pub struct IncomingOffer {
    pub from: ParticipantId,
    pub signal: NegotiationSignal,
}

#[async_trait]
pub trait Negotiator: Send + Sync {
    /// Register with the negotiation layer and obtain the local id.
    async fn open(&self) -> Result<ParticipantId, NegotiationError>;

    /// Start a session towards `remote`, sending `outgoing`.
    async fn initiate(
        &self,
        remote: &ParticipantId,
        outgoing: &MediaStream,
    ) -> Result<NegotiatedSession, NegotiationError>;

    /// Accept an offer, sending `outgoing`.
    async fn answer(
        &self,
        offer: IncomingOffer,
        outgoing: &MediaStream,
    ) -> Result<NegotiatedSession, NegotiationError>;

    /// Feed a negotiation message routed through the relay.
    async fn handle_signal(&self, from: ParticipantId, signal: NegotiationSignal);
}
