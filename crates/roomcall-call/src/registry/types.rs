//! Types, settings, and internal inputs for the peer session registry.

use std::sync::Arc;
use std::time::Duration;

use roomcall_common::{NegotiationError, ParticipantId};
use tokio::time::Instant;

use crate::media::MediaStream;
use crate::negotiation::{MediaSession, NegotiatedSession, SessionEvent, SessionState};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Fixed pause between a join announcement and calling the joiner.
    pub initiate_delay: Duration,
    /// How long a session may stay connecting before it is failed.
    pub negotiation_timeout: Duration,
    /// Room size including the local participant.
    pub max_participants: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            initiate_delay: Duration::from_millis(1000),
            negotiation_timeout: Duration::from_secs(30),
            max_participants: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// Peer session entries
// ---------------------------------------------------------------------------

/// Which side started a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SessionOrigin {
    /// We called the participant after their join announcement.
    Outbound,
    /// We answered the participant's offer.
    Inbound,
}

/// One registry entry.
pub(crate) struct PeerSession {
    pub(crate) generation: u64,
    pub(crate) origin: SessionOrigin,
    pub(crate) state: SessionState,
    /// Absent while the outbound call is still scheduled or negotiating.
    pub(crate) handle: Option<Arc<dyn MediaSession>>,
    pub(crate) remote_stream: Option<MediaStream>,
    /// Id of the stream the session was negotiated with.
    pub(crate) sent_stream_id: Option<String>,
    /// When a still-connecting session is failed.
    pub(crate) deadline: Option<Instant>,
}

impl PeerSession {
    pub(crate) fn scheduled(generation: u64) -> Self {
        Self {
            generation,
            origin: SessionOrigin::Outbound,
            state: SessionState::Connecting,
            handle: None,
            remote_stream: None,
            sent_stream_id: None,
            deadline: None,
        }
    }

    pub(crate) fn answered(
        generation: u64,
        handle: Arc<dyn MediaSession>,
        sent_stream_id: Option<String>,
        deadline: Instant,
    ) -> Self {
        Self {
            generation,
            origin: SessionOrigin::Inbound,
            state: SessionState::Connecting,
            handle: Some(handle),
            remote_stream: None,
            sent_stream_id,
            deadline: Some(deadline),
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Asynchronous results fed back into the registry by its spawned tasks.
///
/// The owner drains the receiver returned by [`PeerRegistry::new`] and
/// passes each value to [`PeerRegistry::handle_input`].
///
/// [`PeerRegistry::new`]: super::PeerRegistry::new
/// [`PeerRegistry::handle_input`]: super::PeerRegistry::handle_input
#[derive(Debug)]
pub enum RegistryInput {
    /// The initiation delay for a joiner elapsed.
    InitiateDue {
        participant_id: ParticipantId,
        generation: u64,
    },
    InitiateResolved {
        participant_id: ParticipantId,
        generation: u64,
        result: Result<NegotiatedSession, NegotiationError>,
    },
    AnswerResolved {
        participant_id: ParticipantId,
        /// Matches the pending answer recorded when the offer arrived.
        ticket: u64,
        sent_stream_id: String,
        result: Result<NegotiatedSession, NegotiationError>,
    },
    /// An event from a session's own event stream.
    Session {
        participant_id: ParticipantId,
        generation: u64,
        event: SessionEvent,
    },
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Number of effective track replacements made by a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstitutionReport {
    pub video: usize,
    pub audio: usize,
}
