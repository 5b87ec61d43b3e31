//! Peer session registry: one entry per remote participant.

use std::collections::HashMap;
use std::sync::Arc;

use roomcall_common::{NegotiationError, ParticipantId};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::events::{CallEvent, RemovalReason};
use crate::media::{MediaStream, TrackKind};
use crate::negotiation::{
    IncomingOffer, MediaSession, NegotiatedSession, Negotiator, SessionEvent, SessionState,
};

use super::types::{
    PeerSession, RegistryInput, RegistrySettings, SessionOrigin, SubstitutionReport,
};

// ---------------------------------------------------------------------------
// Peer Registry
// ---------------------------------------------------------------------------

/// Owns every peer session of a call.
///
/// All methods run on the owner's event loop. Timers, negotiations and
/// session event streams run as spawned tasks that report back through
/// [`RegistryInput`]s, so the session map is never shared.
pub struct PeerRegistry {
    local_id: ParticipantId,
    negotiator: Arc<dyn Negotiator>,
    settings: RegistrySettings,
    sessions: HashMap<ParticipantId, PeerSession>,
    /// Offers being answered, by ticket. Cleared when the offerer leaves.
    pending_answers: HashMap<u64, ParticipantId>,
    next_generation: u64,
    input_tx: mpsc::Sender<RegistryInput>,
    event_tx: mpsc::Sender<CallEvent>,
}

impl PeerRegistry {
    pub fn new(
        local_id: ParticipantId,
        negotiator: Arc<dyn Negotiator>,
        settings: RegistrySettings,
        event_tx: mpsc::Sender<CallEvent>,
    ) -> (Self, mpsc::Receiver<RegistryInput>) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let registry = Self {
            local_id,
            negotiator,
            settings,
            sessions: HashMap::new(),
            pending_answers: HashMap::new(),
            next_generation: 1,
            input_tx,
            event_tx,
        };
        (registry, input_rx)
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    // -- queries --------------------------------------------------------------

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn state_of(&self, id: &ParticipantId) -> Option<SessionState> {
        self.sessions.get(id).map(|s| s.state)
    }

    pub fn remote_stream_of(&self, id: &ParticipantId) -> Option<MediaStream> {
        self.sessions.get(id).and_then(|s| s.remote_stream.clone())
    }

    /// Ids of all registered participants, sorted.
    pub fn participant_ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    // -- membership -----------------------------------------------------------

    /// A participant announced itself in the room. The session is initiated
    /// after the configured delay.
    pub fn on_participant_joined(&mut self, id: ParticipantId) {
        if id == self.local_id {
            debug!("Ignoring join announcement for the local participant");
            return;
        }
        if self.sessions.contains_key(&id) {
            debug!(participant_id = %id, "Duplicate join announcement ignored");
            return;
        }
        if self.is_full() {
            warn!(
                participant_id = %id,
                max_participants = self.settings.max_participants,
                "Room is full, not calling participant"
            );
            return;
        }

        let generation = self.bump_generation();
        self.sessions
            .insert(id.clone(), PeerSession::scheduled(generation));
        info!(participant_id = %id, generation, "Participant joined, call scheduled");

        let delay = self.settings.initiate_delay;
        let input_tx = self.input_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = input_tx
                .send(RegistryInput::InitiateDue {
                    participant_id: id,
                    generation,
                })
                .await;
        });
    }

    /// The relay reported that a participant left.
    pub async fn on_participant_left(&mut self, id: &ParticipantId) {
        self.pending_answers.retain(|_, from| from != id);
        if !self.sessions.contains_key(id) {
            debug!(participant_id = %id, "Leave for unknown participant ignored");
            return;
        }
        info!(participant_id = %id, "Participant left");
        self.remove(id, RemovalReason::Left).await;
    }

    // -- async results --------------------------------------------------------

    /// Apply one input produced by a spawned task. `outgoing` is the local
    /// media source's current outgoing stream.
    pub async fn handle_input(&mut self, input: RegistryInput, outgoing: Option<&MediaStream>) {
        match input {
            RegistryInput::InitiateDue {
                participant_id,
                generation,
            } => {
                self.on_initiate_due(participant_id, generation, outgoing)
                    .await
            }
            RegistryInput::InitiateResolved {
                participant_id,
                generation,
                result,
            } => {
                self.on_initiate_resolved(participant_id, generation, result)
                    .await
            }
            RegistryInput::AnswerResolved {
                participant_id,
                ticket,
                sent_stream_id,
                result,
            } => match result {
                Ok(negotiated) if self.pending_answers.remove(&ticket).is_none() => {
                    debug!(
                        participant_id = %participant_id,
                        "Offerer left, closing answered session"
                    );
                    negotiated.session.close().await;
                }
                Ok(negotiated) => {
                    self.on_incoming_session(participant_id, negotiated, Some(sent_stream_id))
                        .await
                }
                Err(e) => {
                    self.pending_answers.remove(&ticket);
                    warn!(
                        participant_id = %participant_id,
                        error = %e,
                        "Answering offer failed"
                    );
                }
            },
            RegistryInput::Session {
                participant_id,
                generation,
                event,
            } => {
                self.on_session_event(participant_id, generation, event, outgoing)
                    .await
            }
        }
    }

    async fn on_initiate_due(
        &mut self,
        id: ParticipantId,
        generation: u64,
        outgoing: Option<&MediaStream>,
    ) {
        let timeout = self.settings.negotiation_timeout;
        let Some(entry) = self.current_entry(&id, generation) else {
            debug!(participant_id = %id, generation, "Scheduled call superseded");
            return;
        };
        if entry.handle.is_some() || entry.deadline.is_some() {
            debug!(participant_id = %id, generation, "Call already started");
            return;
        }
        let Some(stream) = outgoing.cloned() else {
            warn!(participant_id = %id, "No outgoing stream, cannot call participant");
            let err = NegotiationError::Protocol("no outgoing stream".into());
            self.remove(&id, RemovalReason::Failed(err)).await;
            return;
        };

        let deadline = Instant::now() + timeout;
        entry.deadline = Some(deadline);
        entry.sent_stream_id = Some(stream.id().to_string());
        info!(
            participant_id = %id,
            generation,
            stream_id = stream.id(),
            "Calling participant"
        );

        let negotiator = Arc::clone(&self.negotiator);
        let input_tx = self.input_tx.clone();
        let timeout_secs = timeout.as_secs();
        tokio::spawn(async move {
            let result =
                match tokio::time::timeout_at(deadline, negotiator.initiate(&id, &stream)).await {
                    Ok(result) => result,
                    Err(_) => Err(NegotiationError::Timeout(timeout_secs)),
                };
            let _ = input_tx
                .send(RegistryInput::InitiateResolved {
                    participant_id: id,
                    generation,
                    result,
                })
                .await;
        });
    }

    async fn on_initiate_resolved(
        &mut self,
        id: ParticipantId,
        generation: u64,
        result: Result<NegotiatedSession, NegotiationError>,
    ) {
        let current = self
            .current_entry(&id, generation)
            .is_some_and(|e| e.handle.is_none());

        if !current {
            // The participant left or an incoming session took over.
            if let Ok(negotiated) = result {
                debug!(participant_id = %id, generation, "Closing stale session");
                negotiated.session.close().await;
            }
            return;
        }

        match result {
            Ok(negotiated) => {
                let deadline = self.attach(&id, generation, Arc::clone(&negotiated.session));
                self.spawn_forwarder(id, generation, negotiated.events, deadline);
            }
            Err(e) => {
                warn!(participant_id = %id, error = %e, "Calling participant failed");
                self.remove(&id, RemovalReason::Failed(e)).await;
            }
        }
    }

    /// Answer an offer with the current outgoing stream.
    pub fn on_incoming_offer(&mut self, offer: IncomingOffer, outgoing: Option<&MediaStream>) {
        let id = offer.from.clone();
        if id == self.local_id {
            debug!("Ignoring offer from the local participant");
            return;
        }
        if !self.sessions.contains_key(&id) && self.is_full() {
            warn!(participant_id = %id, "Room is full, ignoring offer");
            return;
        }
        let Some(stream) = outgoing.cloned() else {
            warn!(participant_id = %id, "No outgoing stream, cannot answer offer");
            return;
        };

        debug!(participant_id = %id, session_id = offer.signal.session_id(), "Answering offer");
        let ticket = self.bump_generation();
        self.pending_answers.insert(ticket, id.clone());
        let negotiator = Arc::clone(&self.negotiator);
        let input_tx = self.input_tx.clone();
        let timeout = self.settings.negotiation_timeout;
        tokio::spawn(async move {
            let answer = negotiator.answer(offer, &stream);
            let result = match tokio::time::timeout(timeout, answer).await {
                Ok(result) => result,
                Err(_) => Err(NegotiationError::Timeout(timeout.as_secs())),
            };
            let _ = input_tx
                .send(RegistryInput::AnswerResolved {
                    participant_id: id,
                    ticket,
                    sent_stream_id: stream.id().to_string(),
                    result,
                })
                .await;
        });
    }

    /// Register a session created by answering a remote offer.
    ///
    /// If the participant already has an entry, the collision is resolved
    /// so that both sides keep the same session.
    pub async fn on_incoming_session(
        &mut self,
        id: ParticipantId,
        negotiated: NegotiatedSession,
        sent_stream_id: Option<String>,
    ) {
        if let Some(existing) = self.sessions.get(&id) {
            let started = existing.handle.is_some() || existing.deadline.is_some();
            let keep_existing = match (existing.origin, started) {
                // Our call has not fired yet.
                (SessionOrigin::Outbound, false) => false,
                // Both sides called each other. The smaller id is the caller.
                (SessionOrigin::Outbound, true) => self.local_id < id,
                (SessionOrigin::Inbound, _) => true,
            };

            if keep_existing {
                info!(participant_id = %id, "Session collision, keeping existing session");
                negotiated.session.close().await;
                return;
            }

            info!(participant_id = %id, "Session collision, incoming session replaces ours");
            if let Some(old) = self.sessions.remove(&id).and_then(|e| e.handle) {
                old.close().await;
            }
        } else if self.is_full() {
            warn!(participant_id = %id, "Room is full, closing incoming session");
            negotiated.session.close().await;
            return;
        }

        let generation = self.bump_generation();
        let deadline = Instant::now() + self.settings.negotiation_timeout;
        self.sessions.insert(
            id.clone(),
            PeerSession::answered(
                generation,
                Arc::clone(&negotiated.session),
                sent_stream_id,
                deadline,
            ),
        );
        info!(participant_id = %id, generation, "Incoming session registered");
        self.spawn_forwarder(id, generation, negotiated.events, deadline);
    }

    /// Apply an event from a session's event stream.
    pub async fn on_session_event(
        &mut self,
        id: ParticipantId,
        generation: u64,
        event: SessionEvent,
        outgoing: Option<&MediaStream>,
    ) {
        let Some(entry) = self.current_entry(&id, generation) else {
            debug!(participant_id = %id, generation, "Event for superseded session ignored");
            return;
        };

        match event {
            SessionEvent::RemoteStream(stream) => {
                let activated = entry.state == SessionState::Connecting;
                if !activated && entry.state != SessionState::Active {
                    return;
                }
                entry.state = SessionState::Active;
                entry.deadline = None;
                entry.remote_stream = Some(stream.clone());

                // A substitution broadcast skips connecting sessions, so a
                // session activated after one catches up here.
                let catch_up = match (activated, outgoing, &entry.handle) {
                    (true, Some(current), Some(handle))
                        if entry.sent_stream_id.as_deref() != Some(current.id()) =>
                    {
                        entry.sent_stream_id = Some(current.id().to_string());
                        Some((Arc::clone(handle), current))
                    }
                    _ => None,
                };

                if activated {
                    info!(participant_id = %id, stream_id = stream.id(), "Session active");
                }
                if let Some((handle, current)) = catch_up {
                    let report = substitute(handle.as_ref(), current).await;
                    debug!(
                        participant_id = %id,
                        video = report.video,
                        audio = report.audio,
                        "Caught up with outgoing stream"
                    );
                }

                let _ = self
                    .event_tx
                    .send(CallEvent::RemoteStream {
                        participant_id: id,
                        stream,
                    })
                    .await;
            }
            SessionEvent::Closed => {
                info!(participant_id = %id, "Session closed remotely");
                self.remove(&id, RemovalReason::Closed).await;
            }
            SessionEvent::Failed(e) => {
                warn!(participant_id = %id, error = %e, "Session failed");
                self.remove(&id, RemovalReason::Failed(e)).await;
            }
        }
    }

    // -- media ----------------------------------------------------------------

    /// Swap every active session's outgoing tracks for those of `stream`.
    ///
    /// Audio is only replaced when `stream` has an audio track. Sessions
    /// that are not active are skipped.
    pub async fn broadcast_track_substitution(
        &mut self,
        stream: &MediaStream,
    ) -> SubstitutionReport {
        let mut report = SubstitutionReport::default();
        for (id, entry) in self.sessions.iter_mut() {
            if entry.state != SessionState::Active {
                continue;
            }
            let Some(handle) = entry.handle.as_ref() else {
                continue;
            };
            let replaced = substitute(handle.as_ref(), stream).await;
            report.video += replaced.video;
            report.audio += replaced.audio;
            entry.sent_stream_id = Some(stream.id().to_string());
            debug!(
                participant_id = %id,
                video = replaced.video,
                audio = replaced.audio,
                "Tracks substituted"
            );
        }
        info!(
            stream_id = stream.id(),
            video = report.video,
            audio = report.audio,
            "Track substitution broadcast"
        );
        report
    }

    // -- teardown -------------------------------------------------------------

    /// Close every session. Used when the local participant ends the call.
    pub async fn close_all(&mut self) {
        self.pending_answers.clear();
        let ids = self.participant_ids();
        for id in ids {
            self.remove(&id, RemovalReason::LocalTeardown).await;
        }
        info!("All peer sessions closed");
    }

    // -- internals ------------------------------------------------------------

    fn is_full(&self) -> bool {
        self.sessions.len() + 1 >= self.settings.max_participants
    }

    fn bump_generation(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }

    fn current_entry(&mut self, id: &ParticipantId, generation: u64) -> Option<&mut PeerSession> {
        self.sessions
            .get_mut(id)
            .filter(|e| e.generation == generation)
    }

    /// Attach a negotiated handle to a scheduled entry and return its
    /// deadline.
    fn attach(
        &mut self,
        id: &ParticipantId,
        generation: u64,
        handle: Arc<dyn MediaSession>,
    ) -> Instant {
        let fallback = Instant::now() + self.settings.negotiation_timeout;
        match self.current_entry(id, generation) {
            Some(entry) => {
                entry.handle = Some(handle);
                *entry.deadline.get_or_insert(fallback)
            }
            None => fallback,
        }
    }

    async fn remove(&mut self, id: &ParticipantId, reason: RemovalReason) {
        let Some(entry) = self.sessions.remove(id) else {
            return;
        };
        if let Some(handle) = entry.handle {
            handle.close().await;
        }
        let _ = self
            .event_tx
            .send(CallEvent::PeerRemoved {
                participant_id: id.clone(),
                reason,
            })
            .await;
    }

    fn spawn_forwarder(
        &self,
        id: ParticipantId,
        generation: u64,
        events: mpsc::Receiver<SessionEvent>,
        deadline: Instant,
    ) {
        tokio::spawn(forward_session_events(
            id,
            generation,
            events,
            deadline,
            self.settings.negotiation_timeout.as_secs(),
            self.input_tx.clone(),
        ));
    }
}

async fn substitute(session: &dyn MediaSession, stream: &MediaStream) -> SubstitutionReport {
    let mut report = SubstitutionReport::default();
    if let Some(video) = stream.video_track() {
        if session.replace_outgoing_track(TrackKind::Video, video).await {
            report.video += 1;
        }
    }
    if let Some(audio) = stream.audio_track() {
        if session.replace_outgoing_track(TrackKind::Audio, audio).await {
            report.audio += 1;
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Session Event Forwarder
// ---------------------------------------------------------------------------

/// Relay one session's events into the registry until a terminal event.
///
/// The first remote stream must arrive before `deadline`, otherwise the
/// session is reported failed. A dropped event stream counts as closed.
async fn forward_session_events(
    participant_id: ParticipantId,
    generation: u64,
    mut events: mpsc::Receiver<SessionEvent>,
    deadline: Instant,
    timeout_secs: u64,
    input_tx: mpsc::Sender<RegistryInput>,
) {
    let mut connecting = true;
    loop {
        let event = if connecting {
            match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(Some(event)) => event,
                Ok(None) => SessionEvent::Closed,
                Err(_) => SessionEvent::Failed(NegotiationError::Timeout(timeout_secs)),
            }
        } else {
            events.recv().await.unwrap_or(SessionEvent::Closed)
        };

        let terminal = matches!(event, SessionEvent::Closed | SessionEvent::Failed(_));
        if matches!(event, SessionEvent::RemoteStream(_)) {
            connecting = false;
        }

        let sent = input_tx
            .send(RegistryInput::Session {
                participant_id: participant_id.clone(),
                generation,
                event,
            })
            .await;
        if terminal || sent.is_err() {
            break;
        }
    }
}
