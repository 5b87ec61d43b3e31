//! In-memory doubles for the negotiation, device and signaling seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use roomcall_common::{MediaAccessError, NegotiationError, ParticipantId, SignalingError};
use tokio::sync::mpsc;

use crate::media::{MediaDevices, MediaStream, MediaTrack, TrackKind};
use crate::negotiation::{
    IncomingOffer, MediaSession, NegotiatedSession, Negotiator, SessionEvent,
};
use crate::protocol::NegotiationSignal;
use crate::signaling::SignalingChannel;

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub(crate) struct MockSession {
    participant_id: ParticipantId,
    /// Id of the stream the session was negotiated with.
    pub(crate) outgoing_stream_id: String,
    has_video: bool,
    has_audio: bool,
    replaced: Mutex<Vec<(TrackKind, String)>>,
    closed: AtomicBool,
    events_tx: mpsc::Sender<SessionEvent>,
}

impl MockSession {
    fn new(
        participant_id: ParticipantId,
        outgoing: &MediaStream,
    ) -> (Arc<Self>, mpsc::Receiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(16);
        let session = Arc::new(Self {
            participant_id,
            outgoing_stream_id: outgoing.id().to_string(),
            has_video: outgoing.video_track().is_some(),
            has_audio: outgoing.audio_track().is_some(),
            replaced: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            events_tx,
        });
        (session, events_rx)
    }

    /// Emit an event as if the remote side produced it.
    pub(crate) async fn emit(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event).await;
    }

    /// Emit a remote stream with one video and one audio track.
    pub(crate) async fn emit_remote_stream(&self) -> MediaStream {
        let stream = MediaStream::new(vec![
            MediaTrack::new(TrackKind::Video, "remote-video"),
            MediaTrack::new(TrackKind::Audio, "remote-audio"),
        ]);
        self.emit(SessionEvent::RemoteStream(stream.clone())).await;
        stream
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Track ids passed to `replace_outgoing_track`, in call order.
    pub(crate) fn replaced(&self) -> Vec<(TrackKind, String)> {
        self.replaced.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaSession for MockSession {
    fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    async fn has_sender(&self, kind: TrackKind) -> bool {
        match kind {
            TrackKind::Video => self.has_video,
            TrackKind::Audio => self.has_audio,
        }
    }

    async fn replace_outgoing_track(&self, kind: TrackKind, track: &MediaTrack) -> bool {
        if !self.has_sender(kind).await {
            return false;
        }
        self.replaced
            .lock()
            .unwrap()
            .push((kind, track.id().to_string()));
        true
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Negotiator
// ---------------------------------------------------------------------------

#[derive(Default)]
struct NegotiatorState {
    initiated: Vec<(ParticipantId, String)>,
    answered: Vec<(ParticipantId, String)>,
    sessions: HashMap<ParticipantId, Vec<Arc<MockSession>>>,
    fail_next: Option<NegotiationError>,
    fail_open: Option<NegotiationError>,
    signals: Vec<(ParticipantId, NegotiationSignal)>,
}

pub(crate) struct MockNegotiator {
    local_id: ParticipantId,
    state: Mutex<NegotiatorState>,
}

impl MockNegotiator {
    pub(crate) fn new(local_id: impl Into<ParticipantId>) -> Arc<Self> {
        Arc::new(Self {
            local_id: local_id.into(),
            state: Mutex::new(NegotiatorState::default()),
        })
    }

    /// Make the next `initiate` or `answer` call fail.
    pub(crate) fn fail_next(&self, err: NegotiationError) {
        self.state.lock().unwrap().fail_next = Some(err);
    }

    pub(crate) fn fail_open(&self, err: NegotiationError) {
        self.state.lock().unwrap().fail_open = Some(err);
    }

    /// `(remote, outgoing stream id)` for every `initiate` call.
    pub(crate) fn initiated(&self) -> Vec<(ParticipantId, String)> {
        self.state.lock().unwrap().initiated.clone()
    }

    pub(crate) fn answered(&self) -> Vec<(ParticipantId, String)> {
        self.state.lock().unwrap().answered.clone()
    }

    pub(crate) fn signals(&self) -> Vec<(ParticipantId, NegotiationSignal)> {
        self.state.lock().unwrap().signals.clone()
    }

    /// Sessions created for `id`, oldest first.
    pub(crate) fn sessions_for(&self, id: &str) -> Vec<Arc<MockSession>> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(&ParticipantId::from(id))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn last_session(&self, id: &str) -> Arc<MockSession> {
        self.sessions_for(id)
            .pop()
            .unwrap_or_else(|| panic!("no session for {id}"))
    }

    /// Build a standalone session for `id`, as if answered out of band.
    pub(crate) fn make_session(
        &self,
        id: &str,
        outgoing: &MediaStream,
    ) -> (Arc<MockSession>, NegotiatedSession) {
        let (session, events) = MockSession::new(id.into(), outgoing);
        self.state
            .lock()
            .unwrap()
            .sessions
            .entry(id.into())
            .or_default()
            .push(Arc::clone(&session));
        let negotiated = NegotiatedSession {
            session: session.clone(),
            events,
        };
        (session, negotiated)
    }

    fn create(
        &self,
        remote: &ParticipantId,
        outgoing: &MediaStream,
    ) -> Result<NegotiatedSession, NegotiationError> {
        if let Some(err) = self.state.lock().unwrap().fail_next.take() {
            return Err(err);
        }
        let (_, negotiated) = self.make_session(remote.as_str(), outgoing);
        Ok(negotiated)
    }
}

#[async_trait]
impl Negotiator for MockNegotiator {
    async fn open(&self) -> Result<ParticipantId, NegotiationError> {
        match self.state.lock().unwrap().fail_open.take() {
            Some(err) => Err(err),
            None => Ok(self.local_id.clone()),
        }
    }

    async fn initiate(
        &self,
        remote: &ParticipantId,
        outgoing: &MediaStream,
    ) -> Result<NegotiatedSession, NegotiationError> {
        self.state
            .lock()
            .unwrap()
            .initiated
            .push((remote.clone(), outgoing.id().to_string()));
        self.create(remote, outgoing)
    }

    async fn answer(
        &self,
        offer: IncomingOffer,
        outgoing: &MediaStream,
    ) -> Result<NegotiatedSession, NegotiationError> {
        self.state
            .lock()
            .unwrap()
            .answered
            .push((offer.from.clone(), outgoing.id().to_string()));
        self.create(&offer.from, outgoing)
    }

    async fn handle_signal(&self, from: ParticipantId, signal: NegotiationSignal) {
        self.state.lock().unwrap().signals.push((from, signal));
    }
}

pub(crate) fn offer_from(id: &str) -> IncomingOffer {
    IncomingOffer {
        from: id.into(),
        signal: NegotiationSignal::Offer {
            session_id: format!("offer-{id}"),
            sdp: "v=0".into(),
        },
    }
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct MockDevices {
    camera_requests: AtomicUsize,
    screen_requests: AtomicUsize,
    camera_denial: Mutex<Option<MediaAccessError>>,
    screen_denial: Mutex<Option<MediaAccessError>>,
    /// Screen captures with a video track only.
    pub(crate) silent_screen: AtomicBool,
}

impl MockDevices {
    /// Deny the next camera request.
    pub(crate) fn deny_camera(&self, err: MediaAccessError) {
        *self.camera_denial.lock().unwrap() = Some(err);
    }

    /// Deny the next screen capture request.
    pub(crate) fn deny_screen(&self, err: MediaAccessError) {
        *self.screen_denial.lock().unwrap() = Some(err);
    }

    pub(crate) fn camera_requests(&self) -> usize {
        self.camera_requests.load(Ordering::SeqCst)
    }

    pub(crate) fn screen_requests(&self) -> usize {
        self.screen_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaDevices for MockDevices {
    async fn camera_and_microphone(&self) -> Result<MediaStream, MediaAccessError> {
        self.camera_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.camera_denial.lock().unwrap().take() {
            return Err(err);
        }
        Ok(MediaStream::new(vec![
            MediaTrack::new(TrackKind::Video, "camera"),
            MediaTrack::new(TrackKind::Audio, "microphone"),
        ]))
    }

    async fn screen_capture(&self) -> Result<MediaStream, MediaAccessError> {
        self.screen_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.screen_denial.lock().unwrap().take() {
            return Err(err);
        }
        let mut tracks = vec![MediaTrack::new(TrackKind::Video, "screen")];
        if !self.silent_screen.load(Ordering::SeqCst) {
            tracks.push(MediaTrack::new(TrackKind::Audio, "system-audio"));
        }
        Ok(MediaStream::new(tracks))
    }
}

// ---------------------------------------------------------------------------
// Signaling
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SignalingState {
    joined: Vec<(String, ParticipantId)>,
    leaves: usize,
    published: Vec<(String, serde_json::Value)>,
    signals: Vec<(ParticipantId, NegotiationSignal)>,
}

#[derive(Default)]
pub(crate) struct MockSignaling {
    state: Mutex<SignalingState>,
    offline: AtomicBool,
}

impl MockSignaling {
    /// Make every call fail with `SignalingError::Disconnected`.
    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn joined(&self) -> Vec<(String, ParticipantId)> {
        self.state.lock().unwrap().joined.clone()
    }

    pub(crate) fn leaves(&self) -> usize {
        self.state.lock().unwrap().leaves
    }

    pub(crate) fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.state.lock().unwrap().published.clone()
    }

    pub(crate) fn signals(&self) -> Vec<(ParticipantId, NegotiationSignal)> {
        self.state.lock().unwrap().signals.clone()
    }

    fn check(&self) -> Result<(), SignalingError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(SignalingError::Disconnected)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SignalingChannel for MockSignaling {
    async fn join(&self, room: &str, local_id: &ParticipantId) -> Result<(), SignalingError> {
        self.check()?;
        self.state
            .lock()
            .unwrap()
            .joined
            .push((room.to_string(), local_id.clone()));
        Ok(())
    }

    async fn leave(&self) -> Result<(), SignalingError> {
        self.check()?;
        self.state.lock().unwrap().leaves += 1;
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: serde_json::Value,
    ) -> Result<(), SignalingError> {
        self.check()?;
        self.state
            .lock()
            .unwrap()
            .published
            .push((topic.to_string(), payload));
        Ok(())
    }

    async fn send_signal(
        &self,
        to: &ParticipantId,
        signal: NegotiationSignal,
    ) -> Result<(), SignalingError> {
        self.check()?;
        self.state
            .lock()
            .unwrap()
            .signals
            .push((to.clone(), signal));
        Ok(())
    }
}
