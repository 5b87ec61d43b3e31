//! One peer connection to a remote participant.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use roomcall_common::{NegotiationError, ParticipantId};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;

use crate::media::{MediaStream, MediaTrack, TrackKind};
use crate::negotiation::{MediaSession, SessionEvent};
use crate::protocol::NegotiationSignal;
use crate::signaling::SignalingChannel;

struct OutgoingTrack {
    sender: Arc<RTCRtpSender>,
    track: Arc<TrackLocalStaticSample>,
}

/// A [`MediaSession`] backed by an `RTCPeerConnection`.
///
/// Sample writers pull the current local track with
/// [`WebRtcSession::local_track`], so a replaced track takes effect on the
/// next written sample.
pub struct WebRtcSession {
    participant_id: ParticipantId,
    session_id: String,
    pc: Arc<RTCPeerConnection>,
    signaling: Arc<dyn SignalingChannel>,
    outgoing: Mutex<HashMap<TrackKind, OutgoingTrack>>,
    event_tx: mpsc::Sender<SessionEvent>,
    /// Set once a terminal event was emitted or the session was closed
    /// locally. Shared with the connection callbacks.
    finished: Arc<AtomicBool>,
}

impl WebRtcSession {
    /// Wrap `pc` and register its callbacks. Returns the session and the
    /// receiver for its events.
    pub(crate) fn new(
        participant_id: ParticipantId,
        session_id: String,
        pc: Arc<RTCPeerConnection>,
        signaling: Arc<dyn SignalingChannel>,
    ) -> (Arc<Self>, mpsc::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(16);
        let finished = Arc::new(AtomicBool::new(false));

        register_state_handler(&pc, &participant_id, event_tx.clone(), Arc::clone(&finished));
        register_track_handler(&pc, &participant_id, &session_id, event_tx.clone());

        let session = Arc::new(Self {
            participant_id,
            session_id,
            pc,
            signaling,
            outgoing: Mutex::new(HashMap::new()),
            event_tx,
            finished,
        });
        (session, event_rx)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// The local track currently sent for `kind`.
    pub async fn local_track(&self, kind: TrackKind) -> Option<Arc<TrackLocalStaticSample>> {
        self.outgoing
            .lock()
            .await
            .get(&kind)
            .map(|o| Arc::clone(&o.track))
    }

    /// Add one sender per track of `stream`.
    pub(crate) async fn add_outgoing(&self, stream: &MediaStream) -> Result<(), NegotiationError> {
        let mut outgoing = self.outgoing.lock().await;
        for track in stream.tracks() {
            if outgoing.contains_key(&track.kind()) {
                continue;
            }
            let local = local_sample_track(track, stream.id());
            let sender = self
                .pc
                .add_track(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>)
                .await
                .map_err(|e| {
                    let kind = track.kind();
                    NegotiationError::Transport(format!("failed to add {kind} track: {e}"))
                })?;
            outgoing.insert(
                track.kind(),
                OutgoingTrack {
                    sender,
                    track: local,
                },
            );
        }
        Ok(())
    }

    /// Create an offer and return its SDP once candidate gathering is done.
    pub(crate) async fn create_offer(&self) -> Result<String, NegotiationError> {
        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(|e| NegotiationError::Protocol(format!("failed to create offer: {e}")))?;
        self.set_local_and_gather(offer).await
    }

    /// Apply a remote offer. Senders are added afterwards so they reuse the
    /// offered transceivers.
    pub(crate) async fn accept_offer(&self, sdp: String) -> Result<(), NegotiationError> {
        let offer = RTCSessionDescription::offer(sdp)
            .map_err(|e| NegotiationError::Protocol(format!("failed to parse offer: {e}")))?;
        self.pc
            .set_remote_description(offer)
            .await
            .map_err(|e| NegotiationError::Protocol(format!("failed to apply offer: {e}")))
    }

    pub(crate) async fn create_answer(&self) -> Result<String, NegotiationError> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(|e| NegotiationError::Protocol(format!("failed to create answer: {e}")))?;
        self.set_local_and_gather(answer).await
    }

    /// Apply the remote answer to an offer we sent.
    pub(crate) async fn apply_answer(&self, sdp: String) -> Result<(), NegotiationError> {
        let answer = RTCSessionDescription::answer(sdp)
            .map_err(|e| NegotiationError::Protocol(format!("failed to parse answer: {e}")))?;
        self.pc
            .set_remote_description(answer)
            .await
            .map_err(|e| NegotiationError::Protocol(format!("failed to apply answer: {e}")))
    }

    /// Report a failure on the event channel and close the connection.
    pub(crate) async fn fail(&self, error: NegotiationError) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        warn!(participant_id = %self.participant_id, error = %error, "Session failed");
        let _ = self.event_tx.send(SessionEvent::Failed(error)).await;
        self.close_connection().await;
    }

    /// The remote side hung up.
    pub(crate) async fn remote_hangup(&self) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(participant_id = %self.participant_id, "Remote hung up");
        let _ = self.event_tx.send(SessionEvent::Closed).await;
        self.close_connection().await;
    }

    async fn set_local_and_gather(
        &self,
        description: RTCSessionDescription,
    ) -> Result<String, NegotiationError> {
        // Candidates are sent inside the description, not trickled.
        let mut gathered = self.pc.gathering_complete_promise().await;
        self.pc
            .set_local_description(description)
            .await
            .map_err(|e| {
                NegotiationError::Protocol(format!("failed to set local description: {e}"))
            })?;
        let _ = gathered.recv().await;

        self.pc
            .local_description()
            .await
            .map(|d| d.sdp)
            .ok_or_else(|| NegotiationError::Protocol("no local description".into()))
    }

    async fn close_connection(&self) {
        if let Err(e) = self.pc.close().await {
            debug!(
                participant_id = %self.participant_id,
                error = %e,
                "Peer connection close failed"
            );
        }
    }
}

#[async_trait]
impl MediaSession for WebRtcSession {
    fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    async fn has_sender(&self, kind: TrackKind) -> bool {
        self.outgoing.lock().await.contains_key(&kind)
    }

    async fn replace_outgoing_track(&self, kind: TrackKind, track: &MediaTrack) -> bool {
        let mut outgoing = self.outgoing.lock().await;
        let Some(current) = outgoing.get_mut(&kind) else {
            return false;
        };

        let stream_id = current.track.stream_id().to_string();
        let local = local_sample_track(track, &stream_id);
        match current
            .sender
            .replace_track(Some(Arc::clone(&local) as Arc<dyn TrackLocal + Send + Sync>))
            .await
        {
            Ok(()) => {
                current.track = local;
                true
            }
            Err(e) => {
                warn!(
                    participant_id = %self.participant_id,
                    kind = %kind,
                    error = %e,
                    "Track replacement failed"
                );
                false
            }
        }
    }

    async fn close(&self) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        let hangup = NegotiationSignal::Hangup {
            session_id: self.session_id.clone(),
        };
        if let Err(e) = self.signaling.send_signal(&self.participant_id, hangup).await {
            debug!(participant_id = %self.participant_id, error = %e, "Hangup not delivered");
        }
        self.close_connection().await;
    }
}

// ---------------------------------------------------------------------------
// Connection callbacks
// ---------------------------------------------------------------------------

fn register_state_handler(
    pc: &RTCPeerConnection,
    participant_id: &ParticipantId,
    event_tx: mpsc::Sender<SessionEvent>,
    finished: Arc<AtomicBool>,
) {
    let participant_id = participant_id.clone();
    pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
        let participant_id = participant_id.clone();
        let event_tx = event_tx.clone();
        let finished = Arc::clone(&finished);

        Box::pin(async move {
            debug!(participant_id = %participant_id, state = %state, "Peer connection state");
            let event = match state {
                RTCPeerConnectionState::Failed => SessionEvent::Failed(
                    NegotiationError::Transport("peer connection failed".into()),
                ),
                RTCPeerConnectionState::Disconnected | RTCPeerConnectionState::Closed => {
                    SessionEvent::Closed
                }
                _ => return,
            };
            if !finished.swap(true, Ordering::SeqCst) {
                let _ = event_tx.send(event).await;
            }
        })
    }));
}

/// Collect remote tracks into one stream and report it each time a track
/// arrives.
fn register_track_handler(
    pc: &RTCPeerConnection,
    participant_id: &ParticipantId,
    session_id: &str,
    event_tx: mpsc::Sender<SessionEvent>,
) {
    let participant_id = participant_id.clone();
    let remote = Arc::new(Mutex::new(MediaStream::with_id(
        format!("remote-{session_id}"),
        Vec::new(),
    )));

    pc.on_track(Box::new(move |track, _receiver, _transceiver| {
        let participant_id = participant_id.clone();
        let event_tx = event_tx.clone();
        let remote = Arc::clone(&remote);

        Box::pin(async move {
            let kind = match track.kind() {
                RTPCodecType::Audio => TrackKind::Audio,
                RTPCodecType::Video => TrackKind::Video,
                _ => return,
            };
            info!(participant_id = %participant_id, kind = %kind, "Remote track received");

            let stream = {
                let mut remote = remote.lock().await;
                remote.add_track(MediaTrack::with_id(track.id(), kind, track.stream_id()));
                remote.clone()
            };
            let _ = event_tx.send(SessionEvent::RemoteStream(stream)).await;
        })
    }));
}

fn local_sample_track(track: &MediaTrack, stream_id: &str) -> Arc<TrackLocalStaticSample> {
    let capability = match track.kind() {
        TrackKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        TrackKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
    };
    Arc::new(TrackLocalStaticSample::new(
        capability,
        track.id().to_string(),
        stream_id.to_string(),
    ))
}
