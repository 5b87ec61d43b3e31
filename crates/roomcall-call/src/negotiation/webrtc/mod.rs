//! [`Negotiator`] over the `webrtc` crate.
//!
//! Offers and answers carry their complete candidate list and travel through
//! the signaling relay as [`NegotiationSignal`]s. Each session is keyed by
//! the id chosen by its offerer, so signals for a superseded session never
//! reach its replacement.

mod session;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use roomcall_common::{new_id, NegotiationError, ParticipantId};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;

use super::{IncomingOffer, MediaSession, NegotiatedSession, Negotiator, SessionEvent};
use crate::media::MediaStream;
use crate::protocol::NegotiationSignal;
use crate::signaling::SignalingChannel;

pub use session::WebRtcSession;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebRtcSettings {
    /// STUN server URLs, e.g. `stun:stun.l.google.com:19302`.
    pub stun_servers: Vec<String>,
}

impl Default for WebRtcSettings {
    fn default() -> Self {
        Self {
            stun_servers: vec!["stun:stun.l.google.com:19302".into()],
        }
    }
}

/// Negotiates one `RTCPeerConnection` per remote participant.
pub struct WebRtcNegotiator {
    api: API,
    settings: WebRtcSettings,
    signaling: Arc<dyn SignalingChannel>,
    local_id: RwLock<Option<ParticipantId>>,
    sessions: Mutex<HashMap<String, Arc<WebRtcSession>>>,
    incoming_tx: mpsc::Sender<IncomingOffer>,
}

impl WebRtcNegotiator {
    /// Build the negotiator. Offers from remote participants arrive on the
    /// returned receiver.
    pub fn new(
        settings: WebRtcSettings,
        signaling: Arc<dyn SignalingChannel>,
    ) -> Result<(Self, mpsc::Receiver<IncomingOffer>), NegotiationError> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(|e| NegotiationError::Transport(format!("failed to register codecs: {e}")))?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(|e| {
                NegotiationError::Transport(format!("failed to register interceptors: {e}"))
            })?;
        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let (incoming_tx, incoming_rx) = mpsc::channel(32);
        let negotiator = Self {
            api,
            settings,
            signaling,
            local_id: RwLock::new(None),
            sessions: Mutex::new(HashMap::new()),
            incoming_tx,
        };
        Ok((negotiator, incoming_rx))
    }

    /// Number of sessions that have not finished.
    pub async fn session_count(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, s| !s.is_finished());
        sessions.len()
    }

    async fn ensure_open(&self) -> Result<(), NegotiationError> {
        match *self.local_id.read().await {
            Some(_) => Ok(()),
            None => Err(NegotiationError::NotOpen),
        }
    }

    async fn new_session(
        &self,
        remote: &ParticipantId,
        session_id: String,
    ) -> Result<(Arc<WebRtcSession>, mpsc::Receiver<SessionEvent>), NegotiationError> {
        let config = RTCConfiguration {
            ice_servers: self
                .settings
                .stun_servers
                .iter()
                .map(|url| RTCIceServer {
                    urls: vec![url.clone()],
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };
        let pc = self.api.new_peer_connection(config).await.map_err(|e| {
            NegotiationError::Transport(format!("failed to create peer connection: {e}"))
        })?;

        let (session, events) = WebRtcSession::new(
            remote.clone(),
            session_id.clone(),
            Arc::new(pc),
            Arc::clone(&self.signaling),
        );

        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, s| !s.is_finished());
        sessions.insert(session_id, Arc::clone(&session));
        Ok((session, events))
    }

    async fn session(&self, session_id: &str) -> Option<Arc<WebRtcSession>> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    async fn forget(&self, session_id: &str) {
        self.sessions.lock().await.remove(session_id);
    }

    async fn send(
        &self,
        to: &ParticipantId,
        signal: NegotiationSignal,
    ) -> Result<(), NegotiationError> {
        self.signaling
            .send_signal(to, signal)
            .await
            .map_err(|e| NegotiationError::Transport(e.to_string()))
    }
}

#[async_trait]
impl Negotiator for WebRtcNegotiator {
    async fn open(&self) -> Result<ParticipantId, NegotiationError> {
        let mut local_id = self.local_id.write().await;
        let id = local_id.get_or_insert_with(ParticipantId::generate).clone();
        info!(local_id = %id, "Negotiator open");
        Ok(id)
    }

    async fn initiate(
        &self,
        remote: &ParticipantId,
        outgoing: &MediaStream,
    ) -> Result<NegotiatedSession, NegotiationError> {
        self.ensure_open().await?;
        let session_id = new_id();
        let (session, events) = self.new_session(remote, session_id.clone()).await?;

        let offer = async {
            session.add_outgoing(outgoing).await?;
            let sdp = session.create_offer().await?;
            self.send(
                remote,
                NegotiationSignal::Offer {
                    session_id: session_id.clone(),
                    sdp,
                },
            )
            .await
        };
        if let Err(e) = offer.await {
            self.forget(&session_id).await;
            session.fail(e.clone()).await;
            return Err(e);
        }

        debug!(participant_id = %remote, session_id = %session_id, "Offer sent");
        Ok(NegotiatedSession {
            session,
            events,
        })
    }

    async fn answer(
        &self,
        offer: IncomingOffer,
        outgoing: &MediaStream,
    ) -> Result<NegotiatedSession, NegotiationError> {
        self.ensure_open().await?;
        let IncomingOffer { from, signal } = offer;
        let (session_id, sdp) = match signal {
            NegotiationSignal::Offer { session_id, sdp } => (session_id, sdp),
            other => {
                return Err(NegotiationError::Protocol(format!(
                    "expected an offer, got {}",
                    signal_kind(&other)
                )))
            }
        };

        let (session, events) = self.new_session(&from, session_id.clone()).await?;
        let answer = async {
            session.accept_offer(sdp).await?;
            session.add_outgoing(outgoing).await?;
            let sdp = session.create_answer().await?;
            self.send(
                &from,
                NegotiationSignal::Answer {
                    session_id: session_id.clone(),
                    sdp,
                },
            )
            .await
        };
        if let Err(e) = answer.await {
            self.forget(&session_id).await;
            session.fail(e.clone()).await;
            return Err(e);
        }

        debug!(participant_id = %from, session_id = %session_id, "Answer sent");
        Ok(NegotiatedSession {
            session,
            events,
        })
    }

    async fn handle_signal(&self, from: ParticipantId, signal: NegotiationSignal) {
        let session_id = signal.session_id().to_string();
        match signal {
            NegotiationSignal::Offer { .. } => {
                if self
                    .incoming_tx
                    .send(IncomingOffer { from, signal })
                    .await
                    .is_err()
                {
                    debug!(session_id = %session_id, "Offer dropped, no receiver");
                }
            }
            NegotiationSignal::Answer { sdp, .. } => {
                let Some(session) = self.session(&session_id).await else {
                    debug!(
                        participant_id = %from,
                        session_id = %session_id,
                        "Answer for unknown session"
                    );
                    return;
                };
                if *session.participant_id() != from {
                    warn!(
                        participant_id = %from,
                        session_id = %session_id,
                        "Answer from wrong participant"
                    );
                    return;
                }
                if let Err(e) = session.apply_answer(sdp).await {
                    self.forget(&session_id).await;
                    session.fail(e).await;
                }
            }
            NegotiationSignal::Hangup { .. } => {
                if let Some(session) = self.session(&session_id).await {
                    if *session.participant_id() == from {
                        self.forget(&session_id).await;
                        session.remote_hangup().await;
                    }
                }
            }
        }
    }
}

fn signal_kind(signal: &NegotiationSignal) -> &'static str {
    match signal {
        NegotiationSignal::Offer { .. } => "offer",
        NegotiationSignal::Answer { .. } => "answer",
        NegotiationSignal::Hangup { .. } => "hangup",
    }
}
