//! The call event loop.

use std::sync::Arc;

use roomcall_common::{CallError, ParticipantId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::chat::{ChatHistory, ChatMessage};
use crate::cinema::{extract_youtube_id, is_video_id, CinemaState};
use crate::events::CallEvent;
use crate::media::{LocalMedia, MediaDevices, MediaStream};
use crate::negotiation::{IncomingOffer, Negotiator};
use crate::protocol::{topics, ChatPayload, CinemaPayload};
use crate::registry::{PeerRegistry, RegistryInput};
use crate::signaling::{SignalingChannel, SignalingEvent};

use super::handle::CallHandle;
use super::types::{CallChannels, CallCommand, CallSettings, PeerSummary};

// ---------------------------------------------------------------------------
// Coordinator
// ---------------------------------------------------------------------------

/// Runs one call: owns the local media, the peer registry, chat history and
/// cinema state, and processes one input at a time.
pub struct CallCoordinator {
    settings: CallSettings,
    local_id: ParticipantId,
    media: LocalMedia,
    registry: PeerRegistry,
    negotiator: Arc<dyn Negotiator>,
    signaling: Arc<dyn SignalingChannel>,
    chat: ChatHistory,
    cinema: CinemaState,
    event_tx: mpsc::Sender<CallEvent>,
    /// Carries the stream id of a screen capture whose video track ended.
    screen_ended_tx: mpsc::Sender<String>,
}

/// Receivers owned by the running loop.
struct LoopInputs {
    commands: mpsc::Receiver<CallCommand>,
    channels: CallChannels,
    registry: mpsc::Receiver<RegistryInput>,
    screen_ended: mpsc::Receiver<String>,
}

impl CallCoordinator {
    /// Acquire the camera, obtain the local id, join the room and start the
    /// event loop.
    ///
    /// A camera failure is returned and nothing is joined.
    pub async fn start(
        settings: CallSettings,
        devices: Arc<dyn MediaDevices>,
        negotiator: Arc<dyn Negotiator>,
        signaling: Arc<dyn SignalingChannel>,
        channels: CallChannels,
    ) -> Result<(CallHandle, mpsc::Receiver<CallEvent>), CallError> {
        let (event_tx, event_rx) = mpsc::channel(256);

        let mut media = LocalMedia::new(devices);
        let camera = media.acquire_camera().await?;
        let _ = event_tx.send(CallEvent::LocalStream(camera)).await;

        let local_id = match join_room(&settings.room, &*negotiator, &*signaling).await {
            Ok(id) => id,
            Err(e) => {
                media.release_all();
                return Err(e);
            }
        };
        info!(room = %settings.room, local_id = %local_id, "Joined room");
        let _ = event_tx
            .send(CallEvent::Joined {
                room: settings.room.clone(),
                local_id: local_id.clone(),
            })
            .await;

        let (registry, registry_rx) = PeerRegistry::new(
            local_id.clone(),
            Arc::clone(&negotiator),
            settings.registry.clone(),
            event_tx.clone(),
        );
        let (command_tx, command_rx) = mpsc::channel(64);
        let (screen_ended_tx, screen_ended_rx) = mpsc::channel(8);

        let coordinator = Self {
            chat: ChatHistory::new(settings.chat.clone()),
            settings,
            local_id: local_id.clone(),
            media,
            registry,
            negotiator,
            signaling,
            cinema: CinemaState::new(),
            event_tx,
            screen_ended_tx,
        };
        let inputs = LoopInputs {
            commands: command_rx,
            channels,
            registry: registry_rx,
            screen_ended: screen_ended_rx,
        };
        let task = tokio::spawn(coordinator.run(inputs));

        Ok((
            CallHandle {
                command_tx,
                local_id,
                task,
            },
            event_rx,
        ))
    }

    async fn run(mut self, mut inputs: LoopInputs) {
        loop {
            tokio::select! {
                command = inputs.commands.recv() => match command {
                    Some(CallCommand::EndCall) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = inputs.channels.signaling.recv() => {
                    self.handle_signaling(event).await;
                }
                Some(offer) = inputs.channels.incoming.recv() => {
                    self.handle_incoming_offer(offer);
                }
                Some(input) = inputs.registry.recv() => {
                    let outgoing = self.media.current_outgoing_stream();
                    self.registry.handle_input(input, outgoing.as_ref()).await;
                }
                Some(stream_id) = inputs.screen_ended.recv() => {
                    self.handle_screen_ended(&stream_id).await;
                }
            }
        }

        self.shutdown().await;
    }

    // -- signaling ------------------------------------------------------------

    async fn handle_signaling(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Connected => {
                info!("Relay connected");
                self.emit(CallEvent::RelayConnected).await;
            }
            SignalingEvent::Disconnected => {
                // Sessions stay up; their own connection state decides.
                warn!(peers = self.registry.len(), "Relay disconnected");
                self.emit(CallEvent::RelayDisconnected).await;
            }
            SignalingEvent::PeerJoined(id) => self.registry.on_participant_joined(id),
            SignalingEvent::PeerLeft(id) => self.registry.on_participant_left(&id).await,
            SignalingEvent::Message { topic, payload } => {
                self.handle_topic_message(&topic, payload).await;
            }
            SignalingEvent::Signal { from, signal } => {
                self.negotiator.handle_signal(from, signal).await;
            }
            SignalingEvent::Error(message) => {
                warn!(error = %message, "Relay error");
            }
        }
    }

    async fn handle_topic_message(&mut self, topic: &str, payload: serde_json::Value) {
        match topic {
            topics::CHAT_MESSAGE => match serde_json::from_value::<ChatPayload>(payload) {
                Ok(payload) => {
                    let message = ChatMessage::incoming(payload);
                    debug!(sender = %message.sender, "Chat message received");
                    self.chat.push(message.clone());
                    self.emit(CallEvent::ChatMessage(message)).await;
                }
                Err(e) => warn!(error = %e, "Malformed chat message"),
            },
            topics::CINEMA_START => match serde_json::from_value::<CinemaPayload>(payload) {
                Ok(payload) if is_video_id(&payload.video_id) => {
                    info!(video_id = %payload.video_id, "Cinema started remotely");
                    let session = self.cinema.start(payload.video_id, payload.started_by);
                    let event = CallEvent::CinemaStarted {
                        video_id: session.video_id.clone(),
                        started_by: session.started_by.clone(),
                    };
                    self.emit(event).await;
                }
                Ok(payload) => {
                    warn!(video_id = %payload.video_id, "Ignoring invalid cinema video id");
                }
                Err(e) => warn!(error = %e, "Malformed cinema message"),
            },
            other => debug!(topic = %other, "Ignoring message on unknown topic"),
        }
    }

    fn handle_incoming_offer(&mut self, offer: IncomingOffer) {
        let outgoing = self.media.current_outgoing_stream();
        self.registry.on_incoming_offer(offer, outgoing.as_ref());
    }

    // -- commands -------------------------------------------------------------

    async fn handle_command(&mut self, command: CallCommand) {
        match command {
            CallCommand::ToggleAudio => {
                if let Some(enabled) = self.media.toggle_audio() {
                    self.emit(CallEvent::AudioToggled(enabled)).await;
                }
            }
            CallCommand::ToggleVideo => {
                if let Some(enabled) = self.media.toggle_video() {
                    self.emit(CallEvent::VideoToggled(enabled)).await;
                }
            }
            CallCommand::ToggleScreenShare => {
                if self.media.is_sharing_screen() {
                    self.stop_screen_share().await;
                } else {
                    self.start_screen_share().await;
                }
            }
            CallCommand::StartScreenShare => self.start_screen_share().await,
            CallCommand::StopScreenShare => self.stop_screen_share().await,
            CallCommand::SendChat(text) => self.send_chat(text).await,
            CallCommand::StartCinema(url) => self.start_cinema(url).await,
            CallCommand::QueryPeers(reply) => {
                let peers = self
                    .registry
                    .participant_ids()
                    .into_iter()
                    .filter_map(|id| {
                        let state = self.registry.state_of(&id)?;
                        Some(PeerSummary {
                            participant_id: id,
                            state,
                        })
                    })
                    .collect();
                let _ = reply.send(peers);
            }
            // Handled by the loop.
            CallCommand::EndCall => {}
        }
    }

    async fn start_screen_share(&mut self) {
        if self.media.is_sharing_screen() {
            debug!("Screen share already active");
            return;
        }

        let stream = match self.media.acquire_screen().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(error = %e, "Screen capture failed");
                self.emit(CallEvent::MediaError(e)).await;
                return;
            }
        };

        let report = self.registry.broadcast_track_substitution(&stream).await;
        info!(
            stream_id = stream.id(),
            video = report.video,
            audio = report.audio,
            "Screen share started"
        );
        self.watch_screen_end(&stream);

        self.emit(CallEvent::LocalStream(stream)).await;
        self.emit(CallEvent::ScreenShareStarted).await;
    }

    /// Treat the end of the capture's video track as a stop request.
    fn watch_screen_end(&self, stream: &MediaStream) {
        let Some(video) = stream.video_track().cloned() else {
            return;
        };
        let stream_id = stream.id().to_string();
        let tx = self.screen_ended_tx.clone();
        tokio::spawn(async move {
            video.ended().await;
            let _ = tx.send(stream_id).await;
        });
    }

    async fn handle_screen_ended(&mut self, stream_id: &str) {
        let current = self.media.screen_stream().map(|s| s.id().to_string());
        if current.as_deref() != Some(stream_id) {
            debug!(stream_id, "Ignoring end of a released capture");
            return;
        }
        info!(stream_id, "Screen capture ended externally");
        self.stop_screen_share().await;
    }

    async fn stop_screen_share(&mut self) {
        if !self.media.release_screen() {
            debug!("No screen share to stop");
            return;
        }

        let Some(camera) = self.media.camera_stream().cloned() else {
            return;
        };
        let report = self.registry.broadcast_track_substitution(&camera).await;
        info!(
            video = report.video,
            audio = report.audio,
            "Screen share stopped, camera restored"
        );

        self.emit(CallEvent::LocalStream(camera)).await;
        self.emit(CallEvent::ScreenShareStopped).await;
    }

    async fn send_chat(&mut self, text: String) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let payload = ChatPayload {
            sender: self.settings.display_name.clone(),
            message: text.to_string(),
        };
        match serde_json::to_value(&payload) {
            Ok(value) => {
                if let Err(e) = self.signaling.publish(topics::CHAT_MESSAGE, value).await {
                    warn!(error = %e, "Failed to publish chat message");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode chat message"),
        }

        let message = ChatMessage::outgoing(text);
        self.chat.push(message.clone());
        self.emit(CallEvent::ChatMessage(message)).await;
    }

    async fn start_cinema(&mut self, url: String) {
        let Some(video_id) = extract_youtube_id(&url) else {
            info!(url = %url, "Not a YouTube URL");
            self.emit(CallEvent::CinemaRejected { url }).await;
            return;
        };

        let payload = CinemaPayload {
            video_id: video_id.clone(),
            started_by: Some(self.settings.display_name.clone()),
        };
        match serde_json::to_value(&payload) {
            Ok(value) => {
                if let Err(e) = self.signaling.publish(topics::CINEMA_START, value).await {
                    warn!(error = %e, "Failed to publish cinema start");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode cinema start"),
        }

        info!(video_id = %video_id, "Cinema started");
        self.cinema.start(video_id.clone(), None);
        self.emit(CallEvent::CinemaStarted {
            video_id,
            started_by: None,
        })
        .await;
    }

    // -- teardown -------------------------------------------------------------

    async fn shutdown(&mut self) {
        info!(local_id = %self.local_id, "Ending call");
        self.registry.close_all().await;
        if let Err(e) = self.signaling.leave().await {
            warn!(error = %e, "Failed to leave room");
        }
        self.media.release_all();
        self.cinema.stop();
        self.emit(CallEvent::Ended).await;
    }

    async fn emit(&self, event: CallEvent) {
        let _ = self.event_tx.send(event).await;
    }
}

/// Obtain the local id, then announce it in the room.
async fn join_room(
    room: &str,
    negotiator: &dyn Negotiator,
    signaling: &dyn SignalingChannel,
) -> Result<ParticipantId, CallError> {
    let local_id = negotiator.open().await?;
    signaling.join(room, &local_id).await?;
    Ok(local_id)
}
