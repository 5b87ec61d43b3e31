//! Background WebSocket connection loop with auto-reconnect.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use roomcall_common::{ParticipantId, SignalingError};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::handler::handle_relay_text;
use super::types::{RelayCommand, RelayFrame, RelaySettings, SignalingEvent};

/// The room to rejoin after a reconnect.
#[derive(Debug, Clone)]
pub(crate) struct JoinedRoom {
    pub(crate) room: String,
    pub(crate) participant_id: ParticipantId,
}

impl JoinedRoom {
    fn join_frame(&self) -> RelayFrame {
        RelayFrame::JoinRoom {
            room: self.room.clone(),
            participant_id: self.participant_id.clone(),
        }
    }
}

type SharedRoom = Arc<RwLock<Option<JoinedRoom>>>;

async fn send_frame<S>(writer: &Mutex<S>, frame: &RelayFrame) -> bool
where
    S: Sink<WsMessage> + Unpin,
{
    match serde_json::to_string(frame) {
        Ok(json) => writer
            .lock()
            .await
            .send(WsMessage::Text(json.into()))
            .await
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Failed to encode relay frame");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Background task managing the relay connection with auto-reconnect.
///
/// Exits once a `Disconnect` command was processed or every client handle
/// was dropped.
pub(crate) async fn connection_loop(
    settings: RelaySettings,
    connected: Arc<RwLock<bool>>,
    event_tx: mpsc::Sender<SignalingEvent>,
    command_rx: mpsc::Receiver<RelayCommand>,
) {
    let command_rx = Arc::new(Mutex::new(command_rx));
    let joined_room: SharedRoom = Arc::new(RwLock::new(None));
    let shutdown = Arc::new(AtomicBool::new(false));
    let mut reconnect_delay = settings.reconnect_delay_secs;

    loop {
        info!(url = %settings.url, "Connecting to relay");

        match tokio::time::timeout(
            Duration::from_secs(settings.connect_timeout_secs),
            tokio_tungstenite::connect_async(settings.url.as_str()),
        )
        .await
        {
            Ok(Ok((ws_stream, _))) => {
                reconnect_delay = settings.reconnect_delay_secs;
                *connected.write().await = true;
                let _ = event_tx.send(SignalingEvent::Connected).await;

                let (ws_write, ws_read) = ws_stream.split();
                let ws_write = Arc::new(Mutex::new(ws_write));

                // Rejoin the room after a reconnect.
                if let Some(room) = joined_room.read().await.clone() {
                    info!(room = %room.room, "Rejoining room");
                    send_frame(&ws_write, &room.join_frame()).await;
                }

                let heartbeat_handle = tokio::spawn(heartbeat_task(
                    Arc::clone(&ws_write),
                    settings.heartbeat_interval_secs,
                ));

                let mut cmd_handle = tokio::spawn(command_forwarder(
                    Arc::clone(&command_rx),
                    Arc::clone(&ws_write),
                    Arc::clone(&joined_room),
                    Arc::clone(&shutdown),
                ));

                let mut read_stream = ws_read;
                loop {
                    tokio::select! {
                        msg = read_stream.next() => match msg {
                            Some(Ok(WsMessage::Text(text))) => {
                                handle_relay_text(&text, &event_tx).await;
                            }
                            Some(Ok(WsMessage::Close(_))) | None => {
                                info!("Relay closed connection");
                                break;
                            }
                            Some(Err(e)) => {
                                warn!(error = %e, "WebSocket error");
                                break;
                            }
                            Some(Ok(_)) => {}
                        },
                        // The forwarder only returns on Disconnect or once
                        // every handle is gone.
                        _ = &mut cmd_handle => break,
                    }
                }

                heartbeat_handle.abort();
                cmd_handle.abort();
                *connected.write().await = false;
                let _ = event_tx.send(SignalingEvent::Disconnected).await;
            }
            Ok(Err(e)) => {
                let err = SignalingError::Connect(e.to_string());
                error!(error = %err, "Failed to connect to relay");
                let _ = event_tx.send(SignalingEvent::Error(err.to_string())).await;
            }
            Err(_elapsed) => {
                let err = SignalingError::ConnectTimeout(settings.connect_timeout_secs);
                error!(error = %err, "Relay connection timed out");
                let _ = event_tx.send(SignalingEvent::Error(err.to_string())).await;
            }
        }

        if shutdown.load(Ordering::Acquire) {
            info!("Relay client shut down");
            return;
        }

        // Exponential backoff reconnect.
        info!(
            delay = reconnect_delay,
            "Reconnecting in {} seconds", reconnect_delay
        );
        tokio::time::sleep(Duration::from_secs(reconnect_delay)).await;
        reconnect_delay = (reconnect_delay * 2).min(settings.max_reconnect_delay_secs);
    }
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

async fn heartbeat_task<S>(ws_write: Arc<Mutex<S>>, interval_secs: u64)
where
    S: Sink<WsMessage> + Unpin,
{
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // The first tick completes immediately.
    interval.tick().await;
    loop {
        interval.tick().await;
        if !send_frame(&ws_write, &RelayFrame::Heartbeat {}).await {
            break;
        }
    }
}

// ---------------------------------------------------------------------------
// Command Forwarder
// ---------------------------------------------------------------------------

async fn command_forwarder<S>(
    cmd_rx: Arc<Mutex<mpsc::Receiver<RelayCommand>>>,
    cmd_write: Arc<Mutex<S>>,
    joined_room: SharedRoom,
    shutdown: Arc<AtomicBool>,
) where
    S: Sink<WsMessage> + Unpin,
{
    let mut rx = cmd_rx.lock().await;
    while let Some(cmd) = rx.recv().await {
        match cmd {
            RelayCommand::Join {
                room,
                participant_id,
            } => {
                let joined = JoinedRoom {
                    room,
                    participant_id,
                };
                info!(
                    room = %joined.room,
                    participant_id = %joined.participant_id,
                    "Joining room"
                );
                send_frame(&cmd_write, &joined.join_frame()).await;
                *joined_room.write().await = Some(joined);
            }
            RelayCommand::Leave => {
                if let Some(joined) = joined_room.write().await.take() {
                    info!(room = %joined.room, "Leaving room");
                    send_frame(&cmd_write, &RelayFrame::LeaveRoom { room: joined.room }).await;
                }
            }
            RelayCommand::Publish { topic, payload } => {
                debug!(topic = %topic, "Publishing topic message");
                send_frame(&cmd_write, &RelayFrame::Publish { topic, payload }).await;
            }
            RelayCommand::Signal { to, signal } => {
                debug!(to = %to, session_id = signal.session_id(), "Sending signal");
                let frame = RelayFrame::Signal {
                    from: None,
                    to: Some(to),
                    signal,
                };
                send_frame(&cmd_write, &frame).await;
            }
            RelayCommand::Disconnect => {
                if let Some(joined) = joined_room.write().await.take() {
                    send_frame(&cmd_write, &RelayFrame::LeaveRoom { room: joined.room }).await;
                }
                let _ = cmd_write.lock().await.send(WsMessage::Close(None)).await;
                break;
            }
        }
    }
    // Reached on Disconnect or once every client handle is dropped.
    shutdown.store(true, Ordering::Release);
}
