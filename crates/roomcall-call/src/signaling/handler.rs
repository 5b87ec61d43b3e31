//! Incoming relay frame handler.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::types::{RelayFrame, SignalingEvent};

/// Translate one incoming frame into a [`SignalingEvent`].
///
/// Returns `None` for frames that carry nothing for the call (heartbeat
/// echoes, client-only frames, signals without a sender).
pub(crate) fn translate_frame(frame: RelayFrame) -> Option<SignalingEvent> {
    match frame {
        RelayFrame::UserConnected { participant_id } => {
            Some(SignalingEvent::PeerJoined(participant_id))
        }
        RelayFrame::UserDisconnected { participant_id } => {
            Some(SignalingEvent::PeerLeft(participant_id))
        }
        RelayFrame::Publish { topic, payload } => Some(SignalingEvent::Message { topic, payload }),
        RelayFrame::Signal {
            from: Some(from),
            signal,
            ..
        } => Some(SignalingEvent::Signal { from, signal }),
        RelayFrame::Signal { from: None, signal, .. } => {
            warn!(
                session_id = signal.session_id(),
                "Dropping signal without sender"
            );
            None
        }
        RelayFrame::Heartbeat {} => None,
        RelayFrame::JoinRoom { .. } | RelayFrame::LeaveRoom { .. } => {
            debug!("Ignoring client-only frame from relay");
            None
        }
    }
}

/// Parse a text frame and forward the resulting event.
pub(crate) async fn handle_relay_text(text: &str, event_tx: &mpsc::Sender<SignalingEvent>) {
    let frame = match serde_json::from_str::<RelayFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(error = %e, text = %text, "Unrecognized message from relay");
            return;
        }
    };

    if let Some(event) = translate_frame(frame) {
        if let SignalingEvent::Message { ref topic, .. } = event {
            debug!(topic = %topic, "Topic message received");
        }
        let _ = event_tx.send(event).await;
    }
}
