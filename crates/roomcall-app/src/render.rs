//! Text rendering of call events.

use roomcall_call::{CallEvent, RemovalReason};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";

/// One line describing `event`, or `None` for events with nothing to show.
pub fn describe(event: &CallEvent) -> Option<String> {
    let line = match event {
        CallEvent::Joined { room, local_id } => format!("joined {room} as {local_id}"),
        CallEvent::LocalStream(stream) => {
            let kinds: Vec<String> = stream.tracks().iter().map(|t| t.kind().to_string()).collect();
            format!("local preview: {}", kinds.join(" + "))
        }
        CallEvent::RemoteStream {
            participant_id,
            stream,
        } => format!(
            "{participant_id} is connected ({} tracks)",
            stream.tracks().len()
        ),
        CallEvent::PeerRemoved {
            participant_id,
            reason,
        } => match reason {
            RemovalReason::Left => format!("{participant_id} left"),
            RemovalReason::Closed => format!("{participant_id} hung up"),
            RemovalReason::Failed(e) => format!("connection to {participant_id} failed: {e}"),
            RemovalReason::LocalTeardown => return None,
        },
        CallEvent::AudioToggled(on) => format!("microphone {}", on_off(*on)),
        CallEvent::VideoToggled(on) => format!("camera {}", on_off(*on)),
        CallEvent::ScreenShareStarted => "screen sharing started".into(),
        CallEvent::ScreenShareStopped => "screen sharing stopped".into(),
        CallEvent::MediaError(e) => format!("media error: {e}"),
        CallEvent::ChatMessage(message) => format!("<{}> {}", message.sender, message.content),
        CallEvent::CinemaStarted {
            video_id,
            started_by,
        } => match started_by {
            Some(name) => format!("{name} started cinema: {WATCH_URL}{video_id}"),
            None => format!("cinema started: {WATCH_URL}{video_id}"),
        },
        CallEvent::CinemaRejected { url } => format!("not a YouTube link: {url}"),
        CallEvent::RelayConnected => "relay connected".into(),
        CallEvent::RelayDisconnected => "relay disconnected, reconnecting".into(),
        CallEvent::Ended => "call ended".into(),
    };
    Some(line)
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomcall_call::ChatMessage;
    use roomcall_common::{NegotiationError, ParticipantId};

    #[test]
    fn chat_shows_sender() {
        let event = CallEvent::ChatMessage(ChatMessage::outgoing("hi"));
        assert_eq!(describe(&event).unwrap(), "<You> hi");
    }

    #[test]
    fn removal_reasons() {
        let id = ParticipantId::from("p1");
        let left = CallEvent::PeerRemoved {
            participant_id: id.clone(),
            reason: RemovalReason::Left,
        };
        assert_eq!(describe(&left).unwrap(), "p1 left");

        let failed = CallEvent::PeerRemoved {
            participant_id: id.clone(),
            reason: RemovalReason::Failed(NegotiationError::Timeout(30)),
        };
        assert!(describe(&failed).unwrap().contains("timed out after 30s"));

        let teardown = CallEvent::PeerRemoved {
            participant_id: id,
            reason: RemovalReason::LocalTeardown,
        };
        assert!(describe(&teardown).is_none());
    }

    #[test]
    fn toggles_render_state() {
        assert_eq!(describe(&CallEvent::AudioToggled(false)).unwrap(), "microphone off");
        assert_eq!(describe(&CallEvent::VideoToggled(true)).unwrap(), "camera on");
    }

    #[test]
    fn cinema_names_starter() {
        let event = CallEvent::CinemaStarted {
            video_id: "dQw4w9WgXcQ".into(),
            started_by: Some("ada".into()),
        };
        assert_eq!(
            describe(&event).unwrap(),
            "ada started cinema: https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }
}
