//! Track and stream handles shared between the media source and sessions.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use roomcall_common::new_id;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Media kind carried by a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Audio,
    Video,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

struct TrackInner {
    id: String,
    kind: TrackKind,
    label: String,
    enabled: AtomicBool,
    /// `true` once the track has ended, either locally or by the platform.
    ended: watch::Sender<bool>,
}

/// A cloneable handle to one media track.
///
/// Clones share the enabled flag and the ended state.
#[derive(Clone)]
pub struct MediaTrack {
    inner: Arc<TrackInner>,
}

impl MediaTrack {
    pub fn new(kind: TrackKind, label: impl Into<String>) -> Self {
        Self::with_id(new_id(), kind, label)
    }

    pub fn with_id(id: impl Into<String>, kind: TrackKind, label: impl Into<String>) -> Self {
        let (ended, _) = watch::channel(false);
        Self {
            inner: Arc::new(TrackInner {
                id: id.into(),
                kind,
                label: label.into(),
                enabled: AtomicBool::new(true),
                ended,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> TrackKind {
        self.inner.kind
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_live(&self) -> bool {
        !*self.inner.ended.borrow()
    }

    /// End the track. Idempotent.
    pub fn stop(&self) {
        self.inner.ended.send_replace(true);
    }

    /// Resolve once the track has ended.
    pub async fn ended(&self) {
        let mut rx = self.inner.ended.subscribe();
        let _ = rx.wait_for(|ended| *ended).await;
    }
}

impl PartialEq for MediaTrack {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for MediaTrack {}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("label", &self.inner.label)
            .field("enabled", &self.is_enabled())
            .field("live", &self.is_live())
            .finish()
    }
}

/// An ordered set of tracks sent or received together.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self::with_id(new_id(), tracks)
    }

    pub fn with_id(id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    /// First track of the given kind.
    pub fn track(&self, kind: TrackKind) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == kind)
    }

    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.track(TrackKind::Video)
    }

    pub fn audio_track(&self) -> Option<&MediaTrack> {
        self.track(TrackKind::Audio)
    }

    /// Add a track, replacing any existing track with the same id.
    pub fn add_track(&mut self, track: MediaTrack) {
        self.tracks.retain(|t| t.id() != track.id());
        self.tracks.push(track);
    }

    /// A stream is active while at least one of its tracks is live.
    pub fn is_active(&self) -> bool {
        self.tracks.iter().any(MediaTrack::is_live)
    }

    pub fn stop(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

impl PartialEq for MediaStream {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MediaStream {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn new_track_is_live_and_enabled() {
        let track = MediaTrack::new(TrackKind::Audio, "mic");
        assert!(track.is_live());
        assert!(track.is_enabled());
        assert_eq!(track.kind(), TrackKind::Audio);
        assert_eq!(track.label(), "mic");
    }

    #[test]
    fn clones_share_state() {
        let track = MediaTrack::new(TrackKind::Video, "cam");
        let clone = track.clone();
        clone.set_enabled(false);
        track.stop();
        assert!(!track.is_enabled());
        assert!(!clone.is_live());
        assert_eq!(track, clone);
    }

    #[tokio::test]
    async fn ended_resolves_after_stop() {
        let track = MediaTrack::new(TrackKind::Video, "screen");
        let waiter = track.clone();
        let handle = tokio::spawn(async move { waiter.ended().await });
        tokio::time::sleep(Duration::from_millis(5)).await;
        track.stop();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("ended() did not resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn ended_resolves_immediately_for_stopped_track() {
        let track = MediaTrack::new(TrackKind::Audio, "mic");
        track.stop();
        tokio::time::timeout(Duration::from_millis(50), track.ended())
            .await
            .expect("ended() should not block");
    }

    #[test]
    fn stream_finds_tracks_by_kind() {
        let stream = MediaStream::new(vec![
            MediaTrack::new(TrackKind::Video, "cam"),
            MediaTrack::new(TrackKind::Audio, "mic"),
        ]);
        assert_eq!(stream.video_track().unwrap().label(), "cam");
        assert_eq!(stream.audio_track().unwrap().label(), "mic");
    }

    #[test]
    fn stream_is_inactive_once_all_tracks_end() {
        let video = MediaTrack::new(TrackKind::Video, "screen");
        let audio = MediaTrack::new(TrackKind::Audio, "system");
        let stream = MediaStream::new(vec![video.clone(), audio.clone()]);

        video.stop();
        assert!(stream.is_active());
        audio.stop();
        assert!(!stream.is_active());
    }

    #[test]
    fn add_track_replaces_same_id() {
        let mut stream = MediaStream::new(Vec::new());
        stream.add_track(MediaTrack::with_id("t1", TrackKind::Video, "a"));
        stream.add_track(MediaTrack::with_id("t1", TrackKind::Video, "b"));
        assert_eq!(stream.tracks().len(), 1);
        assert_eq!(stream.tracks()[0].label(), "b");
    }
}
