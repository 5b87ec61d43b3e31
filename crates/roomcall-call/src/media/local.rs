//! The local media source: camera stream plus optional screen capture.

use std::sync::Arc;

use roomcall_common::MediaAccessError;
use tracing::{debug, info};

use super::devices::MediaDevices;
use super::track::MediaStream;

/// Owns the locally captured streams for the lifetime of a call.
///
/// At most one stream is outgoing at a time: the screen capture while it is
/// live, otherwise the camera. The camera stream is kept while sharing so it
/// can be restored when sharing stops.
pub struct LocalMedia {
    devices: Arc<dyn MediaDevices>,
    camera: Option<MediaStream>,
    screen: Option<MediaStream>,
}

impl LocalMedia {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            camera: None,
            screen: None,
        }
    }

    /// Open the camera and microphone. A second call returns the stream
    /// already held without touching the devices.
    pub async fn acquire_camera(&mut self) -> Result<MediaStream, MediaAccessError> {
        if let Some(ref camera) = self.camera {
            return Ok(camera.clone());
        }

        let stream = self.devices.camera_and_microphone().await?;
        info!(
            stream_id = stream.id(),
            tracks = stream.tracks().len(),
            "Camera acquired"
        );
        self.camera = Some(stream.clone());
        Ok(stream)
    }

    /// Start a screen capture.
    ///
    /// Returns the current capture if one is still live. On failure the
    /// previous state is left untouched.
    pub async fn acquire_screen(&mut self) -> Result<MediaStream, MediaAccessError> {
        if let Some(ref screen) = self.screen {
            if screen.video_track().is_some_and(|t| t.is_live()) {
                return Ok(screen.clone());
            }
        }

        let stream = self.devices.screen_capture().await?;
        if stream.video_track().is_none() {
            stream.stop();
            return Err(MediaAccessError::Device(
                "screen capture produced no video track".into(),
            ));
        }

        // A capture whose video ended without a release is replaced.
        if let Some(stale) = self.screen.take() {
            stale.stop();
        }

        info!(stream_id = stream.id(), "Screen capture started");
        self.screen = Some(stream.clone());
        Ok(stream)
    }

    /// Stop and drop the screen capture. Returns `false` if there was none.
    pub fn release_screen(&mut self) -> bool {
        match self.screen.take() {
            Some(screen) => {
                screen.stop();
                info!(stream_id = screen.id(), "Screen capture released");
                true
            }
            None => false,
        }
    }

    /// Enable or disable the microphone. Returns `false` without a camera
    /// stream.
    pub fn set_audio_enabled(&mut self, enabled: bool) -> bool {
        let Some(track) = self.camera.as_ref().and_then(|c| c.audio_track()) else {
            return false;
        };
        track.set_enabled(enabled);
        debug!(enabled, "Microphone toggled");
        true
    }

    /// Enable or disable the camera video. Returns `false` without a camera
    /// stream.
    pub fn set_video_enabled(&mut self, enabled: bool) -> bool {
        let Some(track) = self.camera.as_ref().and_then(|c| c.video_track()) else {
            return false;
        };
        track.set_enabled(enabled);
        debug!(enabled, "Camera toggled");
        true
    }

    /// Flip the microphone flag and return the new value.
    pub fn toggle_audio(&mut self) -> Option<bool> {
        let enabled = !self.camera.as_ref()?.audio_track()?.is_enabled();
        self.set_audio_enabled(enabled).then_some(enabled)
    }

    /// Flip the camera video flag and return the new value.
    pub fn toggle_video(&mut self) -> Option<bool> {
        let enabled = !self.camera.as_ref()?.video_track()?.is_enabled();
        self.set_video_enabled(enabled).then_some(enabled)
    }

    /// The stream new sessions should send.
    pub fn current_outgoing_stream(&self) -> Option<MediaStream> {
        if let Some(ref screen) = self.screen {
            if screen.video_track().is_some_and(|t| t.is_live()) {
                return Some(screen.clone());
            }
        }
        self.camera.clone()
    }

    pub fn camera_stream(&self) -> Option<&MediaStream> {
        self.camera.as_ref()
    }

    pub fn screen_stream(&self) -> Option<&MediaStream> {
        self.screen.as_ref()
    }

    pub fn is_sharing_screen(&self) -> bool {
        self.screen
            .as_ref()
            .and_then(|s| s.video_track())
            .is_some_and(|t| t.is_live())
    }

    /// Stop every local track. Used when the call ends.
    pub fn release_all(&mut self) {
        self.release_screen();
        if let Some(camera) = self.camera.take() {
            camera.stop();
            info!(stream_id = camera.id(), "Camera released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::TrackKind;
    use crate::test_support::MockDevices;

    fn media() -> (LocalMedia, Arc<MockDevices>) {
        let devices = Arc::new(MockDevices::default());
        (LocalMedia::new(devices.clone()), devices)
    }

    #[tokio::test]
    async fn acquire_camera_is_idempotent() {
        let (mut media, devices) = media();
        let first = media.acquire_camera().await.unwrap();
        let second = media.acquire_camera().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(devices.camera_requests(), 1);
    }

    #[tokio::test]
    async fn camera_denial_leaves_no_stream() {
        let (mut media, devices) = media();
        devices.deny_camera(MediaAccessError::PermissionDenied("camera".into()));
        let err = media.acquire_camera().await.unwrap_err();
        assert!(matches!(err, MediaAccessError::PermissionDenied(_)));
        assert!(media.current_outgoing_stream().is_none());
    }

    #[tokio::test]
    async fn outgoing_stream_prefers_live_screen() {
        let (mut media, _) = media();
        let camera = media.acquire_camera().await.unwrap();
        assert_eq!(media.current_outgoing_stream(), Some(camera.clone()));

        let screen = media.acquire_screen().await.unwrap();
        assert_eq!(media.current_outgoing_stream(), Some(screen.clone()));
        assert!(media.is_sharing_screen());

        screen.video_track().unwrap().stop();
        assert_eq!(media.current_outgoing_stream(), Some(camera));
        assert!(!media.is_sharing_screen());
    }

    #[tokio::test]
    async fn acquire_screen_returns_live_capture() {
        let (mut media, devices) = media();
        media.acquire_camera().await.unwrap();
        let first = media.acquire_screen().await.unwrap();
        let second = media.acquire_screen().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(devices.screen_requests(), 1);
    }

    #[tokio::test]
    async fn acquire_screen_replaces_ended_capture() {
        let (mut media, devices) = media();
        media.acquire_camera().await.unwrap();
        let first = media.acquire_screen().await.unwrap();
        first.video_track().unwrap().stop();

        let second = media.acquire_screen().await.unwrap();
        assert_ne!(first, second);
        assert_eq!(devices.screen_requests(), 2);
        assert!(!first.is_active());
    }

    #[tokio::test]
    async fn screen_denial_keeps_prior_state() {
        let (mut media, devices) = media();
        let camera = media.acquire_camera().await.unwrap();
        devices.deny_screen(MediaAccessError::Cancelled);

        let err = media.acquire_screen().await.unwrap_err();
        assert_eq!(err, MediaAccessError::Cancelled);
        assert!(media.screen_stream().is_none());
        assert_eq!(media.current_outgoing_stream(), Some(camera));
    }

    #[tokio::test]
    async fn release_screen_without_capture_is_noop() {
        let (mut media, _) = media();
        let camera = media.acquire_camera().await.unwrap();
        assert!(!media.release_screen());
        assert_eq!(media.current_outgoing_stream(), Some(camera));
    }

    #[tokio::test]
    async fn release_screen_stops_tracks() {
        let (mut media, _) = media();
        media.acquire_camera().await.unwrap();
        let screen = media.acquire_screen().await.unwrap();
        assert!(media.release_screen());
        assert!(!screen.is_active());
        assert!(media.screen_stream().is_none());
    }

    #[tokio::test]
    async fn toggles_act_on_camera_tracks() {
        let (mut media, _) = media();
        assert_eq!(media.toggle_audio(), None);
        assert!(!media.set_video_enabled(false));

        let camera = media.acquire_camera().await.unwrap();
        assert_eq!(media.toggle_audio(), Some(false));
        assert!(!camera.track(TrackKind::Audio).unwrap().is_enabled());
        assert_eq!(media.toggle_audio(), Some(true));

        assert_eq!(media.toggle_video(), Some(false));
        assert!(!camera.video_track().unwrap().is_enabled());
    }

    #[tokio::test]
    async fn release_all_stops_everything() {
        let (mut media, _) = media();
        let camera = media.acquire_camera().await.unwrap();
        let screen = media.acquire_screen().await.unwrap();
        media.release_all();
        assert!(!camera.is_active());
        assert!(!screen.is_active());
        assert!(media.current_outgoing_stream().is_none());
    }
}
