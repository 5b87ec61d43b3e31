//! Capture device access.

use async_trait::async_trait;
use roomcall_common::MediaAccessError;
use tracing::debug;

use super::track::{MediaStream, MediaTrack, TrackKind};

/// Platform capture capabilities. Each call may prompt the user and may be
/// denied.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Open the default camera and microphone as one stream.
    async fn camera_and_microphone(&self) -> Result<MediaStream, MediaAccessError>;

    /// Start a screen capture. The video track ends when the user stops
    /// sharing from outside the application.
    async fn screen_capture(&self) -> Result<MediaStream, MediaAccessError>;
}

/// Devices for a process without capture hardware.
///
/// Tracks exist so sessions negotiate normally, but no frames are produced.
#[derive(Debug, Default, Clone)]
pub struct HeadlessDevices;

#[async_trait]
impl MediaDevices for HeadlessDevices {
    async fn camera_and_microphone(&self) -> Result<MediaStream, MediaAccessError> {
        debug!("Opening headless camera and microphone");
        Ok(MediaStream::new(vec![
            MediaTrack::new(TrackKind::Video, "headless-camera"),
            MediaTrack::new(TrackKind::Audio, "headless-microphone"),
        ]))
    }

    async fn screen_capture(&self) -> Result<MediaStream, MediaAccessError> {
        debug!("Opening headless screen capture");
        Ok(MediaStream::new(vec![MediaTrack::new(
            TrackKind::Video,
            "headless-screen",
        )]))
    }
}
