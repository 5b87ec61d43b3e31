//! Local capture: tracks, streams and the devices they come from.

mod devices;
mod local;
mod track;

pub use devices::{HeadlessDevices, MediaDevices};
pub use local::LocalMedia;
pub use track::{MediaStream, MediaTrack, TrackKind};
