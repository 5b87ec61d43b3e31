//! Cinema mode: a YouTube video everyone in the room watches together.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Length of a YouTube video id.
const VIDEO_ID_LEN: usize = 11;

static YOUTUBE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*").unwrap()
});

/// Extract the video id from a YouTube URL.
///
/// Accepts `youtu.be/ID`, `/v/ID`, `/u/x/ID`, `/embed/ID`, `watch?v=ID` and
/// `&v=ID` forms. Returns `None` unless the id is exactly 11 characters.
pub fn extract_youtube_id(url: &str) -> Option<String> {
    let caps = YOUTUBE_URL_RE.captures(url.trim())?;
    let id = caps.get(2)?.as_str();
    is_video_id(id).then(|| id.to_string())
}

/// Whether `id` has the shape of a YouTube video id.
pub fn is_video_id(id: &str) -> bool {
    id.chars().count() == VIDEO_ID_LEN
}

/// The video currently playing in cinema mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CinemaSession {
    pub video_id: String,
    /// `None` when started locally or by a client that sends no name.
    pub started_by: Option<String>,
}

impl CinemaSession {
    pub fn embed_url(&self) -> String {
        format!(
            "https://www.youtube.com/embed/{}?autoplay=1&mute=0",
            self.video_id
        )
    }
}

/// Cinema state for one call. A new start replaces the current video.
#[derive(Debug, Default)]
pub struct CinemaState {
    current: Option<CinemaSession>,
}

impl CinemaState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(
        &mut self,
        video_id: impl Into<String>,
        started_by: Option<String>,
    ) -> &CinemaSession {
        self.current.insert(CinemaSession {
            video_id: video_id.into(),
            started_by,
        })
    }

    pub fn stop(&mut self) -> Option<CinemaSession> {
        self.current.take()
    }

    pub fn current(&self) -> Option<&CinemaSession> {
        self.current.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }
}
