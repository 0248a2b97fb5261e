use serde::{Deserialize, Serialize};

/// Position returned when the live position cannot be read from the receiver.
pub const UNKNOWN_POSITION: i64 = -1;

/// Logical playback state as seen by the host application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    #[default]
    Idle,
    Buffering,
    Playing,
    Paused,
    Stopped,
}

impl PlaybackState {
    /// Returns a human-readable label for the playback state.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "IDLE",
            PlaybackState::Buffering => "BUFFERING",
            PlaybackState::Playing => "PLAYING",
            PlaybackState::Paused => "PAUSED",
            PlaybackState::Stopped => "STOPPED",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptive metadata of a track, as resolved by a [`MusicCatalog`].
///
/// [`MusicCatalog`]: crate::catalog::MusicCatalog
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub id: String,
    pub title: Option<String>,
    /// Secondary line shown under the title; usually the artist.
    pub subtitle: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub album_artist: Option<String>,
    pub album_art_uri: Option<String>,
    /// Playable stream URI handed to the receiver.
    pub source: String,
    pub duration_ms: Option<u64>,
    pub track_number: Option<u32>,
}

impl TrackMetadata {
    /// Subtitle to display, falling back on the artist.
    pub fn display_subtitle(&self) -> Option<&str> {
        self.subtitle.as_deref().or(self.artist.as_deref())
    }
}

/// An entry of the host's play queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueItem {
    pub media_id: String,
    /// Display description, only used for logging.
    pub title: Option<String>,
}

impl QueueItem {
    pub fn new(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
