//! Seam between the playback adapter and whatever talks to the cast receiver.
//!
//! The adapter only depends on [`RemoteMediaClient`] and [`RemoteMediaListener`];
//! [`RustCastClient`](crate::rust_cast_client::RustCastClient) is the production
//! implementation, tests plug in an in-memory one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CastPlaybackError;

/// Player state reported by the receiver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemotePlayerState {
    Idle,
    Buffering,
    Playing,
    Paused,
    /// Any state this crate does not know about (raw receiver value).
    Unknown(i32),
}

/// Why the receiver went idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdleReason {
    None,
    Finished,
    Cancelled,
    Interrupted,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamType {
    None,
    Buffered,
    Live,
}

/// Cast `metadataType` for a music track.
pub const METADATA_TYPE_MUSIC_TRACK: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastImage {
    pub url: String,
}

/// Music track metadata, serialized with the Cast field names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastMediaMetadata {
    pub metadata_type: u32,
    pub title: String,
    pub subtitle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<CastImage>,
}

/// Media descriptor sent to (and echoed back by) the receiver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMediaInfo {
    pub content_id: String,
    pub content_type: String,
    pub stream_type: StreamType,
    /// Stream duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub metadata: Option<CastMediaMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Value>,
}

/// Handle returned by [`RemoteMediaClient::add_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Notifications pushed by the remote client, usually from its own thread.
pub trait RemoteMediaListener: Send + Sync {
    fn on_remote_metadata_updated(&self);
    fn on_remote_status_updated(&self);
}

/// Blocking access to a cast receiver session.
///
/// Errors are limited to [`CastPlaybackError::NoConnection`],
/// [`CastPlaybackError::TransientDisconnection`] and
/// [`CastPlaybackError::Cast`].
pub trait RemoteMediaClient: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Loads `info` on the receiver, starting at `position_ms`.
    fn load(
        &self,
        info: &RemoteMediaInfo,
        autoplay: bool,
        position_ms: i64,
        custom_data: &Value,
    ) -> Result<(), CastPlaybackError>;

    fn pause(&self) -> Result<(), CastPlaybackError>;

    fn seek(&self, position_ms: i64) -> Result<(), CastPlaybackError>;

    fn current_media_position(&self) -> Result<i64, CastPlaybackError>;

    /// Last player state received from the receiver.
    fn playback_status(&self) -> RemotePlayerState;

    fn idle_reason(&self) -> IdleReason;

    fn is_remote_media_loaded(&self) -> Result<bool, CastPlaybackError>;

    fn is_remote_media_playing(&self) -> Result<bool, CastPlaybackError>;

    /// Descriptor of what the receiver has loaded, if anything.
    fn remote_media_information(&self) -> Result<Option<RemoteMediaInfo>, CastPlaybackError>;

    fn add_listener(&self, listener: Arc<dyn RemoteMediaListener>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}
