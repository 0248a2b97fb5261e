use std::sync::Arc;

use crate::callback::PlaybackCallback;
use crate::model::{PlaybackState, QueueItem};

/// Playback surface the host drives, independently of where the audio is rendered.
///
/// Operations never return errors: failures are reported through
/// [`PlaybackCallback::on_error`], and read-only queries degrade to a cached
/// or neutral value.
pub trait Playback: Send + Sync {
    /// Starts listening to the backend.
    fn start(&self);

    /// Stops listening; state becomes `Stopped`, reported only if `notify_listeners`.
    fn stop(&self, notify_listeners: bool);

    fn set_state(&self, state: PlaybackState);

    fn state(&self) -> PlaybackState;

    fn is_connected(&self) -> bool;

    fn is_playing(&self) -> bool;

    /// Position in milliseconds.
    fn current_stream_position(&self) -> i64;

    fn set_current_stream_position(&self, position: i64);

    /// Snapshots the live position so it survives a disconnection.
    fn update_last_known_stream_position(&self);

    fn play(&self, item: &QueueItem);

    fn pause(&self);

    fn seek_to(&self, position: i64);

    fn set_current_media_id(&self, media_id: &str);

    fn current_media_id(&self) -> Option<String>;

    /// Replaces the callback sink.
    fn set_callback(&self, callback: Arc<dyn PlaybackCallback>);
}
