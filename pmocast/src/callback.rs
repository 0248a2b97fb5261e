use crate::model::PlaybackState;

/// Sink for everything the playback backend reports back to the host.
pub trait PlaybackCallback: Send + Sync {
    /// The track finished on its own.
    fn on_completion(&self);

    fn on_playback_status_changed(&self, state: PlaybackState);

    fn on_error(&self, message: &str);

    /// The receiver is playing another media id than the one the host asked for.
    fn set_current_media_id(&self, media_id: &str);
}
