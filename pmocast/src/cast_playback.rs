//! [`Playback`] implementation driving a cast receiver.
//!
//! The adapter keeps a small local view of the session (state, media id,
//! position) and forwards everything else to a [`RemoteMediaClient`]. The
//! client pushes status and metadata notifications back through
//! [`RemoteMediaListener`], usually from its own watcher thread, so the
//! session sits behind a mutex. The lock is never held while calling the
//! remote client or the host callback.

use std::sync::{Arc, Mutex, Weak};

use tracing::{debug, error, warn};

use crate::callback::PlaybackCallback;
use crate::cast_media::{custom_data_for, item_id_from, to_cast_media_info};
use crate::catalog::MusicCatalog;
use crate::config::CastConfig;
use crate::errors::CastPlaybackError;
use crate::media_id::extract_music_id;
use crate::model::{PlaybackState, QueueItem, UNKNOWN_POSITION};
use crate::playback::Playback;
use crate::remote::{
    IdleReason, ListenerId, RemoteMediaClient, RemoteMediaListener, RemotePlayerState,
};

#[derive(Debug, Default)]
struct PlaybackSession {
    state: PlaybackState,
    current_media_id: Option<String>,
    current_position: i64,
}

pub struct CastPlayback {
    me: Weak<CastPlayback>,
    client: Arc<dyn RemoteMediaClient>,
    catalog: Arc<dyn MusicCatalog>,
    content_type: Option<String>,
    session: Mutex<PlaybackSession>,
    callback: Mutex<Option<Arc<dyn PlaybackCallback>>>,
    listener: Mutex<Option<ListenerId>>,
}

impl CastPlayback {
    pub fn new(client: Arc<dyn RemoteMediaClient>, catalog: Arc<dyn MusicCatalog>) -> Arc<Self> {
        Self::with_content_type(client, catalog, None)
    }

    pub fn from_config(
        client: Arc<dyn RemoteMediaClient>,
        catalog: Arc<dyn MusicCatalog>,
        config: &CastConfig,
    ) -> Arc<Self> {
        Self::with_content_type(client, catalog, config.playback.content_type.clone())
    }

    /// `content_type` forces the MIME type of every load instead of guessing
    /// it from the stream URI.
    pub fn with_content_type(
        client: Arc<dyn RemoteMediaClient>,
        catalog: Arc<dyn MusicCatalog>,
        content_type: Option<String>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| CastPlayback {
            me: me.clone(),
            client,
            catalog,
            content_type,
            session: Mutex::new(PlaybackSession::default()),
            callback: Mutex::new(None),
            listener: Mutex::new(None),
        })
    }

    /// True between `start` and `stop`.
    pub fn is_started(&self) -> bool {
        self.listener.lock().expect("Listener mutex poisoned").is_some()
    }

    fn session(&self) -> std::sync::MutexGuard<'_, PlaybackSession> {
        self.session.lock().expect("Session mutex poisoned")
    }

    fn callback(&self) -> Option<Arc<dyn PlaybackCallback>> {
        self.callback.lock().expect("Callback mutex poisoned").clone()
    }

    fn notify_state(&self, state: PlaybackState) {
        if let Some(callback) = self.callback() {
            callback.on_playback_status_changed(state);
        }
    }

    fn report_error(&self, err: &CastPlaybackError) {
        if let Some(callback) = self.callback() {
            callback.on_error(&err.to_string());
        }
    }

    /// Loads `media_id` on the receiver at the cached position.
    ///
    /// The cached position is reset to 0 when `media_id` is not the current
    /// one. The media id and position are only committed once the receiver
    /// accepted the load.
    fn load_media(&self, media_id: &str, autoplay: bool) -> Result<(), CastPlaybackError> {
        let music_id = extract_music_id(media_id);
        let track = self
            .catalog
            .music(music_id)
            .ok_or_else(|| CastPlaybackError::invalid_media_id(media_id))?;

        let position = {
            let session = self.session();
            if session.current_media_id.as_deref() == Some(media_id) {
                session.current_position
            } else {
                0
            }
        };

        let custom_data = custom_data_for(media_id)?;
        let info = to_cast_media_info(&track, &custom_data, self.content_type.as_deref());

        debug!(
            media_id = media_id,
            content_id = %info.content_id,
            autoplay,
            position,
            "Loading media on receiver"
        );
        self.client.load(&info, autoplay, position, &custom_data)?;

        let mut session = self.session();
        if session.current_media_id.as_deref() != Some(media_id) {
            session.current_media_id = Some(media_id.to_string());
            session.current_position = 0;
        }
        Ok(())
    }

    fn try_pause(&self) -> Result<(), CastPlaybackError> {
        if self.client.is_remote_media_loaded()? {
            self.client.pause()?;
            let position = self.client.current_media_position()?;
            self.session().current_position = position;
        } else {
            // Session rétablie sans média chargé : on recharge sans lecture auto
            let media_id = self
                .current_media_id()
                .ok_or_else(|| CastPlaybackError::missing_media_id("pause"))?;
            self.load_media(&media_id, false)?;
        }
        Ok(())
    }

    fn try_seek(&self, media_id: &str, position: i64) -> Result<(), CastPlaybackError> {
        if self.client.is_remote_media_loaded()? {
            self.client.seek(position)?;
            self.session().current_position = position;
        } else {
            self.session().current_position = position;
            self.load_media(media_id, false)?;
        }
        Ok(())
    }

    /// Adopts the media id the receiver reports when it differs from ours.
    ///
    /// Happens after a reconnection, or when joining a session another
    /// sender started.
    fn set_metadata_from_remote(&self) {
        if let Err(err) = self.try_set_metadata_from_remote() {
            error!(error = %err, "Failed to process remote metadata update");
        }
    }

    fn try_set_metadata_from_remote(&self) -> Result<(), CastPlaybackError> {
        let Some(info) = self.client.remote_media_information()? else {
            return Ok(());
        };
        let Some(custom_data) = info.custom_data.as_ref() else {
            return Ok(());
        };
        let Some(remote_media_id) = item_id_from(custom_data)? else {
            return Ok(());
        };

        let changed = {
            let mut session = self.session();
            if session.current_media_id.as_deref() != Some(remote_media_id.as_str()) {
                session.current_media_id = Some(remote_media_id.clone());
                true
            } else {
                false
            }
        };

        if changed {
            debug!(media_id = %remote_media_id, "Receiver media id differs, adopting it");
            if let Some(callback) = self.callback() {
                callback.set_current_media_id(&remote_media_id);
            }
            self.update_last_known_stream_position();
        }
        Ok(())
    }

    fn update_playback_state(&self) {
        let status = self.client.playback_status();
        let idle_reason = self.client.idle_reason();

        debug!(status = ?status, idle_reason = ?idle_reason, "Remote media player status updated");

        match status {
            RemotePlayerState::Idle => {
                if idle_reason == IdleReason::Finished {
                    if let Some(callback) = self.callback() {
                        callback.on_completion();
                    }
                }
            }
            RemotePlayerState::Buffering => {
                self.set_state(PlaybackState::Buffering);
                self.notify_state(PlaybackState::Buffering);
            }
            RemotePlayerState::Playing => {
                self.set_state(PlaybackState::Playing);
                self.set_metadata_from_remote();
                self.notify_state(PlaybackState::Playing);
            }
            RemotePlayerState::Paused => {
                self.set_state(PlaybackState::Paused);
                self.set_metadata_from_remote();
                self.notify_state(PlaybackState::Paused);
            }
            RemotePlayerState::Unknown(raw) => {
                debug!(status = raw, "Ignoring unknown remote player state");
            }
        }
    }
}

impl Playback for CastPlayback {
    fn start(&self) {
        let Some(me) = self.me.upgrade() else {
            return;
        };
        let mut listener = self.listener.lock().expect("Listener mutex poisoned");
        if listener.is_none() {
            *listener = Some(self.client.add_listener(me));
            debug!("Cast playback listening to receiver notifications");
        }
    }

    fn stop(&self, notify_listeners: bool) {
        let listener = self.listener.lock().expect("Listener mutex poisoned").take();
        if let Some(id) = listener {
            self.client.remove_listener(id);
        }

        self.set_state(PlaybackState::Stopped);
        if notify_listeners {
            self.notify_state(PlaybackState::Stopped);
        }
    }

    fn set_state(&self, state: PlaybackState) {
        self.session().state = state;
    }

    fn state(&self) -> PlaybackState {
        self.session().state
    }

    fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    fn is_playing(&self) -> bool {
        if !self.client.is_connected() {
            return false;
        }
        self.client.is_remote_media_playing().unwrap_or_else(|err| {
            error!(error = %err, "Failed to query remote playing state");
            false
        })
    }

    fn current_stream_position(&self) -> i64 {
        if !self.client.is_connected() {
            return self.session().current_position;
        }
        match self.client.current_media_position() {
            Ok(position) => position,
            Err(err) => {
                error!(error = %err, "Failed to get media position");
                UNKNOWN_POSITION
            }
        }
    }

    fn set_current_stream_position(&self, position: i64) {
        self.session().current_position = position;
    }

    fn update_last_known_stream_position(&self) {
        let position = self.current_stream_position();
        self.session().current_position = position;
    }

    fn play(&self, item: &QueueItem) {
        debug!(media_id = %item.media_id, title = ?item.title, "Play requested");
        match self.load_media(&item.media_id, true) {
            Ok(()) => {
                self.set_state(PlaybackState::Buffering);
                self.notify_state(PlaybackState::Buffering);
            }
            Err(err) => {
                error!(media_id = %item.media_id, error = %err, "Failed to load media");
                self.report_error(&err);
            }
        }
    }

    fn pause(&self) {
        if let Err(err) = self.try_pause() {
            error!(error = %err, "Failed to pause cast playback");
            self.report_error(&err);
        }
    }

    fn seek_to(&self, position: i64) {
        let Some(media_id) = self.current_media_id() else {
            warn!(position, "Seek requested without a media id");
            self.report_error(&CastPlaybackError::missing_media_id("seekTo"));
            return;
        };

        if let Err(err) = self.try_seek(&media_id, position) {
            error!(media_id = %media_id, position, error = %err, "Failed to seek cast playback");
            self.report_error(&err);
        }
    }

    fn set_current_media_id(&self, media_id: &str) {
        self.session().current_media_id = Some(media_id.to_string());
    }

    fn current_media_id(&self) -> Option<String> {
        self.session().current_media_id.clone()
    }

    fn set_callback(&self, callback: Arc<dyn PlaybackCallback>) {
        *self.callback.lock().expect("Callback mutex poisoned") = Some(callback);
    }
}

impl RemoteMediaListener for CastPlayback {
    fn on_remote_metadata_updated(&self) {
        debug!("Remote metadata updated");
        self.set_metadata_from_remote();
    }

    fn on_remote_status_updated(&self) {
        debug!("Remote status updated");
        self.update_playback_state();
    }
}
