//! [`RemoteMediaClient`] backed by the rust_cast library.
//!
//! `connect` launches the Default Media Receiver and keeps its session and
//! transport ids; every request then opens a fresh `CastDevice` connection,
//! as the connection type borrows from its host string and cannot be kept
//! alongside the session state. A watcher thread polls the media status and
//! turns changes into [`RemoteMediaListener`] notifications.

use std::collections::HashMap;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use rust_cast::CastDevice;
use rust_cast::channels::media::{
    IdleReason as CastIdleReason, Image, Media, Metadata, MusicTrackMediaMetadata,
    PlayerState, ResumeState, Status, StreamType as CastStreamType,
};
use rust_cast::channels::receiver::CastDeviceApp;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::CastConfig;
use crate::errors::CastPlaybackError;
use crate::remote::{
    CastImage, CastMediaMetadata, IdleReason, ListenerId, METADATA_TYPE_MUSIC_TRACK,
    RemoteMediaClient, RemoteMediaInfo, RemoteMediaListener, RemotePlayerState, StreamType,
};

/// Default Chromecast port.
pub const DEFAULT_CHROMECAST_PORT: u16 = 8009;

/// Ensures the Rustls CryptoProvider is initialized exactly once.
fn ensure_crypto_provider_initialized() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = rustls::crypto::CryptoProvider::install_default(
            rustls::crypto::aws_lc_rs::default_provider(),
        );
    });
}

/// What the watcher remembers of the last media status.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct StatusSnapshot {
    pub player_state: RemotePlayerState,
    pub idle_reason: IdleReason,
    pub content_id: Option<String>,
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self {
            player_state: RemotePlayerState::Idle,
            idle_reason: IdleReason::None,
            content_id: None,
        }
    }
}

/// Returns `(status_changed, metadata_changed)` between two snapshots.
pub(crate) fn diff_snapshots(prev: &StatusSnapshot, next: &StatusSnapshot) -> (bool, bool) {
    let status_changed =
        prev.player_state != next.player_state || prev.idle_reason != next.idle_reason;
    let metadata_changed = prev.content_id != next.content_id;
    (status_changed, metadata_changed)
}

#[derive(Debug, Default)]
struct CastSessionState {
    /// The receiver session ID obtained when launching an app.
    receiver_session_id: Option<String>,
    /// The transport ID of the launched app.
    transport_id: Option<String>,
    /// The media session ID obtained when loading media.
    media_session_id: Option<i32>,
    last_status: StatusSnapshot,
    /// rust_cast load messages carry no customData: keep ours for the loaded
    /// content id only.
    custom_data: HashMap<String, Value>,
}

impl CastSessionState {
    fn clear(&mut self) {
        *self = CastSessionState::default();
    }

    fn remember_custom_data(&mut self, content_id: &str, custom_data: &Value) {
        self.custom_data.clear();
        self.custom_data
            .insert(content_id.to_string(), custom_data.clone());
    }
}

struct ClientInner {
    host: String,
    port: u16,
    verify_host: bool,
    connect_timeout: Duration,
    state: Mutex<CastSessionState>,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn RemoteMediaListener>)>>,
    next_listener_id: AtomicU64,
}

struct WatcherHandle {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

pub struct RustCastClient {
    inner: Arc<ClientInner>,
    watch_interval: Duration,
    watcher: Mutex<Option<WatcherHandle>>,
}

impl RustCastClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let config = CastConfig::default();
        Self::build(host.into(), port, &config)
    }

    pub fn from_config(config: &CastConfig) -> Result<Self, CastPlaybackError> {
        let host = config
            .receiver
            .host
            .clone()
            .ok_or_else(|| CastPlaybackError::Config("receiver.host is not set".to_string()))?;
        Ok(Self::build(host, config.receiver.port, config))
    }

    fn build(host: String, port: u16, config: &CastConfig) -> Self {
        debug!(host = %host, port, "Creating RustCastClient");
        Self {
            inner: Arc::new(ClientInner {
                host,
                port,
                verify_host: config.receiver.verify_host,
                connect_timeout: config.connect_timeout(),
                state: Mutex::new(CastSessionState::default()),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(1),
            }),
            watch_interval: config.watch_interval(),
            watcher: Mutex::new(None),
        }
    }

    /// Launches the Default Media Receiver and starts watching its status.
    pub fn connect(&self) -> Result<(), CastPlaybackError> {
        if self.inner.session_ids().is_some() {
            return Ok(());
        }

        self.inner.probe()?;
        let device = self
            .inner
            .open()
            .map_err(|_| CastPlaybackError::NoConnection)?;

        device
            .connection
            .connect("receiver-0".to_string())
            .map_err(|e| CastPlaybackError::cast(&format!("Failed to connect channel: {e}")))?;

        let app = device
            .receiver
            .launch_app(&CastDeviceApp::DefaultMediaReceiver)
            .map_err(|e| CastPlaybackError::cast(&format!("Failed to launch app: {e}")))?;

        info!(
            host = %self.inner.host,
            session_id = %app.session_id,
            transport_id = %app.transport_id,
            "Launched Default Media Receiver"
        );

        {
            let mut state = self.inner.lock_state();
            state.receiver_session_id = Some(app.session_id.clone());
            state.transport_id = Some(app.transport_id.clone());
        }

        self.start_watcher();
        Ok(())
    }

    /// Stops the watcher, then the receiver app. Session state is cleared
    /// even if the receiver cannot be reached.
    pub fn disconnect(&self) {
        self.stop_watcher();

        let session_id = self.inner.lock_state().receiver_session_id.clone();
        if let Some(session_id) = session_id {
            match self.inner.open() {
                Ok(device) => {
                    if let Err(e) = device.receiver.stop_app(session_id) {
                        warn!(error = %e, "Failed to stop receiver app");
                    }
                }
                Err(e) => warn!(error = %e, "Receiver unreachable while disconnecting"),
            }
        }

        self.inner.lock_state().clear();
        info!(host = %self.inner.host, "Disconnected from receiver");
    }

    fn start_watcher(&self) {
        let mut watcher = self.watcher.lock().expect("Watcher mutex poisoned");
        if watcher.is_some() {
            return;
        }

        let (stop, stop_rx) = bounded::<()>(1);
        let inner = Arc::clone(&self.inner);
        let interval = self.watch_interval;

        let thread = thread::spawn(move || {
            debug!(interval_ms = interval.as_millis() as u64, "Cast status watcher started");
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => inner.poll_once(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("Cast status watcher stopped");
        });

        *watcher = Some(WatcherHandle { stop, thread });
    }

    fn stop_watcher(&self) {
        let handle = self.watcher.lock().expect("Watcher mutex poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.stop.send(());
            if handle.thread.join().is_err() {
                warn!("Cast status watcher panicked");
            }
        }
    }
}

impl Drop for RustCastClient {
    fn drop(&mut self) {
        self.stop_watcher();
    }
}

impl ClientInner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, CastSessionState> {
        self.state.lock().expect("Session state mutex poisoned")
    }

    /// `(receiver session id, transport id)` when connected.
    fn session_ids(&self) -> Option<(String, String)> {
        let state = self.lock_state();
        match (&state.receiver_session_id, &state.transport_id) {
            (Some(session), Some(transport)) => Some((session.clone(), transport.clone())),
            _ => None,
        }
    }

    /// Fails fast when nothing listens on the receiver port.
    fn probe(&self) -> Result<(), CastPlaybackError> {
        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|_| CastPlaybackError::NoConnection)?;
        for addr in addrs {
            if TcpStream::connect_timeout(&addr, self.connect_timeout).is_ok() {
                return Ok(());
            }
        }
        Err(CastPlaybackError::NoConnection)
    }

    fn open(&self) -> Result<CastDevice<'static>, CastPlaybackError> {
        ensure_crypto_provider_initialized();

        let device = if self.verify_host {
            CastDevice::connect(self.host.clone(), self.port)
        } else {
            CastDevice::connect_without_host_verification(self.host.clone(), self.port)
        };
        device.map_err(|e| {
            CastPlaybackError::transient(&format!("Failed to connect to Chromecast: {e}"))
        })
    }

    /// Opens a connection attached to the app transport.
    fn open_session(&self) -> Result<(CastDevice<'static>, String, String), CastPlaybackError> {
        let (session_id, transport_id) =
            self.session_ids().ok_or(CastPlaybackError::NoConnection)?;
        let device = self.open()?;
        device
            .connection
            .connect(transport_id.clone())
            .map_err(|e| {
                CastPlaybackError::transient(&format!("Failed to connect to app transport: {e}"))
            })?;
        Ok((device, session_id, transport_id))
    }

    fn media_session_id(&self) -> Result<i32, CastPlaybackError> {
        self.lock_state()
            .media_session_id
            .ok_or_else(|| CastPlaybackError::cast("No media session ID available"))
    }

    fn media_status(&self) -> Result<Status, CastPlaybackError> {
        let (device, _, transport_id) = self.open_session()?;
        let media_session_id = self.lock_state().media_session_id;
        device
            .media
            .get_status(transport_id, media_session_id)
            .map_err(|e| CastPlaybackError::transient(&format!("Failed to get media status: {e}")))
    }

    fn poll_once(&self) {
        let status = match self.media_status() {
            Ok(status) => status,
            Err(e) if e.is_connectivity() => {
                debug!(error = %e, "Receiver unreachable, skipping status poll");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Cast status poll failed");
                return;
            }
        };

        let next = snapshot_from_status(&status);
        let (status_changed, metadata_changed) = {
            let mut state = self.lock_state();
            if let Some(entry) = status.entries.first() {
                state.media_session_id = Some(entry.media_session_id);
            }
            let diff = diff_snapshots(&state.last_status, &next);
            state.last_status = next;
            diff
        };

        if !status_changed && !metadata_changed {
            return;
        }

        let listeners: Vec<_> = self
            .listeners
            .lock()
            .expect("Listener mutex poisoned")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            if metadata_changed {
                listener.on_remote_metadata_updated();
            }
            if status_changed {
                listener.on_remote_status_updated();
            }
        }
    }
}

impl RemoteMediaClient for RustCastClient {
    fn is_connected(&self) -> bool {
        self.inner.session_ids().is_some()
    }

    fn load(
        &self,
        info: &RemoteMediaInfo,
        autoplay: bool,
        position_ms: i64,
        custom_data: &Value,
    ) -> Result<(), CastPlaybackError> {
        let (device, session_id, transport_id) = self.inner.open_session()?;
        let media = to_rust_cast_media(info);

        let status = device
            .media
            .load(transport_id.clone(), session_id, &media)
            .map_err(|e| CastPlaybackError::transient(&format!("Failed to load media: {e}")))?;

        let media_session_id = {
            let mut state = self.inner.lock_state();
            state.remember_custom_data(&info.content_id, custom_data);
            if let Some(entry) = status.entries.first() {
                state.media_session_id = Some(entry.media_session_id);
            }
            state.media_session_id
        };
        debug!(content_id = %info.content_id, media_session_id = ?media_session_id, "Media loaded");

        let Some(media_session_id) = media_session_id else {
            return Err(CastPlaybackError::cast("Receiver returned no media session"));
        };

        if position_ms > 0 {
            let resume_state = if autoplay {
                ResumeState::PlaybackStart
            } else {
                ResumeState::PlaybackPause
            };
            device
                .media
                .seek(
                    transport_id,
                    media_session_id,
                    Some(position_ms as f32 / 1000.0),
                    Some(resume_state),
                )
                .map_err(|e| CastPlaybackError::transient(&format!("Failed to seek: {e}")))?;
        } else if !autoplay {
            device
                .media
                .pause(transport_id, media_session_id)
                .map_err(|e| CastPlaybackError::transient(&format!("Failed to pause: {e}")))?;
        }
        Ok(())
    }

    fn pause(&self) -> Result<(), CastPlaybackError> {
        let (device, _, transport_id) = self.inner.open_session()?;
        let media_session_id = self.inner.media_session_id()?;
        device
            .media
            .pause(transport_id, media_session_id)
            .map_err(|e| CastPlaybackError::transient(&format!("Failed to pause: {e}")))?;
        Ok(())
    }

    fn seek(&self, position_ms: i64) -> Result<(), CastPlaybackError> {
        let (device, _, transport_id) = self.inner.open_session()?;
        let media_session_id = self.inner.media_session_id()?;
        device
            .media
            .seek(
                transport_id,
                media_session_id,
                Some(position_ms as f32 / 1000.0),
                None,
            )
            .map_err(|e| CastPlaybackError::transient(&format!("Failed to seek: {e}")))?;
        Ok(())
    }

    fn current_media_position(&self) -> Result<i64, CastPlaybackError> {
        let status = self.inner.media_status()?;
        Ok(status
            .entries
            .first()
            .and_then(|entry| entry.current_time)
            .map(|secs| (secs as f64 * 1000.0).round() as i64)
            .unwrap_or(0))
    }

    fn playback_status(&self) -> RemotePlayerState {
        self.inner.lock_state().last_status.player_state
    }

    fn idle_reason(&self) -> IdleReason {
        self.inner.lock_state().last_status.idle_reason
    }

    fn is_remote_media_loaded(&self) -> Result<bool, CastPlaybackError> {
        let status = self.inner.media_status()?;
        Ok(status
            .entries
            .first()
            .map(|entry| entry.media.is_some() || !matches!(entry.player_state, PlayerState::Idle))
            .unwrap_or(false))
    }

    fn is_remote_media_playing(&self) -> Result<bool, CastPlaybackError> {
        let status = self.inner.media_status()?;
        Ok(status
            .entries
            .first()
            .map(|entry| {
                matches!(entry.player_state, PlayerState::Playing | PlayerState::Buffering)
            })
            .unwrap_or(false))
    }

    fn remote_media_information(&self) -> Result<Option<RemoteMediaInfo>, CastPlaybackError> {
        let status = self.inner.media_status()?;
        let Some(media) = status.entries.first().and_then(|entry| entry.media.as_ref()) else {
            return Ok(None);
        };
        let custom_data = self.inner.lock_state().custom_data.get(&media.content_id).cloned();
        Ok(Some(from_rust_cast_media(media, custom_data)))
    }

    fn add_listener(&self, listener: Arc<dyn RemoteMediaListener>) -> ListenerId {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .expect("Listener mutex poisoned")
            .push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.inner
            .listeners
            .lock()
            .expect("Listener mutex poisoned")
            .retain(|(listener_id, _)| *listener_id != id);
    }
}

fn snapshot_from_status(status: &Status) -> StatusSnapshot {
    let Some(entry) = status.entries.first() else {
        return StatusSnapshot::default();
    };

    let player_state = match entry.player_state {
        PlayerState::Idle => RemotePlayerState::Idle,
        PlayerState::Buffering => RemotePlayerState::Buffering,
        PlayerState::Playing => RemotePlayerState::Playing,
        PlayerState::Paused => RemotePlayerState::Paused,
    };
    let idle_reason = match entry.idle_reason {
        Some(CastIdleReason::Finished) => IdleReason::Finished,
        Some(CastIdleReason::Cancelled) => IdleReason::Cancelled,
        Some(CastIdleReason::Interrupted) => IdleReason::Interrupted,
        Some(CastIdleReason::Error) => IdleReason::Error,
        None => IdleReason::None,
    };

    StatusSnapshot {
        player_state,
        idle_reason,
        content_id: entry.media.as_ref().map(|m| m.content_id.clone()),
    }
}

pub(crate) fn to_rust_cast_media(info: &RemoteMediaInfo) -> Media {
    let metadata = info.metadata.as_ref().map(|m| {
        // Pas de champ subtitle côté rust_cast : l'artiste en tient lieu
        Metadata::MusicTrack(MusicTrackMediaMetadata {
            title: Some(m.title.clone()),
            artist: Some(m.subtitle.clone()),
            album_artist: m.album_artist.clone(),
            album_name: m.album_name.clone(),
            track_number: m.track_number,
            images: m
                .images
                .iter()
                .map(|image| Image {
                    url: image.url.clone(),
                    dimensions: None,
                })
                .collect(),
            ..Default::default()
        })
    });

    Media {
        content_id: info.content_id.clone(),
        content_type: info.content_type.clone(),
        stream_type: match info.stream_type {
            StreamType::None => CastStreamType::None,
            StreamType::Buffered => CastStreamType::Buffered,
            StreamType::Live => CastStreamType::Live,
        },
        metadata,
        duration: info.duration.map(|secs| secs as f32),
    }
}

pub(crate) fn from_rust_cast_media(media: &Media, custom_data: Option<Value>) -> RemoteMediaInfo {
    let metadata = match &media.metadata {
        Some(Metadata::MusicTrack(m)) => Some(CastMediaMetadata {
            metadata_type: METADATA_TYPE_MUSIC_TRACK,
            title: m.title.clone().unwrap_or_default(),
            subtitle: m.artist.clone().unwrap_or_default(),
            album_artist: m.album_artist.clone(),
            album_name: m.album_name.clone(),
            track_number: m.track_number,
            images: m
                .images
                .iter()
                .map(|image| CastImage {
                    url: image.url.clone(),
                })
                .collect(),
        }),
        _ => None,
    };

    RemoteMediaInfo {
        content_id: media.content_id.clone(),
        content_type: media.content_type.clone(),
        stream_type: match media.stream_type {
            CastStreamType::None => StreamType::None,
            CastStreamType::Buffered => StreamType::Buffered,
            CastStreamType::Live => StreamType::Live,
        },
        duration: media.duration.map(f64::from),
        metadata,
        custom_data,
    }
}
