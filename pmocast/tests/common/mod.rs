#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use pmocast::{
    CastPlayback, CastPlaybackError, IdleReason, InMemoryCatalog, ListenerId, PlaybackEvent,
    PlaybackEventBus, RemoteMediaClient, RemoteMediaInfo, RemoteMediaListener, RemotePlayerState,
    TrackMetadata,
};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Failure {
    Transient,
    NoConnection,
}

impl Failure {
    fn to_error(self) -> CastPlaybackError {
        match self {
            Failure::Transient => CastPlaybackError::transient("socket closed"),
            Failure::NoConnection => CastPlaybackError::NoConnection,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LoadCall {
    pub info: RemoteMediaInfo,
    pub autoplay: bool,
    pub position_ms: i64,
    pub custom_data: Value,
}

#[derive(Debug)]
pub struct FakeState {
    pub connected: bool,
    pub media_loaded: bool,
    pub playing: bool,
    pub position_ms: i64,
    pub status: RemotePlayerState,
    pub idle_reason: IdleReason,
    pub remote_info: Option<RemoteMediaInfo>,
    pub failure: Option<Failure>,
    pub loads: Vec<LoadCall>,
    pub pauses: usize,
    pub seeks: Vec<i64>,
    pub position_queries: usize,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            connected: true,
            media_loaded: false,
            playing: false,
            position_ms: 0,
            status: RemotePlayerState::Idle,
            idle_reason: IdleReason::None,
            remote_info: None,
            failure: None,
            loads: Vec::new(),
            pauses: 0,
            seeks: Vec::new(),
            position_queries: 0,
        }
    }
}

/// In-memory receiver: records every call and lets tests push notifications.
#[derive(Default)]
pub struct FakeRemoteClient {
    pub state: Mutex<FakeState>,
    listeners: Mutex<Vec<(ListenerId, Arc<dyn RemoteMediaListener>)>>,
    next_id: Mutex<u64>,
}

impl FakeRemoteClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    fn listeners(&self) -> Vec<Arc<dyn RemoteMediaListener>> {
        self.listeners
            .lock()
            .unwrap()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect()
    }

    pub fn emit_status(&self, status: RemotePlayerState, idle_reason: IdleReason) {
        self.with(|s| {
            s.status = status;
            s.idle_reason = idle_reason;
        });
        for listener in self.listeners() {
            listener.on_remote_status_updated();
        }
    }

    pub fn emit_metadata(&self) {
        for listener in self.listeners() {
            listener.on_remote_metadata_updated();
        }
    }

    fn check(&self) -> Result<(), CastPlaybackError> {
        match self.with(|s| s.failure) {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

impl RemoteMediaClient for FakeRemoteClient {
    fn is_connected(&self) -> bool {
        self.with(|s| s.connected)
    }

    fn load(
        &self,
        info: &RemoteMediaInfo,
        autoplay: bool,
        position_ms: i64,
        custom_data: &Value,
    ) -> Result<(), CastPlaybackError> {
        self.check()?;
        self.with(|s| {
            s.loads.push(LoadCall {
                info: info.clone(),
                autoplay,
                position_ms,
                custom_data: custom_data.clone(),
            });
            let mut echoed = info.clone();
            echoed.custom_data = Some(custom_data.clone());
            s.remote_info = Some(echoed);
            s.media_loaded = true;
            s.playing = autoplay;
            s.position_ms = position_ms;
        });
        Ok(())
    }

    fn pause(&self) -> Result<(), CastPlaybackError> {
        self.check()?;
        self.with(|s| {
            s.pauses += 1;
            s.playing = false;
        });
        Ok(())
    }

    fn seek(&self, position_ms: i64) -> Result<(), CastPlaybackError> {
        self.check()?;
        self.with(|s| {
            s.seeks.push(position_ms);
            s.position_ms = position_ms;
        });
        Ok(())
    }

    fn current_media_position(&self) -> Result<i64, CastPlaybackError> {
        self.with(|s| s.position_queries += 1);
        self.check()?;
        Ok(self.with(|s| s.position_ms))
    }

    fn playback_status(&self) -> RemotePlayerState {
        self.with(|s| s.status)
    }

    fn idle_reason(&self) -> IdleReason {
        self.with(|s| s.idle_reason)
    }

    fn is_remote_media_loaded(&self) -> Result<bool, CastPlaybackError> {
        self.check()?;
        Ok(self.with(|s| s.media_loaded))
    }

    fn is_remote_media_playing(&self) -> Result<bool, CastPlaybackError> {
        self.check()?;
        Ok(self.with(|s| s.playing))
    }

    fn remote_media_information(&self) -> Result<Option<RemoteMediaInfo>, CastPlaybackError> {
        self.check()?;
        Ok(self.with(|s| s.remote_info.clone()))
    }

    fn add_listener(&self, listener: Arc<dyn RemoteMediaListener>) -> ListenerId {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let id = ListenerId(*next);
        self.listeners.lock().unwrap().push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().unwrap().retain(|(l, _)| *l != id);
    }
}

pub fn track(id: &str) -> TrackMetadata {
    TrackMetadata {
        id: id.to_string(),
        title: Some(format!("Title {id}")),
        artist: Some("Artist".to_string()),
        album: Some("Album".to_string()),
        source: format!("http://music.local/{id}.mp3"),
        ..Default::default()
    }
}

pub fn catalog() -> Arc<InMemoryCatalog> {
    Arc::new(InMemoryCatalog::from_tracks(
        ["track-42", "track-7", "track-8"].into_iter().map(track),
    ))
}

pub struct Harness {
    pub client: Arc<FakeRemoteClient>,
    pub playback: Arc<CastPlayback>,
    pub events: crossbeam_channel::Receiver<PlaybackEvent>,
}

impl Harness {
    pub fn new() -> Self {
        let client = FakeRemoteClient::new();
        let playback = CastPlayback::new(client.clone(), catalog());
        let bus = PlaybackEventBus::new();
        let events = bus.subscribe();
        pmocast::Playback::set_callback(playback.as_ref(), Arc::new(bus));
        Self {
            client,
            playback,
            events,
        }
    }

    pub fn drain(&self) -> Vec<PlaybackEvent> {
        self.events.try_iter().collect()
    }
}
