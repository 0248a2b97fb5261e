use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::callback::PlaybackCallback;
use crate::model::PlaybackState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    StatusChanged(PlaybackState),
    Completed,
    Error(String),
    MediaIdChanged(String),
}

/// [`PlaybackCallback`] fanning events out to channel subscribers.
#[derive(Clone, Default)]
pub struct PlaybackEventBus {
    subscribers: Arc<Mutex<Vec<Sender<PlaybackEvent>>>>,
}

impl PlaybackEventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> Receiver<PlaybackEvent> {
        let (tx, rx) = unbounded::<PlaybackEvent>();
        {
            let mut subscribers = self.subscribers.lock().unwrap();
            subscribers.push(tx);
        }
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }

    pub fn broadcast(&self, event: PlaybackEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl PlaybackCallback for PlaybackEventBus {
    fn on_completion(&self) {
        self.broadcast(PlaybackEvent::Completed);
    }

    fn on_playback_status_changed(&self, state: PlaybackState) {
        self.broadcast(PlaybackEvent::StatusChanged(state));
    }

    fn on_error(&self, message: &str) {
        self.broadcast(PlaybackEvent::Error(message.to_string()));
    }

    fn set_current_media_id(&self, media_id: &str) {
        self.broadcast(PlaybackEvent::MediaIdChanged(media_id.to_string()));
    }
}
