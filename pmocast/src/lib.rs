//! Cast playback backend for PMOMusic.
//!
//! [`CastPlayback`] implements the host-facing [`Playback`] surface on top of
//! a [`RemoteMediaClient`]. Tracks are resolved through a [`MusicCatalog`] and
//! loaded on the receiver with their local media id embedded in the custom
//! data, so that receiver status can be traced back to the host's queue.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pmocast::{CastConfig, CastPlayback, InMemoryCatalog, Playback, QueueItem, RustCastClient};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = CastConfig::load("")?;
//! let client = Arc::new(RustCastClient::from_config(&config)?);
//! client.connect()?;
//!
//! let catalog = Arc::new(InMemoryCatalog::from_yaml_file("catalog.yaml")?);
//! let playback = CastPlayback::from_config(client, catalog, &config);
//! playback.start();
//! playback.play(&QueueItem::new("__BY_GENRE__/Jazz|track-42"));
//! # Ok(())
//! # }
//! ```

mod callback;
mod events;

pub mod cast_media;
pub mod cast_playback;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod media_id;
pub mod model;
pub mod playback;
pub mod remote;
pub mod rust_cast_client;

pub use callback::PlaybackCallback;
pub use cast_media::{ITEM_ID, to_cast_media_info};
pub use cast_playback::CastPlayback;
pub use catalog::{InMemoryCatalog, MusicCatalog};
pub use config::CastConfig;
pub use errors::CastPlaybackError;
pub use events::{PlaybackEvent, PlaybackEventBus};
pub use model::{PlaybackState, QueueItem, TrackMetadata, UNKNOWN_POSITION};
pub use playback::Playback;
pub use remote::{
    IdleReason, ListenerId, RemoteMediaClient, RemoteMediaInfo, RemoteMediaListener,
    RemotePlayerState,
};
pub use rust_cast_client::RustCastClient;
