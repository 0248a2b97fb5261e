//! Track lookup used to resolve a music id into something the receiver can play.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::model::TrackMetadata;

/// Resolves a music id into its metadata. `None` means the id is unknown.
pub trait MusicCatalog: Send + Sync {
    fn music(&self, music_id: &str) -> Option<TrackMetadata>;
}

#[derive(Deserialize)]
struct CatalogFile {
    tracks: Vec<TrackMetadata>,
}

/// Thread-safe catalog kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    tracks: RwLock<HashMap<String, TrackMetadata>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tracks(tracks: impl IntoIterator<Item = TrackMetadata>) -> Self {
        let catalog = Self::new();
        for track in tracks {
            catalog.insert(track);
        }
        catalog
    }

    /// Parses a YAML document with a top-level `tracks` list.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: CatalogFile = serde_yaml::from_str(yaml).context("Invalid catalog YAML")?;
        debug!(tracks = file.tracks.len(), "Catalog parsed");
        Ok(Self::from_tracks(file.tracks))
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read catalog {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Inserts or replaces a track, keyed by its id.
    pub fn insert(&self, track: TrackMetadata) {
        self.tracks
            .write()
            .expect("Catalog lock poisoned")
            .insert(track.id.clone(), track);
    }

    pub fn len(&self) -> usize {
        self.tracks.read().expect("Catalog lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MusicCatalog for InMemoryCatalog {
    fn music(&self, music_id: &str) -> Option<TrackMetadata> {
        self.tracks
            .read()
            .expect("Catalog lock poisoned")
            .get(music_id)
            .cloned()
    }
}
