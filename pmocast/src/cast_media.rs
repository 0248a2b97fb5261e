//! Conversion of catalog tracks into cast media descriptors.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CastPlaybackError;
use crate::model::TrackMetadata;
use crate::remote::{
    CastImage, CastMediaMetadata, METADATA_TYPE_MUSIC_TRACK, RemoteMediaInfo, StreamType,
};

/// Key of the local media id inside the custom data echoed by the receiver.
pub const ITEM_ID: &str = "itemId";

pub const MIME_TYPE_AUDIO_MPEG: &str = "audio/mpeg";

#[derive(Serialize, Deserialize)]
struct CustomData<'a> {
    #[serde(rename = "itemId")]
    item_id: &'a str,
}

/// Custom data attached to a load so the receiver status can be traced back
/// to `media_id`.
pub fn custom_data_for(media_id: &str) -> Result<Value, CastPlaybackError> {
    Ok(serde_json::to_value(CustomData { item_id: media_id })?)
}

/// Reads the local media id back from receiver custom data.
///
/// `Ok(None)` when the key is absent. Numbers and booleans are read as their
/// textual form; null, arrays and objects are an error.
pub fn item_id_from(custom_data: &Value) -> Result<Option<String>, CastPlaybackError> {
    match custom_data.get(ITEM_ID) {
        None => Ok(None),
        Some(Value::String(id)) => Ok(Some(id.clone())),
        Some(scalar @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(scalar.to_string())),
        Some(other) => Err(CastPlaybackError::Encoding(serde::de::Error::custom(
            format!("{ITEM_ID} is not a string: {other}"),
        ))),
    }
}

/// Guesses the MIME type of a stream from its URI.
pub fn detect_content_type(uri: &str) -> &'static str {
    let path = uri.split(['?', '#']).next().unwrap_or(uri).to_ascii_lowercase();
    if path.ends_with(".flac") {
        "audio/flac"
    } else if path.ends_with(".mp3") {
        MIME_TYPE_AUDIO_MPEG
    } else if path.ends_with(".ogg") || path.ends_with(".oga") {
        "audio/ogg"
    } else if path.ends_with(".opus") {
        "audio/opus"
    } else if path.ends_with(".m4a") || path.ends_with(".aac") || path.ends_with(".mp4") {
        "audio/mp4"
    } else if path.ends_with(".wav") {
        "audio/wav"
    } else {
        MIME_TYPE_AUDIO_MPEG
    }
}

/// Builds the descriptor sent to the receiver for `track`.
///
/// Title and subtitle are always present (empty when unknown); the receiver
/// renders its now-playing screen from them.
pub fn to_cast_media_info(
    track: &TrackMetadata,
    custom_data: &Value,
    content_type: Option<&str>,
) -> RemoteMediaInfo {
    let images = track
        .album_art_uri
        .iter()
        .map(|url| CastImage { url: url.clone() })
        .collect();

    let metadata = CastMediaMetadata {
        metadata_type: METADATA_TYPE_MUSIC_TRACK,
        title: track.title.clone().unwrap_or_default(),
        subtitle: track.display_subtitle().unwrap_or_default().to_string(),
        album_artist: track.album_artist.clone(),
        album_name: track.album.clone(),
        track_number: track.track_number,
        images,
    };

    RemoteMediaInfo {
        content_id: track.source.clone(),
        content_type: content_type
            .map(str::to_string)
            .unwrap_or_else(|| detect_content_type(&track.source).to_string()),
        stream_type: StreamType::Buffered,
        duration: track.duration_ms.map(|ms| ms as f64 / 1000.0),
        metadata: Some(metadata),
        custom_data: Some(custom_data.clone()),
    }
}
