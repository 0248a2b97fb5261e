//! Hierarchical media identifiers.
//!
//! A browsable media id has the form `category/value|musicId`, e.g.
//! `__BY_GENRE__/Jazz|track-42`. The part after the leaf separator is the
//! catalog key of the track; the part before it records where in the
//! browse tree the track was picked from.

pub const CATEGORY_SEPARATOR: char = '/';
pub const LEAF_SEPARATOR: char = '|';

/// Returns the catalog key embedded in a media id.
///
/// An id without a leaf separator is already a plain catalog key.
pub fn extract_music_id(media_id: &str) -> &str {
    match media_id.find(LEAF_SEPARATOR) {
        Some(pos) => &media_id[pos + LEAF_SEPARATOR.len_utf8()..],
        None => media_id,
    }
}

/// Returns the browse path of a media id, without the music id.
pub fn extract_browse_categories(media_id: &str) -> Vec<&str> {
    let hierarchy = match media_id.find(LEAF_SEPARATOR) {
        Some(pos) => &media_id[..pos],
        None => media_id,
    };
    hierarchy
        .split(CATEGORY_SEPARATOR)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Builds a media id from an optional music id and a browse path.
pub fn create_media_id(music_id: Option<&str>, categories: &[&str]) -> String {
    let separator = CATEGORY_SEPARATOR.to_string();
    let mut id = categories.join(separator.as_str());
    if let Some(music_id) = music_id {
        id.push(LEAF_SEPARATOR);
        id.push_str(music_id);
    }
    id
}
