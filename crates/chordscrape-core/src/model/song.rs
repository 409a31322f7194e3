use serde::{Deserialize, Serialize};

use crate::model::ids::{ArtistId, SongId};

/// A stored song. Songs are not deduplicated by title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub artist_id: ArtistId,
    pub title: String,

    /// Empty when the page had no tuning line.
    pub tuning: String,
}

/// Everything extracted from one song-detail page, ready for ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    pub artist: String,
    pub title: String,
    pub tuning: String,

    /// Chord tokens in page order. Repeats are kept.
    pub chords: Vec<String>,
}

impl SongRecord {
    #[must_use]
    pub fn new(
        artist: impl Into<String>,
        title: impl Into<String>,
        tuning: impl Into<String>,
        chords: Vec<String>,
    ) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            tuning: tuning.into(),
            chords,
        }
    }
}
