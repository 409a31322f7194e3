//! Pure text extractors for song-detail pages.

use regex::Regex;
use std::sync::OnceLock;

use chordscrape_core::model::SongRecord;

use crate::validate::{check_chord_set, Rejection};

/// Suffix the site appends to artist names in the breadcrumb.
pub const ARTIST_SUFFIX: &str = " tabs";

/// Suffix the site appends to song titles in the breadcrumb.
pub const TITLE_SUFFIX: &str = " Chords";

#[allow(clippy::expect_used)]
fn tuning_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)Tuning:[ \t]*(?P<tuning>[^\r\n]*)").expect("tuning pattern compiles")
    })
}

/// Remove `suffix` from `raw` if present, trimming surrounding whitespace.
pub fn strip_suffix(raw: &str, suffix: &str) -> String {
    let raw = raw.trim_end();
    raw.strip_suffix(suffix).unwrap_or(raw).trim().to_string()
}

pub fn artist_name(raw: &str) -> String {
    strip_suffix(raw, ARTIST_SUFFIX)
}

pub fn song_title(raw: &str) -> String {
    strip_suffix(raw, TITLE_SUFFIX)
}

/// The rest of the first `Tuning:` line, or an empty string when the text
/// has none.
pub fn tuning(text: &str) -> String {
    tuning_pattern()
        .captures(text)
        .and_then(|caps| caps.name("tuning"))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Chord tokens exactly as rendered, one per fragment.
pub fn chord_tokens<'a>(fragments: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    fragments.into_iter().map(str::to_string).collect()
}

/// Raw text captured from one song page. Missing elements are `None`.
#[derive(Debug, Clone, Default)]
pub struct SongPage {
    pub artist: Option<String>,
    pub title: Option<String>,
    pub tuning_block: Option<String>,
    pub chords: Vec<String>,
}

/// Turn a captured page into a record, or say why it cannot be trusted.
pub fn song_record(page: &SongPage) -> Result<SongRecord, Rejection> {
    let artist = page
        .artist
        .as_deref()
        .map(artist_name)
        .filter(|name| !name.is_empty())
        .ok_or(Rejection::MissingArtist)?;
    let title = page
        .title
        .as_deref()
        .map(song_title)
        .filter(|title| !title.is_empty())
        .ok_or(Rejection::MissingTitle)?;

    check_chord_set(page.chords.as_slice())?;

    let tuning = page.tuning_block.as_deref().map(tuning).unwrap_or_default();
    Ok(SongRecord::new(artist, title, tuning, page.chords.clone()))
}
