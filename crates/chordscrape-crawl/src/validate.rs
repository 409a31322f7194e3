//! Chord-set validation.
//!
//! Extraction from chord panels is noisy: stray labels and tablature
//! fragments sometimes land in the chord list. A page is only trusted when
//! every token looks like a chord.

use thiserror::Error;

/// Note letters a chord symbol may start with.
const NOTE_LETTERS: &[char] = &['a', 'b', 'c', 'd', 'e', 'f', 'g'];

/// Why a song page's extraction was discarded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("artist name not found")]
    MissingArtist,

    #[error("song title not found")]
    MissingTitle,

    #[error("no chords found")]
    NoChords,

    #[error("invalid chord token {0:?}")]
    InvalidChord(String),
}

/// Returns `true` when `token` starts with a note letter, ignoring case.
pub fn is_chord_token(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| NOTE_LETTERS.contains(&c.to_ascii_lowercase()))
}

/// Check a page's chord tokens, failing on the first bad one.
pub fn check_chord_set<S: AsRef<str>>(tokens: &[S]) -> Result<(), Rejection> {
    if tokens.is_empty() {
        return Err(Rejection::NoChords);
    }
    match tokens.iter().find(|t| !is_chord_token(t.as_ref())) {
        Some(bad) => Err(Rejection::InvalidChord(bad.as_ref().to_string())),
        None => Ok(()),
    }
}

/// `false` if `tokens` is empty or any token is not a chord.
pub fn is_valid_chord_set<S: AsRef<str>>(tokens: &[S]) -> bool {
    check_chord_set(tokens).is_ok()
}
