/// A table the crawler expects to find in its database.
#[derive(Debug)]
pub struct TableDef {
    pub name: &'static str,
    pub sql: &'static str,
}

const ARTISTS: &str = r#"
CREATE TABLE artists (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
"#;

const SONGS: &str = r#"
CREATE TABLE songs (
    id INTEGER PRIMARY KEY,
    artist_id INTEGER NOT NULL REFERENCES artists(id),
    title TEXT NOT NULL,
    tuning TEXT NOT NULL DEFAULT ''
);

CREATE INDEX idx_songs_artist_id ON songs(artist_id);
"#;

const CHORDS: &str = r#"
CREATE TABLE chords (
    id INTEGER PRIMARY KEY,
    symbol TEXT NOT NULL UNIQUE
);
"#;

// No uniqueness on the join: a chord repeated within a song yields two rows.
const SONG_CHORDS: &str = r#"
CREATE TABLE song_chords (
    chord_id INTEGER NOT NULL REFERENCES chords(id),
    song_id INTEGER NOT NULL REFERENCES songs(id)
);

CREATE INDEX idx_song_chords_song_id ON song_chords(song_id);
CREATE INDEX idx_song_chords_chord_id ON song_chords(chord_id);
"#;

const VISITED_PAGES: &str = r#"
CREATE TABLE visited_pages (
    href TEXT NOT NULL UNIQUE,
    visited_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const NAVIGATION_FAILURES: &str = r#"
CREATE TABLE navigation_failures (
    href TEXT NOT NULL UNIQUE,
    attempts INTEGER NOT NULL DEFAULT 0
);
"#;

/// All tables in creation order. Parents precede the tables that reference
/// them, so dropping walks this list in reverse.
pub const TABLES: &[TableDef] = &[
    TableDef {
        name: "artists",
        sql: ARTISTS,
    },
    TableDef {
        name: "songs",
        sql: SONGS,
    },
    TableDef {
        name: "chords",
        sql: CHORDS,
    },
    TableDef {
        name: "song_chords",
        sql: SONG_CHORDS,
    },
    TableDef {
        name: "visited_pages",
        sql: VISITED_PAGES,
    },
    TableDef {
        name: "navigation_failures",
        sql: NAVIGATION_FAILURES,
    },
];
