use rusqlite::{Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{is_unique_violation, Error, Result};
use crate::model::{Artist, ArtistId, Chord, ChordId, Song, SongId, SongRecord};

use super::tables::TABLES;

/// A database connection with insert-or-fetch methods for crawled entities.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and make sure the
    /// schema is complete.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self { conn };
        db.ensure_schema()?;
        Ok(db)
    }

    /// Names of the expected tables that currently exist.
    fn existing_tables(&self) -> Result<Vec<&'static str>> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
        let mut present = Vec::new();
        for table in TABLES {
            if stmt.exists([table.name])? {
                present.push(table.name);
            }
        }
        Ok(present)
    }

    /// Create the schema if absent. A partial schema is not repaired: every
    /// expected table is dropped and the whole set recreated.
    fn ensure_schema(&self) -> Result<()> {
        let present = self.existing_tables()?;
        if present.len() == TABLES.len() {
            return Ok(());
        }

        if present.is_empty() {
            log::info!("Creating database schema");
        } else {
            log::warn!(
                "Incomplete schema (found {:?}), dropping and recreating all tables",
                present
            );
        }

        let tx = self.conn.unchecked_transaction()?;
        for table in TABLES.iter().rev() {
            // Identifiers come from the fixed TABLES list only.
            tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", table.name))?;
        }
        for table in TABLES {
            tx.execute_batch(table.sql)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn upsert_artist_on(conn: &Connection, name: &str) -> Result<ArtistId> {
    let inserted: Option<ArtistId> = conn
        .query_row(
            "INSERT INTO artists (name) VALUES (?1)
             ON CONFLICT(name) DO NOTHING
             RETURNING id",
            [name],
            |row| row.get(0),
        )
        .optional()?;

    match inserted {
        Some(id) => Ok(id),
        None => Ok(conn.query_row(
            "SELECT id FROM artists WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?),
    }
}

fn insert_song_on(
    conn: &Connection,
    artist_id: ArtistId,
    title: &str,
    tuning: &str,
) -> Result<SongId> {
    Ok(conn.query_row(
        "INSERT INTO songs (artist_id, title, tuning) VALUES (?1, ?2, ?3) RETURNING id",
        rusqlite::params![artist_id, title, tuning],
        |row| row.get(0),
    )?)
}

fn upsert_chord_on(conn: &Connection, symbol: &str) -> Result<ChordId> {
    let inserted: Option<ChordId> = conn
        .query_row(
            "INSERT INTO chords (symbol) VALUES (?1)
             ON CONFLICT(symbol) DO NOTHING
             RETURNING id",
            [symbol],
            |row| row.get(0),
        )
        .optional()?;

    match inserted {
        Some(id) => Ok(id),
        None => Ok(conn.query_row(
            "SELECT id FROM chords WHERE symbol = ?1",
            [symbol],
            |row| row.get(0),
        )?),
    }
}

fn associate_on(conn: &Connection, song_id: SongId, chord_id: ChordId) -> Result<()> {
    conn.execute(
        "INSERT INTO song_chords (chord_id, song_id) VALUES (?1, ?2)",
        rusqlite::params![chord_id, song_id],
    )?;
    Ok(())
}

// Artist / song / chord writes
impl Database {
    /// Insert an artist, or fetch the id of the existing row with that name.
    pub fn upsert_artist(&self, name: &str) -> Result<ArtistId> {
        upsert_artist_on(&self.conn, name)
    }

    /// Insert a song unconditionally.
    pub fn insert_song(
        &self,
        artist_id: ArtistId,
        title: &str,
        tuning: &str,
    ) -> Result<SongId> {
        insert_song_on(&self.conn, artist_id, title, tuning)
    }

    /// Insert a chord, or fetch the id of the existing row with that symbol.
    pub fn upsert_chord(&self, symbol: &str) -> Result<ChordId> {
        upsert_chord_on(&self.conn, symbol)
    }

    /// Link a chord to a song. Repeated calls add repeated rows.
    pub fn associate(&self, song_id: SongId, chord_id: ChordId) -> Result<()> {
        associate_on(&self.conn, song_id, chord_id)
    }

    /// Store one extracted song page: artist, song, then every chord and its
    /// association, in page order.
    ///
    /// All writes share one transaction; on error nothing is kept. A record
    /// without an artist name or title is refused with
    /// [`Error::InvalidData`].
    pub fn ingest_song_record(&self, record: &SongRecord) -> Result<SongId> {
        if record.artist.trim().is_empty() {
            return Err(Error::InvalidData(format!(
                "song {:?} has no artist name",
                record.title
            )));
        }
        if record.title.trim().is_empty() {
            return Err(Error::InvalidData(format!(
                "song by {:?} has no title",
                record.artist
            )));
        }

        let tx = self.conn.unchecked_transaction()?;

        let artist_id = upsert_artist_on(&tx, &record.artist)?;
        let song_id = insert_song_on(&tx, artist_id, &record.title, &record.tuning)?;
        for symbol in &record.chords {
            let chord_id = upsert_chord_on(&tx, symbol)?;
            associate_on(&tx, song_id, chord_id)?;
        }

        tx.commit()?;
        log::debug!(
            "Ingested song {} ({} - {}, {} chords)",
            song_id,
            record.artist,
            record.title,
            record.chords.len()
        );
        Ok(song_id)
    }
}

// Artist / song / chord reads
impl Database {
    /// Look up an artist by exact name.
    pub fn find_artist(&self, name: &str) -> Result<Option<Artist>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM artists WHERE name = ?1",
                [name],
                |row| {
                    Ok(Artist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    /// All songs stored for an artist, oldest first.
    pub fn songs_by_artist(&self, artist_id: ArtistId) -> Result<Vec<Song>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, artist_id, title, tuning
             FROM songs
             WHERE artist_id = ?1
             ORDER BY id",
        )?;

        let songs = stmt
            .query_map([artist_id], |row| {
                Ok(Song {
                    id: row.get(0)?,
                    artist_id: row.get(1)?,
                    title: row.get(2)?,
                    tuning: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(songs)
    }

    /// Chords linked to a song, in the order they were associated.
    pub fn chords_for_song(&self, song_id: SongId) -> Result<Vec<Chord>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.symbol
             FROM song_chords sc
             JOIN chords c ON sc.chord_id = c.id
             WHERE sc.song_id = ?1
             ORDER BY sc.rowid",
        )?;

        let chords = stmt
            .query_map([song_id], |row| {
                Ok(Chord {
                    id: row.get(0)?,
                    symbol: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(chords)
    }
}

// Visited pages and navigation failures
impl Database {
    /// Every href recorded as visited.
    pub fn visited_hrefs(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT href FROM visited_pages")?;
        let hrefs = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<String>>>()?;
        Ok(hrefs)
    }

    /// Persist a visited href.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyRecorded`] when the href is already present.
    pub fn insert_visited(&self, href: &str) -> Result<()> {
        match self
            .conn
            .execute("INSERT INTO visited_pages (href) VALUES (?1)", [href])
        {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::AlreadyRecorded {
                href: href.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Count one more failed navigation to `href` and return the total so far.
    pub fn record_navigation_failure(&self, href: &str) -> Result<u32> {
        Ok(self.conn.query_row(
            "INSERT INTO navigation_failures (href, attempts) VALUES (?1, 1)
             ON CONFLICT(href) DO UPDATE SET attempts = attempts + 1
             RETURNING attempts",
            [href],
            |row| row.get(0),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(db: &Database, table: &str) -> i64 {
        db.conn()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    #[test]
    fn test_database_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let tables: i64 = db
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, TABLES.len() as i64);
    }

    #[test]
    fn test_upsert_artist_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let first = db.upsert_artist("Nick Drake").unwrap();
        let second = db.upsert_artist("Nick Drake").unwrap();
        assert_eq!(first, second);
        assert_eq!(count(&db, "artists"), 1);
    }

    #[test]
    fn test_upsert_chord_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let g = db.upsert_chord("G").unwrap();
        let d = db.upsert_chord("D").unwrap();
        assert_ne!(g, d);
        assert_eq!(db.upsert_chord("G").unwrap(), g);
        assert_eq!(count(&db, "chords"), 2);
    }

    #[test]
    fn test_chord_symbols_are_case_sensitive() {
        let db = Database::open_in_memory().unwrap();
        let upper = db.upsert_chord("Am").unwrap();
        let lower = db.upsert_chord("am").unwrap();
        assert_ne!(upper, lower);
    }

    #[test]
    fn test_insert_song_is_not_deduplicated() {
        let db = Database::open_in_memory().unwrap();
        let artist = db.upsert_artist("Artist").unwrap();
        let a = db.insert_song(artist, "Same Title", "").unwrap();
        let b = db.insert_song(artist, "Same Title", "").unwrap();
        assert_ne!(a, b);
        assert_eq!(db.songs_by_artist(artist).unwrap().len(), 2);
    }

    #[test]
    fn test_insert_song_requires_existing_artist() {
        let db = Database::open_in_memory().unwrap();
        let result = db.insert_song(ArtistId::from_raw(999), "Orphan", "");
        assert!(matches!(result, Err(Error::Database(_))));
    }

    #[test]
    fn test_ingest_song_record() {
        let db = Database::open_in_memory().unwrap();
        let record = SongRecord::new(
            "Test Artist",
            "Test Song",
            "Standard",
            vec!["Am".to_string(), "C".to_string(), "G".to_string()],
        );

        let song_id = db.ingest_song_record(&record).unwrap();

        let artist = db.find_artist("Test Artist").unwrap().unwrap();
        let songs = db.songs_by_artist(artist.id).unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, song_id);
        assert_eq!(songs[0].title, "Test Song");
        assert_eq!(songs[0].tuning, "Standard");

        let symbols: Vec<String> = db
            .chords_for_song(song_id)
            .unwrap()
            .into_iter()
            .map(|c| c.symbol)
            .collect();
        assert_eq!(symbols, vec!["Am", "C", "G"]);
        assert_eq!(count(&db, "artists"), 1);
        assert_eq!(count(&db, "chords"), 3);
        assert_eq!(count(&db, "song_chords"), 3);
    }

    #[test]
    fn test_ingest_refuses_blank_names() {
        let db = Database::open_in_memory().unwrap();
        let chords = vec!["G".to_string()];

        let err = db
            .ingest_song_record(&SongRecord::new("  ", "Title", "", chords.clone()))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));

        let err = db
            .ingest_song_record(&SongRecord::new("Artist", "", "", chords))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));

        assert_eq!(count(&db, "artists"), 0);
        assert_eq!(count(&db, "songs"), 0);
    }

    #[test]
    fn test_ingest_keeps_repeated_chords() {
        let db = Database::open_in_memory().unwrap();
        let record = SongRecord::new(
            "Artist",
            "Loop",
            "",
            vec!["G".to_string(), "G".to_string()],
        );
        let song_id = db.ingest_song_record(&record).unwrap();
        assert_eq!(db.chords_for_song(song_id).unwrap().len(), 2);
        assert_eq!(count(&db, "chords"), 1);
    }

    #[test]
    fn test_insert_visited_duplicate() {
        let db = Database::open_in_memory().unwrap();
        db.insert_visited("https://example.com/a").unwrap();
        let err = db.insert_visited("https://example.com/a").unwrap_err();
        assert!(err.is_already_recorded());
        assert_eq!(count(&db, "visited_pages"), 1);
        assert!(db.visited_hrefs().unwrap().contains("https://example.com/a"));
    }

    #[test]
    fn test_record_navigation_failure_counts_up() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.record_navigation_failure("/broken").unwrap(), 1);
        assert_eq!(db.record_navigation_failure("/broken").unwrap(), 2);
        assert_eq!(db.record_navigation_failure("/other").unwrap(), 1);
    }

    #[test]
    fn test_partial_schema_is_recreated() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("songs.db");

        {
            let db = Database::open(&path).unwrap();
            db.upsert_artist("Kept?").unwrap();
            db.conn().execute_batch("DROP TABLE song_chords;").unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(count(&db, "artists"), 0);
        assert_eq!(count(&db, "song_chords"), 0);
    }

    #[test]
    fn test_complete_schema_is_kept() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("songs.db");

        {
            let db = Database::open(&path).unwrap();
            db.upsert_artist("Kept").unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert!(db.find_artist("Kept").unwrap().is_some());
    }
}
