//! Read-only aggregates over the store, used for progress reporting.

use serde::Serialize;

use crate::error::Result;
use crate::schema::Database;

/// Read a `COUNT(*)` column, which SQLite returns as a signed integer.
fn count_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(idx)?;
    u64::try_from(raw).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, raw))
}

/// How many times a chord appears across all stored songs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChordCount {
    pub chord: String,
    pub count: u64,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub artists: u64,
    pub songs: u64,
    pub chords: u64,
    pub associations: u64,
    pub visited_pages: u64,
    pub navigation_failures: u64,
}

impl Database {
    /// Chord usage, most frequent first.
    ///
    /// Counts association rows, so a chord listed twice on one song counts
    /// twice. Ties are ordered by chord symbol.
    pub fn chord_frequency(&self) -> Result<Vec<ChordCount>> {
        self.chord_frequency_top(None)
    }

    /// Like [`chord_frequency`](Self::chord_frequency), keeping at most
    /// `limit` rows.
    pub fn chord_frequency_top(&self, limit: Option<usize>) -> Result<Vec<ChordCount>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));

        let mut stmt = self.conn().prepare(
            "SELECT c.symbol, COUNT(*) AS uses
             FROM song_chords sc
             JOIN chords c ON sc.chord_id = c.id
             GROUP BY c.id
             ORDER BY uses DESC, c.symbol ASC
             LIMIT ?1",
        )?;

        let counts = stmt
            .query_map([limit], |row| {
                Ok(ChordCount {
                    chord: row.get(0)?,
                    count: count_column(row, 1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(counts)
    }

    /// Row counts for every crawler table.
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(self.conn().query_row(
            "SELECT
                (SELECT COUNT(*) FROM artists),
                (SELECT COUNT(*) FROM songs),
                (SELECT COUNT(*) FROM chords),
                (SELECT COUNT(*) FROM song_chords),
                (SELECT COUNT(*) FROM visited_pages),
                (SELECT COUNT(*) FROM navigation_failures)",
            [],
            |row| {
                Ok(StoreStats {
                    artists: count_column(row, 0)?,
                    songs: count_column(row, 1)?,
                    chords: count_column(row, 2)?,
                    associations: count_column(row, 3)?,
                    visited_pages: count_column(row, 4)?,
                    navigation_failures: count_column(row, 5)?,
                })
            },
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SongRecord;

    fn song(title: &str, chords: &[&str]) -> SongRecord {
        SongRecord::new(
            "Artist",
            title,
            "",
            chords.iter().map(|c| (*c).to_string()).collect(),
        )
    }

    #[test]
    fn test_chord_frequency_ranks_by_count() {
        let db = Database::open_in_memory().unwrap();
        db.ingest_song_record(&song("One", &["G"])).unwrap();
        db.ingest_song_record(&song("Two", &["G"])).unwrap();
        db.ingest_song_record(&song("Three", &["D"])).unwrap();

        let freq = db.chord_frequency().unwrap();
        assert_eq!(
            freq,
            vec![
                ChordCount {
                    chord: "G".to_string(),
                    count: 2
                },
                ChordCount {
                    chord: "D".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_chord_frequency_ties_sorted_by_symbol() {
        let db = Database::open_in_memory().unwrap();
        db.ingest_song_record(&song("One", &["G", "C", "Am"])).unwrap();

        let chords: Vec<String> = db
            .chord_frequency()
            .unwrap()
            .into_iter()
            .map(|c| c.chord)
            .collect();
        assert_eq!(chords, vec!["Am", "C", "G"]);
    }

    #[test]
    fn test_chord_frequency_top_limits_rows() {
        let db = Database::open_in_memory().unwrap();
        db.ingest_song_record(&song("One", &["G", "C", "D", "Em"])).unwrap();
        assert_eq!(db.chord_frequency_top(Some(2)).unwrap().len(), 2);
    }

    #[test]
    fn test_chord_frequency_empty_store() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.chord_frequency().unwrap().is_empty());
    }

    #[test]
    fn test_stats() {
        let db = Database::open_in_memory().unwrap();
        db.ingest_song_record(&song("One", &["G", "G", "D"])).unwrap();
        db.insert_visited("/one").unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.artists, 1);
        assert_eq!(stats.songs, 1);
        assert_eq!(stats.chords, 2);
        assert_eq!(stats.associations, 3);
        assert_eq!(stats.visited_pages, 1);
        assert_eq!(stats.navigation_failures, 0);
    }
}
