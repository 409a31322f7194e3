use anyhow::Result;
use std::path::Path;

use chordscrape_core::analysis::ChordCount;
use chordscrape_core::schema::Database;

pub fn show_report(db_path: &Path, limit: Option<usize>, json: bool) -> Result<()> {
    let db = Database::open(db_path)?;
    let counts = db.chord_frequency_top(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
        return Ok(());
    }

    if counts.is_empty() {
        println!("No chords stored yet. Run `chordscrape crawl` first.");
        return Ok(());
    }

    print!("{}", render_table(&counts));
    Ok(())
}

fn render_table(counts: &[ChordCount]) -> String {
    let width = counts
        .iter()
        .map(|c| c.chord.chars().count())
        .max()
        .unwrap_or(0)
        .max("Chord".len());

    let rows: String = counts
        .iter()
        .map(|c| format!("{:<width$}  {}\n", c.chord, c.count))
        .collect();
    format!("{:<width$}  Songs\n{rows}", "Chord")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table_aligns_columns() {
        let counts = vec![
            ChordCount {
                chord: "Dsus2".to_string(),
                count: 3,
            },
            ChordCount {
                chord: "G".to_string(),
                count: 1,
            },
        ];
        assert_eq!(render_table(&counts), "Chord  Songs\nDsus2  3\nG      1\n");
    }
}
