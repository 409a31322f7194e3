use anyhow::Result;
use std::path::Path;

use chordscrape_core::schema::Database;

pub fn show_status(db_path: &Path) -> Result<()> {
    let db = Database::open(db_path)?;
    let stats = db.stats()?;

    println!("\n📊 Chordscrape Status\n");
    println!("  Database: {}", db_path.display());
    println!("  Artists:             {}", stats.artists);
    println!("  Songs:               {}", stats.songs);
    println!("  Distinct chords:     {}", stats.chords);
    println!("  Song/chord links:    {}", stats.associations);
    println!("  Visited pages:       {}", stats.visited_pages);
    println!("  Failing links:       {}", stats.navigation_failures);

    if stats.visited_pages == 0 {
        println!("\n  Run `chordscrape crawl` to start collecting");
    }

    Ok(())
}
