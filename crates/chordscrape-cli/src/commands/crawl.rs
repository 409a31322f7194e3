use anyhow::{Context, Result};

use chordscrape_core::schema::Database;
use chordscrape_crawl::{Config, CrawlSummary, Crawler, DomNavigator, HttpSource};

pub async fn run_crawl(config: &Config) -> Result<()> {
    log::info!("Starting crawl at {}", config.start_url);

    let db = Database::open(&config.database_path).with_context(|| {
        format!(
            "Failed to open database {}",
            config.database_path.display()
        )
    })?;
    let source = HttpSource::new(&config.http_options())?;
    let navigator = DomNavigator::new(source);

    let mut crawler = Crawler::new(
        navigator,
        &db,
        config.layout.clone(),
        config.crawl_options(),
    )?;
    let summary = crawler.run().await?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &CrawlSummary) {
    println!("\n✓ Crawl complete\n");
    println!("  Shards:               {}", summary.shards);
    println!("  Artist rows:          {}", summary.artist_rows);
    println!("  Artists completed:    {}", summary.artists_completed);
    println!("  Songs stored:         {}", summary.songs_ingested);
    println!("  Songs rejected:       {}", summary.songs_rejected);
    println!("  Skipped (visited):    {}", summary.skipped_visited);
    println!("  Navigation failures:  {}", summary.navigation_failures);
    if summary.abandoned > 0 {
        println!("  Links given up on:    {}", summary.abandoned);
    }
    if let (Some(start), Some(end)) = (summary.started_at, summary.finished_at) {
        println!("  Duration:             {}s", (end - start).num_seconds());
    }
}
