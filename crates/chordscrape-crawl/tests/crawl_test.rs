//! Integration tests for the traversal engine.
//!
//! These tests crawl a small in-memory site through the real DOM navigator,
//! so no network access is needed.

use std::time::Duration;

use async_trait::async_trait;
use chordscrape_core::schema::Database;
use chordscrape_crawl::{
    CrawlError, CrawlOptions, CrawlState, Crawler, DomNavigator, Element, Layout, Locator,
    NavError, NavResult, Navigator, Readiness, StaticSource,
};
use tempfile::TempDir;

const INDEX: &str = r#"<html><body>
  <a class="shard" href="/tabs/a/">A</a>
  <a class="shard" href="/tabs/b/">B</a>
</body></html>"#;

const SHARD_A: &str = r#"<html><body>
  <button id="consent">Accept</button>
  <table>
    <tr><th>Artist</th></tr>
    <tr><td class="row"><a href="/artists/abba">ABBA</a></td></tr>
    <tr><td class="row"><a href="/artists/missing">Nobody</a></td></tr>
    <tr><td class="row"><a name="top">No link here</a></td></tr>
  </table>
  <a rel="next" href="/tabs/b/">Next</a>
</body></html>"#;

const SHARD_B: &str = r#"<html><body>
  <table>
    <tr><td class="row"><a href="/artists/bee-gees">Bee Gees</a></td></tr>
  </table>
</body></html>"#;

const ABBA: &str = r#"<html><body>
  <ul>
    <li class="song"><a href="/songs/abba-sos">SOS</a></li>
    <li class="song"><a href="/songs/abba-bad">Bad Page</a></li>
  </ul>
</body></html>"#;

const BEE_GEES: &str = r#"<html><body>
  <ul><li class="song"><a href="/songs/bee-gees-stayin-alive">Stayin' Alive</a></li></ul>
</body></html>"#;

fn song_page(artist: &str, title: &str, tuning: &str, chords: &[&str]) -> String {
    let chords: String = chords
        .iter()
        .map(|c| format!("<div class=\"crd\"><center>{c}</center></div>"))
        .collect();
    format!(
        r#"<html><body>
  <div class="crumb"><a href="/">Home</a><a class="artist">{artist} tabs</a><a class="title">{title} Chords</a></div>
  <button id="reveal">Show chords</button>
  <div>{chords}</div>
  <pre class="song">Intro
{tuning}
Verse</pre>
</body></html>"#
    )
}

fn site() -> StaticSource {
    site_with(SHARD_A)
}

fn site_with(shard_a: &str) -> StaticSource {
    StaticSource::new([
        ("https://site.test/".to_string(), INDEX.to_string()),
        ("https://site.test/tabs/a/".to_string(), shard_a.to_string()),
        ("https://site.test/tabs/b/".to_string(), SHARD_B.to_string()),
        ("https://site.test/artists/abba".to_string(), ABBA.to_string()),
        (
            "https://site.test/artists/bee-gees".to_string(),
            BEE_GEES.to_string(),
        ),
        (
            "https://site.test/songs/abba-sos".to_string(),
            song_page("ABBA", "SOS", "Tuning: DADGAD", &["Am", "G", "Dsus2"]),
        ),
        (
            "https://site.test/songs/abba-bad".to_string(),
            song_page("ABBA", "Bad Page", "", &["C", "H7"]),
        ),
        (
            "https://site.test/songs/bee-gees-stayin-alive".to_string(),
            song_page("Bee Gees", "Stayin' Alive", "", &["G", "D"]),
        ),
    ])
}

fn layout() -> Layout {
    Layout {
        index_link: Some(Locator::css("a.shard")),
        interstitial: Some(Locator::css("#consent")),
        row_links: Locator::css("td.row a"),
        song_links: Locator::css("li.song a"),
        artist_name: Locator::css(".crumb a.artist"),
        song_title: Locator::css(".crumb a.title"),
        chord_reveal: Some(Locator::css("#reveal")),
        chord_tokens: Locator::css(".crd > center"),
        tuning_block: Locator::css("pre.song"),
        next_page: Some(Locator::css("a[rel=\"next\"]")),
    }
}

fn options(max_nav_attempts: u32) -> CrawlOptions {
    CrawlOptions {
        start_url: "https://site.test/".to_string(),
        report_every: 1,
        ready_timeout: Duration::from_secs(1),
        max_nav_attempts,
    }
}

/// Test a full crawl of both shards stores every valid song
#[tokio::test]
async fn test_crawl_ingests_valid_songs() {
    let db = Database::open_in_memory().unwrap();
    let mut crawler = Crawler::new(DomNavigator::new(site()), &db, layout(), options(0)).unwrap();

    let summary = crawler.run().await.unwrap();
    assert_eq!(crawler.state(), CrawlState::Done);
    assert_eq!(summary.shards, 2);
    assert_eq!(summary.artist_rows, 4);
    assert_eq!(summary.artists_completed, 2);
    assert_eq!(summary.songs_ingested, 2);
    assert_eq!(summary.songs_rejected, 1);
    assert_eq!(summary.navigation_failures, 1);
    assert!(summary.started_at.is_some());
    assert!(summary.finished_at.is_some());

    let source = crawler.navigator().source();
    assert_eq!(source.request_count("https://site.test/artists/missing"), 1);
    assert_eq!(source.request_count("https://site.test/songs/abba-sos"), 1);

    let abba = db.find_artist("ABBA").unwrap().expect("ABBA stored");
    let songs = db.songs_by_artist(abba.id).unwrap();
    assert_eq!(songs.len(), 1);
    assert_eq!(songs[0].title, "SOS");
    assert_eq!(songs[0].tuning, "DADGAD");

    let chords: Vec<String> = db
        .chords_for_song(songs[0].id)
        .unwrap()
        .into_iter()
        .map(|c| c.symbol)
        .collect();
    assert_eq!(chords, ["Am", "G", "Dsus2"]);

    let stats = db.stats().unwrap();
    assert_eq!(stats.artists, 2);
    assert_eq!(stats.songs, 2);
    assert_eq!(stats.chords, 4);
    assert_eq!(stats.associations, 5);
}

/// Test the frequency table after a crawl ranks shared chords first
#[tokio::test]
async fn test_crawl_chord_frequency() {
    let db = Database::open_in_memory().unwrap();
    let mut crawler = Crawler::new(DomNavigator::new(site()), &db, layout(), options(0)).unwrap();
    crawler.run().await.unwrap();

    let ranked: Vec<(String, u64)> = db
        .chord_frequency()
        .unwrap()
        .into_iter()
        .map(|c| (c.chord, c.count))
        .collect();
    assert_eq!(
        ranked,
        [
            ("G".to_string(), 2),
            ("Am".to_string(), 1),
            ("D".to_string(), 1),
            ("Dsus2".to_string(), 1),
        ]
    );
}

/// Test that an invalid chord page is marked visited but a failed click is not
#[tokio::test]
async fn test_ledger_after_crawl() {
    let db = Database::open_in_memory().unwrap();
    let mut crawler = Crawler::new(DomNavigator::new(site()), &db, layout(), options(0)).unwrap();
    crawler.run().await.unwrap();

    let ledger = crawler.ledger();
    assert!(ledger.contains("https://site.test/songs/abba-bad"));
    assert!(ledger.contains("https://site.test/songs/abba-sos"));
    assert!(ledger.contains("https://site.test/artists/abba"));
    assert!(ledger.contains("https://site.test/artists/bee-gees"));
    assert!(!ledger.contains("https://site.test/artists/missing"));
    assert_eq!(ledger.len(), 5);
    assert_eq!(db.stats().unwrap().visited_pages, 5);

    assert!(db.find_artist("Nobody").unwrap().is_none());
}

/// Test that a second run over the same database does not revisit finished pages
#[tokio::test]
async fn test_resume_skips_processed_pages() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("crawl.db");
    let source = site();

    {
        let db = Database::open(&db_path).unwrap();
        let mut crawler =
            Crawler::new(DomNavigator::new(source.clone()), &db, layout(), options(0)).unwrap();
        crawler.run().await.unwrap();
    }

    let db = Database::open(&db_path).unwrap();
    let mut crawler =
        Crawler::new(DomNavigator::new(source.clone()), &db, layout(), options(0)).unwrap();
    let summary = crawler.run().await.unwrap();

    assert_eq!(summary.songs_ingested, 0);
    assert_eq!(summary.skipped_visited, 2);
    assert_eq!(source.request_count("https://site.test/artists/abba"), 1);
    assert_eq!(source.request_count("https://site.test/songs/abba-sos"), 1);
    assert_eq!(source.request_count("https://site.test/songs/abba-bad"), 1);
    // Never recorded, so tried again.
    assert_eq!(source.request_count("https://site.test/artists/missing"), 2);
    assert_eq!(db.stats().unwrap().songs, 2);
}

/// Test that a link failing on every run is abandoned once the bound is hit
#[tokio::test]
async fn test_bounded_navigation_retry() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("crawl.db");
    let source = site();

    let mut abandoned = Vec::new();
    for _ in 0..3 {
        let db = Database::open(&db_path).unwrap();
        let mut crawler =
            Crawler::new(DomNavigator::new(source.clone()), &db, layout(), options(2)).unwrap();
        abandoned.push(crawler.run().await.unwrap().abandoned);
    }

    assert_eq!(abandoned, [0, 1, 0]);
    assert_eq!(source.request_count("https://site.test/artists/missing"), 2);

    let db = Database::open(&db_path).unwrap();
    assert_eq!(db.stats().unwrap().navigation_failures, 1);
}

/// Test that a next link pointing at a finished shard ends the crawl
#[tokio::test]
async fn test_pagination_self_loop_stops() {
    let looping = SHARD_A.replace("/tabs/b/", "/tabs/a/");
    let source = site_with(&looping);
    let db = Database::open_in_memory().unwrap();
    let mut crawler =
        Crawler::new(DomNavigator::new(source.clone()), &db, layout(), options(0)).unwrap();
    let summary = crawler.run().await.unwrap();

    assert_eq!(summary.shards, 1);
    assert_eq!(source.request_count("https://site.test/tabs/a/"), 1);
    assert_eq!(source.request_count("https://site.test/tabs/b/"), 0);
}

/// Test that without an index locator the start page is crawled as a shard
#[tokio::test]
async fn test_start_page_as_shard() {
    let db = Database::open_in_memory().unwrap();
    let mut layout = layout();
    layout.index_link = None;
    layout.next_page = None;

    let mut options = options(0);
    options.start_url = "https://site.test/tabs/b/".to_string();

    let mut crawler = Crawler::new(DomNavigator::new(site()), &db, layout, options).unwrap();
    let summary = crawler.run().await.unwrap();

    assert_eq!(summary.shards, 1);
    assert_eq!(summary.songs_ingested, 1);
    assert!(db.find_artist("Bee Gees").unwrap().is_some());
}

/// Test that an index page without shard links ends cleanly
#[tokio::test]
async fn test_missing_shard_link_finishes() {
    let db = Database::open_in_memory().unwrap();
    let mut layout = layout();
    layout.index_link = Some(Locator::css("a.nowhere"));

    let mut crawler = Crawler::new(DomNavigator::new(site()), &db, layout, options(0)).unwrap();
    let summary = crawler.run().await.unwrap();

    assert_eq!(crawler.state(), CrawlState::Done);
    assert_eq!(summary.shards, 0);
    assert_eq!(db.stats().unwrap().songs, 0);
}

/// Test that an href recorded behind the crawler's back is tolerated
#[tokio::test]
async fn test_duplicate_ledger_entry_is_ignored() {
    let db = Database::open_in_memory().unwrap();
    let mut crawler = Crawler::new(DomNavigator::new(site()), &db, layout(), options(0)).unwrap();

    // Recorded after the ledger was loaded, so the crawler still visits it.
    db.insert_visited("https://site.test/songs/abba-sos").unwrap();

    let summary = crawler.run().await.unwrap();
    assert_eq!(summary.duplicate_records, 1);
    assert_eq!(summary.songs_ingested, 2);
    assert_eq!(db.stats().unwrap().visited_pages, 5);
}

/// Test that a malformed locator in the layout aborts the crawl
#[tokio::test]
async fn test_invalid_locator_is_fatal() {
    let db = Database::open_in_memory().unwrap();
    let mut layout = layout();
    layout.row_links = Locator::css("td[");

    let mut crawler = Crawler::new(DomNavigator::new(site()), &db, layout, options(0)).unwrap();
    let err = crawler.run().await.unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Navigation(NavError::InvalidLocator { .. })
    ));
}

/// Test that a missing start page is reported as a navigation error
#[tokio::test]
async fn test_unreachable_start_page() {
    let db = Database::open_in_memory().unwrap();
    let mut options = options(0);
    options.start_url = "https://site.test/nowhere".to_string();

    let mut crawler = Crawler::new(DomNavigator::new(site()), &db, layout(), options).unwrap();
    let err = crawler.run().await.unwrap_err();
    assert!(matches!(err, CrawlError::Navigation(NavError::Load { .. })));
}

/// Test that a frequency snapshot is logged every `report_every` artist rows
#[tokio::test]
async fn test_periodic_frequency_reports() {
    for (every, expected) in [(1, 4), (3, 1), (5, 0), (0, 0)] {
        let db = Database::open_in_memory().unwrap();
        let mut options = options(0);
        options.report_every = every;

        let mut crawler = Crawler::new(DomNavigator::new(site()), &db, layout(), options).unwrap();
        let summary = crawler.run().await.unwrap();

        assert_eq!(summary.artist_rows, 4);
        assert_eq!(
            summary.frequency_reports, expected,
            "report_every = {every}"
        );
    }
}

/// Test that the consent overlay is dismissed only where it is shown
#[tokio::test]
async fn test_interstitial_dismissed_once() {
    let db = Database::open_in_memory().unwrap();
    let mut crawler = Crawler::new(DomNavigator::new(site()), &db, layout(), options(0)).unwrap();
    let summary = crawler.run().await.unwrap();

    assert_eq!(summary.shards, 2);
    assert_eq!(summary.interstitials_dismissed, 1);
}

/// Test that a next control acting in place ends the crawl instead of
/// crawling the same shard again
#[tokio::test]
async fn test_next_button_without_link_finishes() {
    let with_button = SHARD_A.replace(
        r#"<a rel="next" href="/tabs/b/">Next</a>"#,
        r#"<button id="next">Next</button>"#,
    );
    let source = site_with(&with_button);
    let db = Database::open_in_memory().unwrap();
    let mut layout = layout();
    layout.next_page = Some(Locator::css("#next"));

    let mut crawler =
        Crawler::new(DomNavigator::new(source.clone()), &db, layout, options(0)).unwrap();
    let summary = crawler.run().await.unwrap();

    assert_eq!(crawler.state(), CrawlState::Done);
    assert_eq!(summary.shards, 1);
    assert_eq!(summary.artists_completed, 1);
    assert_eq!(source.request_count("https://site.test/tabs/a/"), 1);
    assert_eq!(source.request_count("https://site.test/tabs/b/"), 0);
}

/// Test that an index control that does not leave the page ends the crawl
#[tokio::test]
async fn test_index_button_without_link_finishes() {
    let db = Database::open_in_memory().unwrap();
    let mut layout = layout();
    layout.index_link = Some(Locator::css("#consent"));

    let mut options = options(0);
    options.start_url = "https://site.test/tabs/a/".to_string();

    let mut crawler = Crawler::new(DomNavigator::new(site()), &db, layout, options).unwrap();
    let summary = crawler.run().await.unwrap();

    assert_eq!(crawler.state(), CrawlState::Done);
    assert_eq!(summary.shards, 0);
    assert_eq!(db.stats().unwrap().visited_pages, 0);
}

/// Navigator that loses its session when an artist link is clicked.
#[derive(Debug)]
struct LostSession(DomNavigator<StaticSource>);

#[async_trait]
impl Navigator for LostSession {
    async fn open(&mut self, url: &str) -> NavResult<()> {
        self.0.open(url).await
    }

    async fn close(&mut self) -> NavResult<()> {
        self.0.close().await
    }

    fn find(&self, locator: &Locator) -> NavResult<Option<Element>> {
        self.0.find(locator)
    }

    fn find_all(&self, locator: &Locator) -> NavResult<Vec<Element>> {
        self.0.find_all(locator)
    }

    async fn click(&mut self, element: &Element) -> NavResult<()> {
        if element.href().is_some_and(|href| href.contains("/artists/")) {
            return Err(NavError::NoPage);
        }
        self.0.click(element).await
    }

    async fn wait_ready(&mut self, timeout: Duration) -> Readiness {
        self.0.wait_ready(timeout).await
    }

    async fn go_back(&mut self) -> NavResult<()> {
        self.0.go_back().await
    }

    fn current_url(&self) -> Option<String> {
        self.0.current_url()
    }
}

/// Test that a lost session aborts the crawl instead of counting as a
/// failed link
#[tokio::test]
async fn test_lost_session_is_fatal() {
    let db = Database::open_in_memory().unwrap();
    let navigator = LostSession(DomNavigator::new(site()));
    let mut crawler = Crawler::new(navigator, &db, layout(), options(1)).unwrap();

    let err = crawler.run().await.unwrap_err();
    assert!(matches!(err, CrawlError::Navigation(NavError::NoPage)));

    let stats = db.stats().unwrap();
    assert_eq!(stats.navigation_failures, 0);
    assert_eq!(stats.visited_pages, 0);
}
