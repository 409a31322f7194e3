//! The traversal engine.
//!
//! A crawl walks alphabetical shards of artists. Each shard page lists
//! artists; each artist page lists songs; each song page is read, checked
//! and stored. Every step may fail on its own: a missing element or a
//! rejected click skips that one item, an untrustworthy chord list discards
//! that one song, and only store failures or a lost position in the
//! browsing history end the run.
//!
//! Pages are written to the [`Ledger`] once fully handled, after the
//! navigator has returned to their parent. Rerunning a crawl against the
//! same database therefore skips everything already done.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chordscrape_core::analysis::ChordCount;
use chordscrape_core::ledger::Ledger;
use chordscrape_core::schema::Database;

use crate::config::Layout;
use crate::error::CrawlResult;
use crate::extract::{self, SongPage};
use crate::navigator::{Element, Locator, Navigator, Readiness};

/// Chords shown in a progress snapshot.
const SNAPSHOT_TOP: usize = 10;

/// Where the crawler is in the site hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrawlState {
    AtIndex,
    AtArtistList,
    AtArtistSongs,
    AtSongDetail,
    Backtracking,
    Done,
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AtIndex => "index",
            Self::AtArtistList => "artist list",
            Self::AtArtistSongs => "artist songs",
            Self::AtSongDetail => "song detail",
            Self::Backtracking => "backtracking",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Run-level settings for a [`Crawler`].
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    pub start_url: String,

    /// Artist rows between chord-frequency snapshots; zero disables them.
    pub report_every: usize,

    /// Bound on the readiness wait after each navigating click.
    pub ready_timeout: Duration,

    /// Failed navigations allowed per href before it is abandoned; zero
    /// never abandons.
    pub max_nav_attempts: u32,
}

/// What a crawl did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub shards: usize,
    pub artist_rows: usize,
    pub artists_completed: usize,
    pub songs_ingested: usize,
    pub songs_rejected: usize,
    pub skipped_visited: usize,
    pub navigation_failures: usize,
    pub abandoned: usize,
    pub duplicate_records: usize,
    pub interstitials_dismissed: usize,

    /// Periodic chord-frequency snapshots logged during the run.
    pub frequency_reports: usize,
}

/// Drives a [`Navigator`] over the site and stores what it finds.
#[derive(Debug)]
pub struct Crawler<'db, N> {
    navigator: N,
    db: &'db Database,
    ledger: Ledger,
    layout: Layout,
    options: CrawlOptions,
    state: CrawlState,
    summary: CrawlSummary,
}

impl<'db, N: Navigator> Crawler<'db, N> {
    /// Create a crawler, loading the visited-page ledger from `db`.
    pub fn new(
        navigator: N,
        db: &'db Database,
        layout: Layout,
        options: CrawlOptions,
    ) -> CrawlResult<Self> {
        let ledger = Ledger::load(db)?;
        Ok(Self {
            navigator,
            db,
            ledger,
            layout,
            options,
            state: CrawlState::AtIndex,
            summary: CrawlSummary::default(),
        })
    }

    #[must_use]
    pub fn state(&self) -> CrawlState {
        self.state
    }

    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    #[must_use]
    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Crawl from the start URL until no shard is left.
    pub async fn run(&mut self) -> CrawlResult<CrawlSummary> {
        self.summary = CrawlSummary {
            started_at: Some(Utc::now()),
            ..CrawlSummary::default()
        };

        self.navigator.open(&self.options.start_url).await?;
        let outcome = self.drive().await;
        if let Err(e) = self.navigator.close().await {
            log::warn!("Closing the navigator failed: {}", e);
        }
        outcome?;

        self.summary.finished_at = Some(Utc::now());
        log::info!(
            "Crawl finished: {} shards, {} artists, {} songs stored, {} songs rejected",
            self.summary.shards,
            self.summary.artists_completed,
            self.summary.songs_ingested,
            self.summary.songs_rejected
        );
        self.report_frequency()?;
        Ok(self.summary.clone())
    }

    fn transition(&mut self, to: CrawlState) {
        if self.state != to {
            log::debug!("{} -> {}", self.state, to);
            self.state = to;
        }
    }

    async fn drive(&mut self) -> CrawlResult<()> {
        let mut seen_shards = HashSet::new();
        let mut next = CrawlState::AtIndex;

        loop {
            self.transition(next);
            next = match next {
                CrawlState::AtIndex => self.enter_first_shard(&seen_shards).await?,
                CrawlState::AtArtistList => {
                    if let Some(url) = self.navigator.current_url() {
                        seen_shards.insert(url);
                    }
                    self.crawl_shard().await?;
                    CrawlState::Backtracking
                }
                CrawlState::Backtracking => self.next_shard(&seen_shards).await?,
                CrawlState::Done => return Ok(()),
                // Entered and left from within a shard.
                CrawlState::AtArtistSongs | CrawlState::AtSongDetail => CrawlState::Backtracking,
            };
        }
    }

    async fn enter_first_shard(&mut self, seen: &HashSet<String>) -> CrawlResult<CrawlState> {
        let Some(locator) = self.layout.index_link.clone() else {
            return Ok(CrawlState::AtArtistList);
        };

        let Some(link) = self.navigator.find(&locator)? else {
            log::warn!("No shard link found on the index page");
            return Ok(CrawlState::Done);
        };

        self.open_shard(&link, seen).await
    }

    async fn next_shard(&mut self, seen: &HashSet<String>) -> CrawlResult<CrawlState> {
        let Some(locator) = self.layout.next_page.clone() else {
            return Ok(CrawlState::Done);
        };

        let Some(next) = self.navigator.find(&locator)? else {
            log::info!("No more pages");
            return Ok(CrawlState::Done);
        };

        if next.href().is_some_and(|href| seen.contains(href)) {
            log::info!("Next page leads back to a finished shard, stopping");
            return Ok(CrawlState::Done);
        }

        self.open_shard(&next, seen).await
    }

    /// Follow a control expected to lead to a shard not crawled yet in this
    /// run. Anything else ends the crawl.
    async fn open_shard(
        &mut self,
        control: &Element,
        seen: &HashSet<String>,
    ) -> CrawlResult<CrawlState> {
        let before = self.navigator.current_url();
        if !self.navigate(control).await? {
            log::warn!("Could not open the shard behind {}", control);
            return Ok(CrawlState::Done);
        }

        match self.navigator.current_url() {
            Some(url) if before.as_ref() != Some(&url) && !seen.contains(&url) => {
                Ok(CrawlState::AtArtistList)
            }
            _ => {
                log::info!("{} did not lead to a new shard, stopping", control);
                Ok(CrawlState::Done)
            }
        }
    }

    /// Click a link and wait for the page it opens.
    ///
    /// Returns `false` when the navigation failed and the navigator is still
    /// on the original page. Errors that are not about this one click, such
    /// as a lost session, are returned.
    async fn navigate(&mut self, element: &Element) -> CrawlResult<bool> {
        match self.navigator.click(element).await {
            Ok(()) => {}
            Err(e) if e.is_click_failure() => {
                log::warn!("Could not open {}: {}", element, e);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        match self.navigator.wait_ready(self.options.ready_timeout).await {
            Readiness::Ready => Ok(true),
            Readiness::TimedOut => {
                log::warn!(
                    "{} did not load within {:?}",
                    element,
                    self.options.ready_timeout
                );
                self.navigator.go_back().await?;
                Ok(false)
            }
        }
    }

    /// Click a control that acts on the current page. Absent or
    /// unresponsive controls report `false`.
    async fn click_in_place(&mut self, locator: &Locator, purpose: &str) -> CrawlResult<bool> {
        let Some(control) = self.navigator.find(locator)? else {
            log::debug!("No {} control on this page", purpose);
            return Ok(false);
        };

        match self.navigator.click(&control).await {
            Ok(()) => {}
            Err(e) if e.is_click_failure() => {
                log::debug!("{} control rejected the click: {}", purpose, e);
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        Ok(self.navigator.wait_ready(self.options.ready_timeout).await == Readiness::Ready)
    }

    async fn crawl_shard(&mut self) -> CrawlResult<()> {
        self.summary.shards += 1;

        if let Some(locator) = self.layout.interstitial.clone() {
            if self.click_in_place(&locator, "interstitial").await? {
                log::debug!("Dismissed interstitial");
                self.summary.interstitials_dismissed += 1;
            }
        }

        let rows = self.navigator.find_all(&self.layout.row_links)?;
        log::info!(
            "Shard {} lists {} artists",
            self.navigator.current_url().unwrap_or_default(),
            rows.len()
        );

        for row in rows {
            self.visit_artist(&row).await?;

            self.summary.artist_rows += 1;
            let every = self.options.report_every;
            if every > 0 && self.summary.artist_rows % every == 0 {
                log::info!("{} artist rows processed", self.summary.artist_rows);
                self.report_frequency()?;
                self.summary.frequency_reports += 1;
            }
        }

        Ok(())
    }

    async fn visit_artist(&mut self, row: &Element) -> CrawlResult<()> {
        let Some(href) = row.href().map(str::to_string) else {
            log::debug!("Artist row without a link: {}", row);
            return Ok(());
        };

        if self.ledger.contains(&href) {
            log::info!("Artist completed, skipping: {}", href);
            self.summary.skipped_visited += 1;
            return Ok(());
        }

        if !self.navigate(row).await? {
            return self.navigation_failed(&href);
        }

        log::info!("Artist: {}", row.text());
        self.transition(CrawlState::AtArtistSongs);
        self.crawl_artist_songs().await?;

        self.navigator.go_back().await?;
        self.transition(CrawlState::AtArtistList);
        self.mark_visited(&href)?;
        self.summary.artists_completed += 1;
        Ok(())
    }

    async fn crawl_artist_songs(&mut self) -> CrawlResult<()> {
        let songs = self.navigator.find_all(&self.layout.song_links)?;
        log::debug!("{} songs listed", songs.len());

        for song in songs {
            self.visit_song(&song).await?;
        }
        Ok(())
    }

    async fn visit_song(&mut self, link: &Element) -> CrawlResult<()> {
        let Some(href) = link.href().map(str::to_string) else {
            log::debug!("Song row without a link: {}", link);
            return Ok(());
        };

        if self.ledger.contains(&href) {
            log::info!("Skipping this href, already scanned: {}", href);
            self.summary.skipped_visited += 1;
            return Ok(());
        }

        if !self.navigate(link).await? {
            return self.navigation_failed(&href);
        }

        self.transition(CrawlState::AtSongDetail);
        if let Some(locator) = self.layout.chord_reveal.clone() {
            if !self.click_in_place(&locator, "chord panel").await? {
                log::info!("No chord panel for {}", href);
            }
        }
        self.read_song_page(&href)?;

        self.navigator.go_back().await?;
        self.transition(CrawlState::AtArtistSongs);

        // Marked even when extraction was rejected: bad content is not
        // retried.
        self.mark_visited(&href)
    }

    fn read_song_page(&mut self, href: &str) -> CrawlResult<()> {
        let text_of = |found: Option<Element>| found.map(|el| el.text().to_string());

        let page = SongPage {
            artist: text_of(self.navigator.find(&self.layout.artist_name)?),
            title: text_of(self.navigator.find(&self.layout.song_title)?),
            tuning_block: text_of(self.navigator.find(&self.layout.tuning_block)?),
            chords: extract::chord_tokens(
                self.navigator
                    .find_all(&self.layout.chord_tokens)?
                    .iter()
                    .map(Element::text),
            ),
        };

        match extract::song_record(&page) {
            Ok(record) => {
                log::info!(
                    "Song: {} - {} [tuning: {}] chords: {:?}",
                    record.artist,
                    record.title,
                    if record.tuning.is_empty() { "?" } else { record.tuning.as_str() },
                    record.chords
                );
                self.db.ingest_song_record(&record)?;
                self.summary.songs_ingested += 1;
            }
            Err(reason) => {
                log::warn!(
                    "Discarding {} ({}): {}",
                    page.title.as_deref().unwrap_or("untitled song"),
                    href,
                    reason
                );
                self.summary.songs_rejected += 1;
            }
        }
        Ok(())
    }

    fn navigation_failed(&mut self, href: &str) -> CrawlResult<()> {
        self.summary.navigation_failures += 1;

        let limit = self.options.max_nav_attempts;
        if limit == 0 {
            return Ok(());
        }

        let attempts = self.db.record_navigation_failure(href)?;
        if attempts >= limit {
            log::warn!("Giving up on {} after {} failed attempts", href, attempts);
            self.mark_visited(href)?;
            self.summary.abandoned += 1;
        }
        Ok(())
    }

    fn mark_visited(&mut self, href: &str) -> CrawlResult<()> {
        match self.ledger.record(self.db, href) {
            Ok(()) => Ok(()),
            Err(e) if e.is_already_recorded() => {
                log::info!("{}", e);
                self.summary.duplicate_records += 1;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn report_frequency(&self) -> CrawlResult<()> {
        let counts = self.db.chord_frequency_top(Some(SNAPSHOT_TOP))?;
        log::info!("Chord frequency: {}", format_counts(&counts));
        Ok(())
    }
}

/// `G×12, C×9, D×7` style summary of a frequency table.
pub fn format_counts(counts: &[ChordCount]) -> String {
    if counts.is_empty() {
        return "(no chords yet)".to_string();
    }
    counts
        .iter()
        .map(|c| format!("{}×{}", c.chord, c.count))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_counts() {
        let counts = vec![
            ChordCount {
                chord: "G".to_string(),
                count: 2,
            },
            ChordCount {
                chord: "D".to_string(),
                count: 1,
            },
        ];
        assert_eq!(format_counts(&counts), "G×2, D×1");
        assert_eq!(format_counts(&[]), "(no chords yet)");
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CrawlState::AtSongDetail.to_string(), "song detail");
        assert_eq!(CrawlState::Done.to_string(), "done");
    }
}
