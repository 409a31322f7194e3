//! Visited-page ledger.
//!
//! The ledger is the set of hrefs whose content has been fully processed.
//! It is loaded once from the database when a crawl starts and mirrored in
//! memory, so membership checks never touch SQLite. Every recorded href is
//! written through immediately, which is what lets an interrupted crawl
//! resume at the first unvisited page.

use std::collections::HashSet;

use crate::error::Result;
use crate::schema::Database;

/// In-memory mirror of the `visited_pages` table.
#[derive(Debug, Default)]
pub struct Ledger {
    visited: HashSet<String>,
}

impl Ledger {
    /// Rehydrate the ledger from every href persisted by earlier runs.
    pub fn load(db: &Database) -> Result<Self> {
        let visited = db.visited_hrefs()?;
        log::info!("Loaded {} visited pages", visited.len());
        Ok(Self { visited })
    }

    #[must_use]
    pub fn contains(&self, href: &str) -> bool {
        self.visited.contains(href)
    }

    /// Mark `href` as processed, persisting it before returning.
    ///
    /// # Errors
    /// Returns [`Error::AlreadyRecorded`](crate::Error::AlreadyRecorded) if
    /// the href was already persisted; the in-memory set still holds it
    /// afterwards. Any other error comes from the store.
    pub fn record(&mut self, db: &Database, href: &str) -> Result<()> {
        let result = db.insert_visited(href);
        if result.is_ok() || matches!(&result, Err(e) if e.is_already_recorded()) {
            self.visited.insert(href.to_string());
        }
        result
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visited.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }
}
