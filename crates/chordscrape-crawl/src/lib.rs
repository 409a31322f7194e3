//! Crawler for chord-sheet sites.
//!
//! Walks an alphabetical index of artists, each artist's song list, and each
//! song page, extracting artist, title, tuning and chords into the
//! [`chordscrape_core`] store. Navigation goes through the injected
//! [`Navigator`] capability; [`DomNavigator`] is the bundled implementation
//! over any [`PageSource`].

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod extract;
pub mod navigator;
pub mod resilience;
pub mod source;
pub mod validate;

pub use config::{Config, Layout};
pub use dom::DomNavigator;
pub use engine::{CrawlOptions, CrawlState, CrawlSummary, Crawler};
pub use error::{CrawlError, CrawlResult, FetchError, NavError, NavResult};
pub use navigator::{Element, Locator, Navigator, Readiness};
pub use source::{HttpSource, PageSource, StaticSource};
