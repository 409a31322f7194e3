//! Core domain model for chordscrape.
//!
//! This crate defines the song/chord data model, the SQLite schema and
//! [`Database`] store with its insert-or-fetch upserts, the visited-page
//! [`Ledger`] that makes a crawl resumable, and the read-only chord
//! frequency analysis.
//!
//! [`Database`]: schema::Database
//! [`Ledger`]: ledger::Ledger

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod analysis;
pub mod error;
pub mod ledger;
pub mod model;
pub mod schema;

pub use error::{Error, Result};
