//! The page-navigation capability the crawler drives.
//!
//! A [`Navigator`] is one exclusive browsing session. The crawler never
//! assumes any call succeeds: lookups may find nothing, clicks may be
//! rejected, and pages may not become ready in time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::NavResult;

/// A CSS selector identifying elements on a page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A snapshot of one element, taken when it was located.
///
/// Snapshots stay valid after the session navigates elsewhere, which is
/// what lets the crawler iterate a row listing while visiting each row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    tag: String,
    text: String,
    attributes: BTreeMap<String, String>,
}

impl Element {
    #[must_use]
    pub fn new(
        tag: impl Into<String>,
        text: impl Into<String>,
        attributes: BTreeMap<String, String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
            attributes,
        }
    }

    /// Lower-case tag name.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Rendered text content with surrounding whitespace trimmed.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Attribute value. Link targets are reported as absolute URLs.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn href(&self) -> Option<&str> {
        self.attribute("href")
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.href() {
            Some(href) => write!(f, "<{}> {:?} ({})", self.tag, self.text, href),
            None => write!(f, "<{}> {:?}", self.tag, self.text),
        }
    }
}

/// Outcome of waiting for a page to settle after a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// One browsing session.
#[async_trait]
pub trait Navigator: Send {
    /// Start the session at `url`.
    async fn open(&mut self, url: &str) -> NavResult<()>;

    /// End the session and release its resources.
    async fn close(&mut self) -> NavResult<()>;

    /// First element matching `locator` on the current page, if any.
    fn find(&self, locator: &Locator) -> NavResult<Option<Element>>;

    /// Every element matching `locator`, in document order.
    fn find_all(&self, locator: &Locator) -> NavResult<Vec<Element>>;

    /// Interact with an element. Links navigate; controls act in place.
    async fn click(&mut self, element: &Element) -> NavResult<()>;

    /// Wait until the current page is ready, for at most `timeout`.
    async fn wait_ready(&mut self, timeout: Duration) -> Readiness;

    /// Return to the previous page.
    async fn go_back(&mut self) -> NavResult<()>;

    /// Address of the current page.
    fn current_url(&self) -> Option<String>;
}
