//! Error types for navigation and crawling.

use thiserror::Error;

/// Errors raised while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// An error propagated from `reqwest`.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The source has no page at this address.
    #[error("no page at {url}")]
    Missing { url: String },
}

impl FetchError {
    /// Returns `true` when the error is transient and the fetch may succeed
    /// if retried.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            Self::Missing { .. } => false,
        }
    }
}

/// Errors raised by a [`Navigator`](crate::Navigator).
#[derive(Debug, Error)]
pub enum NavError {
    /// A locator is not a valid CSS selector.
    #[error("invalid locator {locator:?}: {message}")]
    InvalidLocator { locator: String, message: String },

    #[error("invalid URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The element exists but cannot be interacted with.
    #[error("click rejected: {reason}")]
    ClickRejected { reason: String },

    /// Following a link failed.
    #[error("failed to load {url}: {source}")]
    Load {
        url: String,
        #[source]
        source: FetchError,
    },

    /// No page is open.
    #[error("no page is open")]
    NoPage,

    /// There is no previous page to return to.
    #[error("no previous page to go back to")]
    NoHistory,
}

impl NavError {
    /// Returns `true` for failures that only affect the clicked item.
    pub fn is_click_failure(&self) -> bool {
        matches!(
            self,
            Self::ClickRejected { .. } | Self::Load { .. } | Self::InvalidUrl { .. }
        )
    }
}

/// Errors that end a crawl.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("navigation error: {0}")]
    Navigation(#[from] NavError),

    #[error("store error: {0}")]
    Store(#[from] chordscrape_core::Error),
}

pub type NavResult<T> = std::result::Result<T, NavError>;

pub type CrawlResult<T> = std::result::Result<T, CrawlError>;
