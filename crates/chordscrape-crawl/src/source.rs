//! Where page HTML comes from.
//!
//! [`HttpSource`] fetches live pages with rate limiting and retry;
//! [`StaticSource`] serves a fixed in-memory site and records what was
//! requested, for offline runs and tests.

use async_trait::async_trait;
use backon::Retryable;
use reqwest::{Client, Url};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::FetchError;
use crate::resilience::{retry_policy, RateLimiter};

/// Turns a URL into page HTML.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Settings for [`HttpSource`].
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub requests_per_second: u32,
    pub max_retries: usize,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            requests_per_second: 1,
            max_retries: 3,
            user_agent: format!("chordscrape/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Live pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSource {
    http: Client,
    rate_limiter: RateLimiter,
    max_retries: usize,
}

impl HttpSource {
    /// Create a new HTTP page source.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be created.
    pub fn new(options: &HttpOptions) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.as_str())
            .build()?;

        Ok(Self {
            http,
            rate_limiter: RateLimiter::new(options.requests_per_second),
            max_retries: options.max_retries,
        })
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, FetchError> {
        self.rate_limiter.acquire().await;
        log::debug!("GET {}", url);

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        (|| self.fetch_once(url))
            .retry(retry_policy(self.max_retries))
            .when(FetchError::is_transient)
            .notify(|err: &FetchError, delay: Duration| {
                log::warn!("Fetching {} failed ({}), retrying in {:?}", url, err, delay);
            })
            .await
    }
}

/// A fixed site held in memory.
///
/// Clones share the request log, so a handle kept by the caller sees every
/// fetch made through a navigator that owns another clone.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pages: Arc<HashMap<String, String>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StaticSource {
    /// Build a source from `(url, html)` pairs.
    #[must_use]
    pub fn new<I, U, H>(pages: I) -> Self
    where
        I: IntoIterator<Item = (U, H)>,
        U: Into<String>,
        H: Into<String>,
    {
        Self {
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(url, html)| (url.into(), html.into()))
                    .collect(),
            ),
            requests: Arc::default(),
        }
    }

    /// Every URL fetched so far, in request order.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// How many times `url` was fetched.
    #[must_use]
    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl PageSource for StaticSource {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(url.to_string());
        }
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Missing {
                url: url.to_string(),
            })
    }
}
