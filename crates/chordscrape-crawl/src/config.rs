use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::engine::CrawlOptions;
use crate::navigator::Locator;
use crate::source::HttpOptions;

/// Configuration for chordscrape.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (CHORD_* prefix)
/// 3. Config file (~/.config/chordscrape/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the SQLite database.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: CHORD_DATABASE_PATH
    /// - Default: ~/.local/share/chordscrape/chordscrape.db
    pub database_path: PathBuf,

    /// First page of the crawl: the alphabetical index.
    pub start_url: String,

    /// Log a chord-frequency snapshot after this many artist rows.
    /// Zero disables periodic snapshots.
    pub report_every: usize,

    /// Upper bound on page requests per second. Zero disables limiting.
    pub requests_per_second: u32,

    /// Per-request timeout, also used as the readiness wait after a click.
    pub page_timeout_secs: u64,

    /// Retries for transient fetch failures (timeouts, 5xx, 429).
    pub max_retries: usize,

    /// Give up on an href after this many failed navigations across runs.
    /// Zero retries forever.
    pub max_nav_attempts: u32,

    /// Log level: error, warn, info, debug or trace.
    pub logging_level: String,

    /// Where things are on the site's pages.
    pub layout: Layout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            start_url: "https://www.guitartabs.cc/tabs/0-9/".to_string(),
            report_every: 5,
            requests_per_second: 1,
            page_timeout_secs: 30,
            max_retries: 3,
            max_nav_attempts: 0,
            logging_level: "info".to_string(),
            layout: Layout::default(),
        }
    }
}

/// CSS locators for every element the crawler looks for.
///
/// Optional locators switch their step off when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Link from the start page into the first alphabetical shard.
    pub index_link: Option<Locator>,

    /// Overlay control to dismiss on each shard, if present.
    pub interstitial: Option<Locator>,

    /// Artist links on a shard page.
    pub row_links: Locator,

    /// Song links on an artist page.
    pub song_links: Locator,

    /// Breadcrumb entry holding "<artist> tabs".
    pub artist_name: Locator,

    /// Breadcrumb entry holding "<title> Chords".
    pub song_title: Locator,

    /// Control that reveals the chord panel on a song page.
    pub chord_reveal: Option<Locator>,

    /// One element per chord in the chord panel.
    pub chord_tokens: Locator,

    /// Block of song text that may contain a "Tuning:" line.
    pub tuning_block: Locator,

    /// Control leading to the next shard.
    pub next_page: Option<Locator>,
}

const LISTING_LINKS: &str = "#main_content > table:nth-of-type(2) > tbody > tr:nth-of-type(2) \
     > td:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(2) > table > tbody \
     > tr:nth-of-type(n+2) > td:nth-of-type(2) > a";

const BREADCRUMB: &str =
    "#main_content > table:nth-of-type(2) > tbody > tr:nth-of-type(1) > td:nth-of-type(2) > div";

impl Default for Layout {
    fn default() -> Self {
        Self {
            index_link: Some(Locator::css(
                "#main_content > table:nth-of-type(1) > tbody > tr > td:nth-of-type(2) \
                 > div:nth-of-type(2) > div > div > div > a:nth-of-type(1)",
            )),
            interstitial: Some(Locator::css("button.fc-cta-consent")),
            row_links: Locator::css(LISTING_LINKS),
            song_links: Locator::css(LISTING_LINKS),
            artist_name: Locator::css(format!("{BREADCRUMB} > a:nth-of-type(3)")),
            song_title: Locator::css(format!("{BREADCRUMB} > a:nth-of-type(4)")),
            chord_reveal: Some(Locator::css("#showing_chords_down")),
            chord_tokens: Locator::css(".crd > center"),
            tuning_block: Locator::css(
                "#main_content > table:nth-of-type(2) > tbody > tr:nth-of-type(2) \
                 > td:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(2) > div \
                 > div:nth-of-type(4) > font > pre",
            ),
            next_page: Some(Locator::css("a[rel=\"next\"]")),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/chordscrape/config.toml
    /// Reads environment variables with CHORD_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("chord");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }

    #[must_use]
    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    #[must_use]
    pub fn crawl_options(&self) -> CrawlOptions {
        CrawlOptions {
            start_url: self.start_url.clone(),
            report_every: self.report_every,
            ready_timeout: self.page_timeout(),
            max_nav_attempts: self.max_nav_attempts,
        }
    }

    #[must_use]
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            timeout: self.page_timeout(),
            requests_per_second: self.requests_per_second,
            max_retries: self.max_retries,
            ..HttpOptions::default()
        }
    }
}

/// Get the default database path.
///
/// Returns: ~/.local/share/chordscrape/chordscrape.db (or platform equivalent)
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chordscrape")
        .join("chordscrape.db")
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/chordscrape/config.toml
/// - macOS: ~/Library/Application Support/chordscrape/config.toml
/// - Windows: %APPDATA%\chordscrape\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("chordscrape")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r##"# Chordscrape Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (CHORD_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite database holding songs, chords and the visited-page
# ledger. Re-running a crawl against the same database resumes it.
#
# Can also be set via:
# - CLI: chordscrape --db /custom/path.db crawl
# - Environment: CHORD_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/chordscrape.db"

# Alphabetical index page the crawl starts from
#start_url = "https://www.guitartabs.cc/tabs/0-9/"

# Log the chord frequency table every N artists (0 = never)
report_every = 5

# Politeness: at most this many page requests per second (0 = unlimited)
requests_per_second = 1

# Per-page timeout in seconds
page_timeout_secs = 30

# Retries for timeouts, 5xx and 429 responses
max_retries = 3

# Stop retrying a link after this many failed visits across runs (0 = never)
max_nav_attempts = 0

# error, warn, info, debug or trace
logging_level = "info"

# CSS locators for the site's markup. Uncomment to override.
#[layout]
#row_links = "table.artists td a"
#chord_reveal = "#showing_chords_down"
#chord_tokens = ".crd > center"
#next_page = "a[rel=\"next\"]"
"##
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
