use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

use chordscrape_crawl::Config;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "chordscrape", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the database (default: ~/.local/share/chordscrape/chordscrape.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Crawl the site and store every trustworthy chord sheet
    ///
    /// Starts at the alphabetical index, walks every shard of artists, each
    /// artist's song list and each song page. For each song page:
    ///
    /// - Reads artist, title and tuning from the page
    /// - Reveals and reads the chord panel
    /// - Discards the page if any chord token is not a chord
    /// - Stores artist, song and chords otherwise
    ///
    /// Every finished page is recorded in the database. Running the command
    /// again resumes where the last run stopped and never fetches a finished
    /// page twice.
    ///
    /// A chord frequency snapshot is logged every few artists (see
    /// `report_every`) and once more at the end.
    Crawl {
        /// Page to start from (overrides `start_url`)
        #[arg(long)]
        start_url: Option<String>,

        /// Artists between frequency snapshots, 0 to disable (overrides `report_every`)
        #[arg(long)]
        report_every: Option<usize>,
    },
    /// Show chord frequency across all stored songs
    Report {
        /// Only show the N most used chords
        #[arg(long)]
        limit: Option<usize>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show row counts for the database
    Status,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Create a config file with defaults
    Init,
    /// Print an example config file
    Example,
    /// Set a value in the config file
    Set {
        /// Key, e.g. `report_every` or `layout.chord_tokens`
        key: String,
        value: String,
    },
}

fn init_logging(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => configured.parse().unwrap_or(LevelFilter::Info),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut clog = colog::default_builder();
    clog.filter(None, level);
    clog.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.db {
        Some(db) => Config::load_with_db_path(db)?,
        None => Config::load()?,
    };
    init_logging(cli.verbose, &config.logging_level);

    match cli.command {
        Commands::Crawl {
            start_url,
            report_every,
        } => {
            if let Some(url) = start_url {
                config.start_url = url;
            }
            if let Some(every) = report_every {
                config.report_every = every;
            }
            commands::run_crawl(&config).await?;
        }
        Commands::Report { limit, json } => {
            commands::show_report(&config.database_path, limit, json)?;
        }
        Commands::Status => {
            commands::show_status(&config.database_path)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config(&config)?,
            ConfigAction::Path => commands::config::show_path(),
            ConfigAction::Init => commands::config::init_config()?,
            ConfigAction::Example => commands::config::show_example(),
            ConfigAction::Set { key, value } => commands::config::set_config(&key, &value)?,
        },
    }

    Ok(())
}
