use anyhow::{bail, Context, Result};
use toml_edit::{DocumentMut, Value};

use chordscrape_crawl::{config, Config};

const STRING_KEYS: &[&str] = &["database_path", "start_url", "logging_level"];

const INTEGER_KEYS: &[&str] = &[
    "report_every",
    "requests_per_second",
    "page_timeout_secs",
    "max_retries",
    "max_nav_attempts",
];

const LAYOUT_KEYS: &[&str] = &[
    "index_link",
    "interstitial",
    "row_links",
    "song_links",
    "artist_name",
    "song_title",
    "chord_reveal",
    "chord_tokens",
    "tuning_block",
    "next_page",
];

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    let config_path = config::config_file_path();

    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config_path.display());
    let exists = config_path.exists();
    println!(
        "File exists: {}\n",
        if exists { "yes" } else { "no (using defaults)" }
    );

    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to render configuration")?
    );

    println!("\nPriority: CLI args > ENV vars (CHORD_*) > Config file > Defaults");

    Ok(())
}

/// Show the config file path.
pub fn show_path() {
    println!("{}", config::config_file_path().display());
}

/// Show example configuration.
pub fn show_example() {
    print!("{}", config::example_config());
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure chordscrape.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

/// Set a config value, keeping the rest of the file (comments included)
/// as it was.
pub fn set_config(key: &str, value: &str) -> Result<()> {
    let config_path = config::config_file_path();
    config::ensure_config_file()?;

    let contents = std::fs::read_to_string(&config_path).context("Failed to read config file")?;
    let updated = update_document(&contents, key, value)?;

    std::fs::write(&config_path, updated).context("Failed to write config file")?;

    println!("✓ Updated {} = {}", key, value);
    println!("  in {}", config_path.display());

    Ok(())
}

/// Apply one `key = value` edit to a config document and check that the
/// result still loads.
fn update_document(contents: &str, key: &str, raw: &str) -> Result<String> {
    let mut doc: DocumentMut = contents.parse().context("Config file is not valid TOML")?;
    let value = parse_value(key, raw)?;

    match key.split_once('.') {
        None => {
            doc[key] = toml_edit::value(value);
        }
        Some(("layout", field)) => {
            if !doc.contains_key("layout") {
                doc["layout"] = toml_edit::table();
            }
            let layout = doc["layout"]
                .as_table_like_mut()
                .context("`layout` in the config file is not a table")?;
            layout.insert(field, toml_edit::value(value));
        }
        Some(_) => bail!(unknown_key(key)),
    }

    let rendered = doc.to_string();
    toml::from_str::<Config>(&rendered)
        .with_context(|| format!("Invalid value for {}: {}", key, raw))?;
    Ok(rendered)
}

fn parse_value(key: &str, raw: &str) -> Result<Value> {
    if INTEGER_KEYS.contains(&key) {
        let n: i64 = raw
            .parse()
            .with_context(|| format!("{} expects a whole number, got {:?}", key, raw))?;
        return Ok(Value::from(n));
    }

    let is_layout = key
        .strip_prefix("layout.")
        .is_some_and(|field| LAYOUT_KEYS.contains(&field));
    if is_layout || STRING_KEYS.contains(&key) {
        return Ok(Value::from(raw));
    }

    bail!(unknown_key(key))
}

fn unknown_key(key: &str) -> String {
    let layout: Vec<String> = LAYOUT_KEYS.iter().map(|k| format!("layout.{k}")).collect();
    format!(
        "Unknown config key: {}\n\nValid keys: {}, {}, {}",
        key,
        STRING_KEYS.join(", "),
        INTEGER_KEYS.join(", "),
        layout.join(", ")
    )
}
