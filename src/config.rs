use std::path::PathBuf;
use std::time::Duration;

use clap::Args;

use crate::dedup::DedupPolicy;
use crate::parser::cards::{
    CardSelectors, DEFAULT_CARD_SELECTOR, DEFAULT_LINK_SELECTOR, DEFAULT_TITLE_SELECTOR,
};

const DEFAULT_DB_PATH: &str = "data/headlines.sqlite";
const DEFAULT_SOURCE_URL: &str = "http://www.worldsurfleague.com/";

/// Settings shared by every subcommand. Each flag can also come from the environment.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// SQLite database file
    #[arg(long = "db", env = "HEADLINES_DB", default_value = DEFAULT_DB_PATH, global = true)]
    pub db_path: PathBuf,

    /// Page to scrape
    #[arg(long, env = "HEADLINES_URL", default_value = DEFAULT_SOURCE_URL, global = true)]
    pub url: String,

    /// Fetch timeout in seconds
    #[arg(
        long = "timeout",
        env = "HEADLINES_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..),
        global = true
    )]
    pub timeout_secs: u64,

    /// How repeated scrapes are merged
    #[arg(long, env = "HEADLINES_DEDUP", value_enum, default_value_t = DedupPolicy::Append, global = true)]
    pub dedup: DedupPolicy,

    /// CSS selector for one card
    #[arg(long, default_value = DEFAULT_CARD_SELECTOR, global = true)]
    pub card_selector: String,

    /// CSS selector for the title inside a card
    #[arg(long, default_value = DEFAULT_TITLE_SELECTOR, global = true)]
    pub title_selector: String,

    /// CSS selector for the link inside a card
    #[arg(long, default_value = DEFAULT_LINK_SELECTOR, global = true)]
    pub link_selector: String,
}

impl Settings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn selectors(&self) -> CardSelectors {
        CardSelectors {
            card: self.card_selector.clone(),
            title: self.title_selector.clone(),
            link: self.link_selector.clone(),
        }
    }
}
