use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// JSON file with the feed list: `[{"url": ..., "locale": "TR"|"INT"}]`.
    #[serde(default = "default_feeds_path")]
    pub feeds_path: String,

    /// Directory the per-run statistics artifacts are written to.
    #[serde(default = "default_stats_dir")]
    pub stats_dir: String,

    /// Maximum number of feeds processed at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: u64,
}

fn data_dir() -> PathBuf {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("haber-ingest");
    std::fs::create_dir_all(&dir).ok();
    dir
}

fn default_db_path() -> String {
    data_dir().join("news.db").to_string_lossy().to_string()
}

fn default_feeds_path() -> String {
    Config::config_path()
        .parent()
        .map(|p| p.join("rss_feeds.json"))
        .unwrap_or_else(|| PathBuf::from("rss_feeds.json"))
        .to_string_lossy()
        .to_string()
}

fn default_stats_dir() -> String {
    data_dir().join("stats").to_string_lossy().to_string()
}

fn default_concurrency() -> usize {
    10
}

fn default_fetch_timeout() -> u64 {
    20
}

fn default_scrape_timeout() -> u64 {
    15
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            feeds_path: default_feeds_path(),
            stats_dir: default_stats_dir(),
            concurrency: default_concurrency(),
            fetch_timeout_secs: default_fetch_timeout(),
            scrape_timeout_secs: default_scrape_timeout(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("haber-ingest")
            .join("config.toml")
    }
}
