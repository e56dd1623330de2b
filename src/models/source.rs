use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Audience of a feed. TR feeds are Turkish-language outlets, INT feeds are
/// international ones; the value is carried onto articles and platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    TR,
    INT,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::TR => "TR",
            Locale::INT => "INT",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "TR" => Ok(Locale::TR),
            "INT" => Ok(Locale::INT),
            _ => Err(format!("unknown locale: {s}")),
        }
    }
}

/// One configured feed URL. Loaded from a JSON list at startup and treated
/// as read-only for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
    pub url: String,
    pub locale: Locale,
}

impl FeedSource {
    /// Load the feed list from a JSON file of `[{"url": ..., "locale": ...}]`.
    pub fn load(path: &Path) -> Result<Vec<FeedSource>> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read feed list {}: {e}", path.display()))
        })?;
        let feeds: Vec<FeedSource> = serde_json::from_str(&content)?;
        Ok(feeds)
    }
}
