use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Locale;

/// A persisted news article. `link` is globally unique; rows are written once
/// by the pipeline and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub link: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub platform_domain: String,
    pub locale: Locale,
    pub category: Option<String>,
    pub author: Option<String>,
    pub guid: String,
}

/// Article fields as extracted from a feed entry, before insertion.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub link: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub platform_domain: String,
    pub locale: Locale,
    pub category: Option<String>,
    pub author: Option<String>,
    pub guid: String,
}
