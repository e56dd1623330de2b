use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::{Article, Locale};

/// Slim reference to a newly ingested article, for downstream consumers of
/// the run artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticleRef {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub platform: String,
    pub published_at: DateTime<Utc>,
    pub guid: String,
}

impl From<&Article> for NewArticleRef {
    fn from(article: &Article) -> Self {
        NewArticleRef {
            id: article.id,
            title: article.title.clone(),
            link: article.link.clone(),
            platform: article.platform_domain.clone(),
            published_at: article.published_at,
            guid: article.guid.clone(),
        }
    }
}

/// Outcome of one feed within a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedReport {
    pub url: String,
    pub locale: Locale,
    pub success: bool,
    pub news_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunDuration {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub milliseconds: i64,
    pub seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub total_feeds: usize,
    pub successful_feeds: usize,
    pub failed_feeds: usize,
    pub total_new_articles: usize,
    pub success_rate: u32,
}

/// The statistics artifact for one complete ingestion run. Built once after
/// all workers finish and immutable from then on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub timestamp: DateTime<Utc>,
    pub unix_timestamp: i64,
    pub duration: RunDuration,
    pub summary: RunSummary,
    pub new_articles: Vec<NewArticleRef>,
    pub per_feed_results: Vec<FeedReport>,
}

impl RunStats {
    pub fn build(
        started: DateTime<Utc>,
        ended: DateTime<Utc>,
        per_feed_results: Vec<FeedReport>,
        new_articles: Vec<NewArticleRef>,
    ) -> Self {
        let total_feeds = per_feed_results.len();
        let successful_feeds = per_feed_results.iter().filter(|r| r.success).count();
        let failed_feeds = total_feeds - successful_feeds;
        let success_rate = if total_feeds == 0 {
            0
        } else {
            (successful_feeds as f64 / total_feeds as f64 * 100.0).round() as u32
        };

        let millis = (ended - started).num_milliseconds();

        RunStats {
            timestamp: ended,
            unix_timestamp: started.timestamp(),
            duration: RunDuration {
                start: started,
                end: ended,
                milliseconds: millis,
                seconds: (millis as f64 / 1000.0).round() as i64,
            },
            summary: RunSummary {
                total_feeds,
                successful_feeds,
                failed_feeds,
                total_new_articles: new_articles.len(),
                success_rate,
            },
            new_articles,
            per_feed_results,
        }
    }

    /// Persist the artifact as `<unix_start_timestamp>-stats.json` under
    /// `dir`, creating the directory if needed.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}-stats.json", self.unix_timestamp));
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}
