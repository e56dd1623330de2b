use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Top-level error for the binary: configuration, storage and I/O failures
/// that should stop the process. Feed-scoped failures use [`FeedError`] and
/// never escalate this far.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config error: {0}")]
    Config(String),
}

/// Failures scoped to a single feed. The scheduler catches these at the feed
/// boundary and records them in the run report; they never abort other feeds
/// or the run itself.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("fetch timed out")]
    FetchTimeout,

    #[error("HTTP {0}")]
    Http(u16),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("feed parse error: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),

    #[error("could not determine platform domain for {0}")]
    UnknownDomain(String),

    #[error("platform {0} has no usable site metadata")]
    PlatformGateRejected(String),

    #[error("database error: {0}")]
    Db(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::FetchTimeout
        } else {
            FeedError::Request(err)
        }
    }
}

impl From<AppError> for FeedError {
    fn from(err: AppError) -> Self {
        FeedError::Db(err.to_string())
    }
}
