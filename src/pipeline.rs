use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::Repository;
use crate::error::{FeedError, Result};
use crate::feed::{extract_fields, parse_entries, sanitize_xml, FeedFetcher};
use crate::models::{FeedSource, NewArticle};
use crate::services::PlatformResolver;
use crate::stats::{FeedReport, NewArticleRef, RunStats};

/// Drives one ingestion run: fetch, sanitize, parse, resolve the platform and
/// persist new entries for every configured feed, under a bounded worker
/// budget. Feed failures stay contained to their feed; a run always finishes
/// and reports.
pub struct Pipeline {
    repository: Repository,
    fetcher: FeedFetcher,
    platforms: PlatformResolver,
    concurrency: usize,
}

impl Pipeline {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        let fetcher = FeedFetcher::new(Duration::from_secs(config.fetch_timeout_secs));
        let platforms = PlatformResolver::new(Duration::from_secs(config.scrape_timeout_secs));

        Ok(Self {
            repository,
            fetcher,
            platforms,
            concurrency: config.concurrency,
        })
    }

    /// Process all feeds concurrently and build the run report. Results are
    /// collected in completion order; within one feed, entries are handled
    /// strictly in parser order.
    pub async fn run(&self, feeds: &[FeedSource]) -> RunStats {
        let started = Utc::now();
        info!(total_feeds = feeds.len(), "starting ingestion run");

        let outcomes: Vec<(FeedReport, Vec<NewArticleRef>)> = stream::iter(feeds)
            .map(|feed| self.process_feed(feed))
            .buffer_unordered(self.concurrency.max(1))
            .collect()
            .await;

        let mut reports = Vec::with_capacity(outcomes.len());
        let mut new_articles = Vec::new();
        for (report, articles) in outcomes {
            reports.push(report);
            new_articles.extend(articles);
        }

        let stats = RunStats::build(started, Utc::now(), reports, new_articles);
        info!(
            new_articles = stats.summary.total_new_articles,
            successful = stats.summary.successful_feeds,
            failed = stats.summary.failed_feeds,
            duration_ms = stats.duration.milliseconds,
            "ingestion run finished"
        );
        stats
    }

    /// Feed boundary: every failure below this point becomes a failed feed
    /// report instead of propagating into the run.
    async fn process_feed(&self, feed: &FeedSource) -> (FeedReport, Vec<NewArticleRef>) {
        match self.ingest_feed(feed).await {
            Ok(new_articles) => (
                FeedReport {
                    url: feed.url.clone(),
                    locale: feed.locale,
                    success: true,
                    news_count: new_articles.len(),
                    error: None,
                },
                new_articles,
            ),
            Err(e) => {
                warn!(url = %feed.url, error = %e, "feed failed");
                (
                    FeedReport {
                        url: feed.url.clone(),
                        locale: feed.locale,
                        success: false,
                        news_count: 0,
                        error: Some(e.to_string()),
                    },
                    Vec::new(),
                )
            }
        }
    }

    async fn ingest_feed(&self, feed: &FeedSource) -> std::result::Result<Vec<NewArticleRef>, FeedError> {
        let fetched = self.fetcher.fetch_decoded(&feed.url).await?;
        debug!(
            url = %feed.url,
            content_type = %fetched.content_type,
            charset = %fetched.charset,
            "feed fetched"
        );

        let sanitized = sanitize_xml(&fetched.text);
        let entries = parse_entries(&sanitized)?;

        let domain = self
            .platforms
            .domain_for(&feed.url)
            .ok_or_else(|| FeedError::UnknownDomain(feed.url.clone()))?;
        let platform = self
            .platforms
            .ensure_platform(&self.repository, &domain, feed.locale)
            .await?
            .ok_or_else(|| FeedError::PlatformGateRejected(domain.clone()))?;

        let mut new_articles = Vec::new();
        for entry in &entries {
            let Some(fields) = extract_fields(entry) else {
                continue;
            };

            // Dedup gate. Link is the canonical identity; the UNIQUE
            // constraint below catches races with concurrent feeds.
            match self.repository.find_article_by_link(&fields.link).await {
                Ok(Some(_)) => {
                    debug!(link = %fields.link, "article already exists, skipping");
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(link = %fields.link, error = %e, "dedup lookup failed, skipping entry");
                    continue;
                }
            }

            let article = NewArticle {
                title: fields.title,
                description: fields.description,
                content: fields.content,
                link: fields.link,
                image_url: fields.image_url,
                published_at: fields.published_at,
                platform_domain: platform.domain.clone(),
                locale: feed.locale,
                category: fields.category,
                author: fields.author,
                guid: fields.guid,
            };

            match self.repository.insert_article(article).await {
                Ok(Some(created)) => {
                    info!(title = %created.title, link = %created.link, "new article");
                    new_articles.push(NewArticleRef::from(&created));
                }
                Ok(None) => {
                    debug!("insert lost a duplicate-link race, skipping");
                }
                Err(e) => {
                    warn!(error = %e, "article insert failed, skipping entry");
                }
            }
        }

        Ok(new_articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Locale, Platform};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Örnek Haber RSS</title>
    <item>
      <title>Tom & Jerry yeniden</title>
      <link>https://ornek.example/haber/1</link>
      <guid>https://ornek.example/haber/1</guid>
      <pubDate>Mon, 06 Sep 2021 16:45:00 +0300</pubDate>
      <description>Klasik çizgi film geri döndü</description>
    </item>
    <item>
      <title>İkinci başlık</title>
      <link>https://ornek.example/haber/2</link>
      <guid>https://ornek.example/haber/2</guid>
      <pubDate>Mon, 06 Sep 2021 17:00:00 +0300</pubDate>
    </item>
  </channel>
</rss>"#;

    async fn seeded_pipeline(
        domain: &str,
        fetch_timeout: Duration,
    ) -> (Pipeline, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let repository = Repository::new(path.to_str().unwrap()).await.unwrap();

        // Pre-seed the platform so no homepage scrape is attempted:
        // cached rows are returned unconditionally.
        repository
            .insert_platform(Platform {
                domain: domain.into(),
                name: "Örnek".into(),
                description: "Test platformu".into(),
                avatar_url: None,
                website_url: format!("https://{domain}"),
                is_verified: true,
                locale: Locale::TR,
            })
            .await
            .unwrap();

        let pipeline = Pipeline {
            repository,
            fetcher: FeedFetcher::new(fetch_timeout),
            platforms: PlatformResolver::new(Duration::from_secs(1)),
            concurrency: 4,
        };
        (pipeline, dir)
    }

    fn source(url: String) -> FeedSource {
        FeedSource {
            url,
            locale: Locale::TR,
        }
    }

    /// Canonical domain of a 127.0.0.1 mock-server URL ("0.1" after the
    /// last-two-labels rule).
    const MOCK_DOMAIN: &str = "0.1";

    #[tokio::test]
    async fn fresh_feed_ingests_all_items_and_second_run_is_idempotent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(FEED_XML, "application/rss+xml; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let (pipeline, _dir) = seeded_pipeline(MOCK_DOMAIN, Duration::from_secs(5)).await;
        let feeds = vec![source(format!("{}/feed.xml", server.uri()))];

        let stats = pipeline.run(&feeds).await;
        assert_eq!(stats.summary.total_feeds, 1);
        assert_eq!(stats.summary.successful_feeds, 1);
        assert_eq!(stats.summary.total_new_articles, 2);
        assert_eq!(stats.summary.success_rate, 100);

        // Sanitizer + entity decoding round-trip the bare ampersand
        assert!(stats
            .new_articles
            .iter()
            .any(|a| a.title == "Tom & Jerry yeniden"));

        let stored = pipeline
            .repository
            .find_article_by_link("https://ornek.example/haber/2")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.platform_domain, MOCK_DOMAIN);

        // Second pass over the unchanged feed finds only duplicates
        let again = pipeline.run(&feeds).await;
        assert_eq!(again.summary.total_new_articles, 0);
        assert_eq!(again.summary.successful_feeds, 1);
        assert_eq!(pipeline.repository.count_articles().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn slow_feed_times_out_without_affecting_others() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(FEED_XML, "application/rss+xml; charset=utf-8"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/slow.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(FEED_XML, "application/rss+xml; charset=utf-8")
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let (pipeline, _dir) = seeded_pipeline(MOCK_DOMAIN, Duration::from_secs(1)).await;
        let feeds = vec![
            source(format!("{}/slow.xml", server.uri())),
            source(format!("{}/ok.xml", server.uri())),
        ];

        let stats = pipeline.run(&feeds).await;
        assert_eq!(stats.summary.total_feeds, 2);
        assert_eq!(stats.summary.successful_feeds, 1);
        assert_eq!(stats.summary.failed_feeds, 1);
        assert_eq!(stats.summary.total_new_articles, 2);

        let failed = stats
            .per_feed_results
            .iter()
            .find(|r| !r.success)
            .unwrap();
        assert!(failed.url.ends_with("/slow.xml"));
        assert_eq!(failed.error.as_deref(), Some("fetch timed out"));
        assert_eq!(failed.news_count, 0);
    }

    #[tokio::test]
    async fn http_error_is_feed_scoped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone.xml"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (pipeline, _dir) = seeded_pipeline(MOCK_DOMAIN, Duration::from_secs(5)).await;
        let stats = pipeline
            .run(&[source(format!("{}/gone.xml", server.uri()))])
            .await;

        assert_eq!(stats.summary.failed_feeds, 1);
        assert_eq!(
            stats.per_feed_results[0].error.as_deref(),
            Some("HTTP 404")
        );
    }

    #[tokio::test]
    async fn unparseable_feed_is_feed_scoped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("definitely not xml"))
            .mount(&server)
            .await;

        let (pipeline, _dir) = seeded_pipeline(MOCK_DOMAIN, Duration::from_secs(5)).await;
        let stats = pipeline
            .run(&[source(format!("{}/broken.xml", server.uri()))])
            .await;

        assert_eq!(stats.summary.failed_feeds, 1);
        assert!(stats.per_feed_results[0]
            .error
            .as_deref()
            .unwrap()
            .contains("parse"));
    }

    #[tokio::test]
    async fn fresh_domain_creates_platform_during_run() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(FEED_XML, "application/rss+xml; charset=utf-8"),
            )
            .mount(&server)
            .await;
        let homepage = r#"<html><head>
            <title>Örnek Haber - Son Dakika</title>
            <meta name="description" content="Güncel haberler">
            <meta property="og:image" content="//cdn.ornek.example/logo.png">
            <meta property="og:site_name" content="Örnek Haber">
            </head><body></body></html>"#;
        Mock::given(method("GET"))
            .and(path(format!("/{MOCK_DOMAIN}")))
            .respond_with(ResponseTemplate::new(200).set_body_raw(homepage, "text/html"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let repository = Repository::new(db_path.to_str().unwrap()).await.unwrap();
        let pipeline = Pipeline {
            repository,
            fetcher: FeedFetcher::new(Duration::from_secs(5)),
            platforms: PlatformResolver::new(Duration::from_secs(5))
                .with_scrape_base(server.uri()),
            concurrency: 2,
        };

        let stats = pipeline
            .run(&[source(format!("{}/feed.xml", server.uri()))])
            .await;
        assert_eq!(stats.summary.successful_feeds, 1);
        assert_eq!(stats.summary.total_new_articles, 2);

        let platform = pipeline
            .repository
            .find_platform(MOCK_DOMAIN)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(platform.name, "Örnek Haber");
        assert_eq!(platform.description, "Güncel haberler");
        assert_eq!(
            platform.avatar_url.as_deref(),
            Some("https://cdn.ornek.example/logo.png")
        );
        assert_eq!(platform.website_url, format!("https://{MOCK_DOMAIN}"));
        assert!(platform.is_verified);
    }

    #[tokio::test]
    async fn unknown_platform_rejects_feed_without_writes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(FEED_XML, "application/rss+xml; charset=utf-8"),
            )
            .mount(&server)
            .await;

        // No platform row seeded: the resolver will try to scrape
        // https://0.1, which cannot succeed, so the gate must reject.
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let repository = Repository::new(db_path.to_str().unwrap()).await.unwrap();
        let pipeline = Pipeline {
            repository,
            fetcher: FeedFetcher::new(Duration::from_secs(5)),
            platforms: PlatformResolver::new(Duration::from_secs(1)),
            concurrency: 2,
        };

        let stats = pipeline
            .run(&[source(format!("{}/feed.xml", server.uri()))])
            .await;

        assert_eq!(stats.summary.failed_feeds, 1);
        assert_eq!(stats.summary.total_new_articles, 0);
        assert_eq!(pipeline.repository.count_articles().await.unwrap(), 0);
        assert!(pipeline
            .repository
            .find_platform(MOCK_DOMAIN)
            .await
            .unwrap()
            .is_none());
    }
}
