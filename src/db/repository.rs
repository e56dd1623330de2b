use chrono::{DateTime, Utc};
use rusqlite::{params, ErrorCode, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Article, Locale, NewArticle, Platform};

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Article operations

    pub async fn find_article_by_link(&self, link: &str) -> Result<Option<Article>> {
        let link = link.to_string();
        let article = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, description, content, link, image_url, published_at,
                            platform_domain, locale, category, author, guid
                     FROM articles WHERE link = ?1",
                )?;
                let article = stmt
                    .query_row(params![link], |row| Ok(article_from_row(row)))
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Insert a new article. Returns `None` when the link already exists —
    /// the UNIQUE constraint is the final dedup backstop across concurrently
    /// processed feeds, and losing that race is expected and benign.
    pub async fn insert_article(&self, article: NewArticle) -> Result<Option<Article>> {
        let data = article.clone();
        let id = self
            .conn
            .call(move |conn| {
                let result = conn.execute(
                    r#"INSERT INTO articles (title, description, content, link, image_url,
                                             published_at, platform_domain, locale, category, author, guid)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
                    params![
                        article.title,
                        article.description,
                        article.content,
                        article.link,
                        article.image_url,
                        article.published_at.to_rfc3339(),
                        article.platform_domain,
                        article.locale.as_str(),
                        article.category,
                        article.author,
                        article.guid,
                    ],
                );
                match result {
                    Ok(_) => Ok(Some(conn.last_insert_rowid())),
                    Err(rusqlite::Error::SqliteFailure(err, _))
                        if err.code == ErrorCode::ConstraintViolation =>
                    {
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        Ok(id.map(|id| Article {
            id,
            title: data.title,
            description: data.description,
            content: data.content,
            link: data.link,
            image_url: data.image_url,
            published_at: data.published_at,
            platform_domain: data.platform_domain,
            locale: data.locale,
            category: data.category,
            author: data.author,
            guid: data.guid,
        }))
    }

    pub async fn count_articles(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    // Platform operations

    pub async fn find_platform(&self, domain: &str) -> Result<Option<Platform>> {
        let domain = domain.to_string();
        let platform = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT domain, name, description, avatar_url, website_url, is_verified, locale
                     FROM platforms WHERE domain = ?1",
                )?;
                let platform = stmt
                    .query_row(params![domain], |row| Ok(platform_from_row(row)))
                    .optional()?;
                Ok(platform)
            })
            .await?;
        Ok(platform)
    }

    /// Insert a platform row. Returns `None` when the domain already exists,
    /// which happens when two feeds discover the same new domain in the same
    /// run; the caller should re-fetch the winning row.
    pub async fn insert_platform(&self, platform: Platform) -> Result<Option<Platform>> {
        let data = platform.clone();
        let inserted = self
            .conn
            .call(move |conn| {
                let result = conn.execute(
                    r#"INSERT INTO platforms (domain, name, description, avatar_url,
                                              website_url, is_verified, locale)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    params![
                        platform.domain,
                        platform.name,
                        platform.description,
                        platform.avatar_url,
                        platform.website_url,
                        platform.is_verified,
                        platform.locale.as_str(),
                    ],
                );
                match result {
                    Ok(_) => Ok(true),
                    Err(rusqlite::Error::SqliteFailure(err, _))
                        if err.code == ErrorCode::ConstraintViolation =>
                    {
                        Ok(false)
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        Ok(if inserted { Some(data) } else { None })
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn article_from_row(row: &Row) -> Article {
    Article {
        id: row.get(0).unwrap(),
        title: row.get(1).unwrap(),
        description: row.get(2).unwrap(),
        content: row.get(3).unwrap(),
        link: row.get(4).unwrap(),
        image_url: row.get(5).unwrap(),
        published_at: row
            .get::<_, String>(6)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        platform_domain: row.get(7).unwrap(),
        locale: row
            .get::<_, String>(8)
            .unwrap()
            .parse()
            .unwrap_or(Locale::TR),
        category: row.get(9).unwrap(),
        author: row.get(10).unwrap(),
        guid: row.get(11).unwrap(),
    }
}

fn platform_from_row(row: &Row) -> Platform {
    Platform {
        domain: row.get(0).unwrap(),
        name: row.get(1).unwrap(),
        description: row.get(2).unwrap(),
        avatar_url: row.get(3).unwrap(),
        website_url: row.get(4).unwrap(),
        is_verified: row.get::<_, i64>(5).unwrap() != 0,
        locale: row
            .get::<_, String>(6)
            .unwrap()
            .parse()
            .unwrap_or(Locale::TR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_repo() -> (Repository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let repo = Repository::new(path.to_str().unwrap()).await.unwrap();
        (repo, dir)
    }

    fn sample_article(link: &str) -> NewArticle {
        NewArticle {
            title: "Başlık".into(),
            description: Some("Açıklama".into()),
            content: None,
            link: link.into(),
            image_url: None,
            published_at: Utc.with_ymd_and_hms(2021, 9, 6, 13, 45, 0).unwrap(),
            platform_domain: "example.com.tr".into(),
            locale: Locale::TR,
            category: Some("Gündem".into()),
            author: None,
            guid: link.into(),
        }
    }

    fn sample_platform(domain: &str) -> Platform {
        Platform {
            domain: domain.into(),
            name: "Example Haber".into(),
            description: "Güncel haberler".into(),
            avatar_url: None,
            website_url: format!("https://{domain}"),
            is_verified: true,
            locale: Locale::TR,
        }
    }

    #[tokio::test]
    async fn article_round_trip() {
        let (repo, _dir) = test_repo().await;
        let link = "https://example.com.tr/haber/1";

        let created = repo.insert_article(sample_article(link)).await.unwrap();
        assert!(created.is_some());

        let found = repo.find_article_by_link(link).await.unwrap().unwrap();
        assert_eq!(found.title, "Başlık");
        assert_eq!(found.locale, Locale::TR);
        assert_eq!(
            found.published_at,
            Utc.with_ymd_and_hms(2021, 9, 6, 13, 45, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn duplicate_link_is_swallowed() {
        let (repo, _dir) = test_repo().await;
        let link = "https://example.com.tr/haber/1";

        assert!(repo.insert_article(sample_article(link)).await.unwrap().is_some());
        // Second insert with the same link loses against the UNIQUE constraint
        assert!(repo.insert_article(sample_article(link)).await.unwrap().is_none());
        assert_eq!(repo.count_articles().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_article_is_none() {
        let (repo, _dir) = test_repo().await;
        assert!(repo
            .find_article_by_link("https://nowhere.example/1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn platform_round_trip_and_duplicate() {
        let (repo, _dir) = test_repo().await;

        let inserted = repo.insert_platform(sample_platform("example.com.tr")).await.unwrap();
        assert!(inserted.is_some());

        let found = repo.find_platform("example.com.tr").await.unwrap().unwrap();
        assert_eq!(found.name, "Example Haber");
        assert!(found.is_verified);

        // A second creation attempt signals "already exists"
        let again = repo.insert_platform(sample_platform("example.com.tr")).await.unwrap();
        assert!(again.is_none());
    }
}
