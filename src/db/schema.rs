pub const SCHEMA: &str = r#"
-- platforms table
CREATE TABLE IF NOT EXISTS platforms (
    domain TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    avatar_url TEXT,
    website_url TEXT NOT NULL,
    is_verified INTEGER NOT NULL DEFAULT 0,
    locale TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- articles table
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT,
    content TEXT,
    link TEXT NOT NULL UNIQUE,
    image_url TEXT,
    published_at TEXT NOT NULL,
    platform_domain TEXT NOT NULL REFERENCES platforms(domain),
    locale TEXT NOT NULL,
    category TEXT,
    author TEXT,
    guid TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_articles_platform ON articles(platform_domain);
CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at DESC);
CREATE INDEX IF NOT EXISTS idx_articles_guid ON articles(guid);
"#;
