use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;

use crate::db::Repository;
use crate::error::Result;
use crate::feed::extract::{decode_html_entities, normalize_url};
use crate::feed::FeedFetcher;
use crate::models::{Locale, Platform};

/// Known major outlets. Any hostname containing the left-hand side maps to
/// the canonical domain on the right, so `rss.cnnturk.com` and
/// `www.cnnturk.com` both resolve to `cnnturk.com`.
const DOMAIN_ALIASES: &[(&str, &str)] = &[
    ("haberturk.com", "haberturk.com"),
    ("cnnturk.com", "cnnturk.com"),
    ("hurriyet.com.tr", "hurriyet.com.tr"),
    ("sabah.com.tr", "sabah.com.tr"),
    ("sozcu.com.tr", "sozcu.com.tr"),
    ("cumhuriyet.com.tr", "cumhuriyet.com.tr"),
    ("t24.com.tr", "t24.com.tr"),
    ("ahaber.com.tr", "ahaber.com.tr"),
    ("haberglobal.com.tr", "haberglobal.com.tr"),
    ("trthaber.com", "trthaber.com"),
    ("bianet.org", "bianet.org"),
    ("bbci.co.uk", "bbci.co.uk"),
    ("dw.com", "dw.com"),
    ("aa.com.tr", "aa.com.tr"),
    ("ntv.com.tr", "ntv.com.tr"),
    ("birgun.net", "birgun.net"),
    ("karar.com", "karar.com"),
    ("yenisafak.com", "yenisafak.com"),
    ("milliyet.com.tr", "milliyet.com.tr"),
    ("internethaber.com", "internethaber.com"),
    ("memurlar.net", "memurlar.net"),
    ("theguardian.com", "theguardian.com"),
    ("reuters.com", "reuters.com"),
    ("aljazeera.com", "aljazeera.com"),
    ("npr.org", "npr.org"),
    ("sky.com", "sky.com"),
    ("euronews.com", "euronews.com"),
    ("france24.com", "france24.com"),
    ("globalnews.ca", "globalnews.ca"),
    ("nbcnews.com", "nbcnews.com"),
    ("cbsnews.com", "cbsnews.com"),
    ("time.com", "time.com"),
    ("foxnews.com", "foxnews.com"),
    ("abcnews.go.com", "abcnews.go.com"),
    ("politico.com", "politico.com"),
];

/// Two-part public suffixes where the canonical domain keeps three labels.
const CC_SLDS: &[&str] = &["co.uk", "com.au", "co.za", "co.in", "co.jp"];

/// Meta tags scraped from a platform homepage.
#[derive(Debug, Default, Clone)]
pub struct SiteMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
}

/// Map a feed URL to the canonical platform domain. Strips `www.`, consults
/// the alias table, then keeps three labels for Turkish `.com.tr`-style and
/// ccSLD suffixes and two labels otherwise.
pub fn extract_domain(url: &str, aliases: &[(&str, &str)]) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let hostname = parsed.host_str()?;
    let hostname = hostname.strip_prefix("www.").unwrap_or(hostname);

    for (key, canonical) in aliases {
        if hostname.contains(key) {
            return Some(canonical.to_string());
        }
    }

    let parts: Vec<&str> = hostname.split('.').collect();
    if parts.len() < 2 {
        return Some(hostname.to_string());
    }

    if hostname.ends_with(".org.tr") || hostname.ends_with(".com.tr") || hostname.ends_with(".net.tr")
    {
        if parts.len() >= 3 {
            return Some(parts[parts.len() - 3..].join("."));
        }
        return Some(hostname.to_string());
    }

    let last_two = parts[parts.len() - 2..].join(".");
    if CC_SLDS.contains(&last_two.as_str()) {
        if parts.len() >= 3 {
            return Some(parts[parts.len() - 3..].join("."));
        }
        return Some(hostname.to_string());
    }

    Some(last_two)
}

macro_rules! meta_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).unwrap())
        }
    };
}

meta_regex!(title_re, r"(?i)<title[^>]*>([^<]+)</title>");
meta_regex!(
    desc_re,
    r#"(?i)<meta[^>]*name=["']description["'][^>]*content=["']([^"']+)["']"#
);
meta_regex!(
    og_desc_re,
    r#"(?i)<meta[^>]*property=["']og:description["'][^>]*content=["']([^"']+)["']"#
);
meta_regex!(
    og_image_re,
    r#"(?i)<meta[^>]*property=["']og:image["'][^>]*content=["']([^"']+)["']"#
);
meta_regex!(
    twitter_image_re,
    r#"(?i)<meta[^>]*name=["']twitter:image["'][^>]*content=["']([^"']+)["']"#
);
meta_regex!(
    app_name_re,
    r#"(?i)<meta[^>]*name=["']application-name["'][^>]*content=["']([^"']+)["']"#
);
meta_regex!(
    og_site_name_re,
    r#"(?i)<meta[^>]*property=["']og:site_name["'][^>]*content=["']([^"']+)["']"#
);

fn capture_text(re: &Regex, html: &str) -> Option<String> {
    re.captures(html)
        .map(|caps| decode_html_entities(caps[1].trim()))
        .filter(|s| !s.is_empty())
}

/// Extract the homepage meta tags a platform record is built from.
pub fn parse_site_meta(html: &str) -> SiteMeta {
    SiteMeta {
        title: capture_text(title_re(), html),
        description: capture_text(desc_re(), html).or_else(|| capture_text(og_desc_re(), html)),
        image: capture_text(og_image_re(), html)
            .or_else(|| capture_text(twitter_image_re(), html))
            .map(|u| normalize_url(&u)),
        site_name: capture_text(app_name_re(), html)
            .or_else(|| capture_text(og_site_name_re(), html)),
    }
}

/// Display name precedence: declared site name, then the page title cleaned
/// of taglines, then the first domain label.
pub fn determine_platform_name(meta: &SiteMeta, domain: &str) -> String {
    if let Some(site_name) = &meta.site_name {
        return site_name.clone();
    }

    if let Some(title) = &meta.title {
        let cut = title
            .char_indices()
            .find(|(_, c)| matches!(c, '-' | '|' | '–' | '—' | ':'))
            .map(|(i, _)| i)
            .unwrap_or(title.len());
        let cleaned: String = title[..cut].trim().chars().take(50).collect();
        let cleaned = cleaned.trim();
        if !cleaned.is_empty() {
            return cleaned.to_string();
        }
    }

    domain.split('.').next().unwrap_or(domain).to_string()
}

pub struct PlatformResolver {
    fetcher: FeedFetcher,
    aliases: &'static [(&'static str, &'static str)],
    scrape_base: Option<String>,
}

impl PlatformResolver {
    pub fn new(scrape_timeout: Duration) -> Self {
        Self {
            fetcher: FeedFetcher::new(scrape_timeout),
            aliases: DOMAIN_ALIASES,
            scrape_base: None,
        }
    }

    /// Route homepage scrapes to `{base}/{domain}` instead of the domains
    /// themselves, for use against a local fixture server.
    pub fn with_scrape_base(mut self, base: impl Into<String>) -> Self {
        self.scrape_base = Some(base.into());
        self
    }

    pub fn domain_for(&self, feed_url: &str) -> Option<String> {
        extract_domain(feed_url, self.aliases)
    }

    /// Look up the platform for `domain`, creating it from scraped homepage
    /// metadata on first encounter. Cached rows are returned as-is with no
    /// re-scrape. Returns `Ok(None)` when the scrape fails or yields no
    /// description — the caller must drop the feed's entries for this run;
    /// the domain is retried on a later run.
    pub async fn ensure_platform(
        &self,
        repo: &Repository,
        domain: &str,
        locale: Locale,
    ) -> Result<Option<Platform>> {
        if let Some(existing) = repo.find_platform(domain).await? {
            return Ok(Some(existing));
        }

        let website_url = format!("https://{domain}");
        let scrape_url = match &self.scrape_base {
            Some(base) => format!("{base}/{domain}"),
            None => website_url.clone(),
        };
        let meta = match self.fetcher.fetch_decoded(&scrape_url).await {
            Ok(fetched) => parse_site_meta(&fetched.text),
            Err(e) => {
                warn!(domain, error = %e, "platform homepage scrape failed");
                return Ok(None);
            }
        };

        let Some(description) = meta.description.clone() else {
            info!(domain, "no meta description, platform not created");
            return Ok(None);
        };

        let platform = Platform {
            domain: domain.to_string(),
            name: determine_platform_name(&meta, domain),
            description,
            avatar_url: meta.image,
            website_url,
            is_verified: true,
            locale,
        };

        match repo.insert_platform(platform).await? {
            Some(created) => {
                info!(domain, name = %created.name, "new platform created");
                Ok(Some(created))
            }
            None => {
                // Another worker created the row between lookup and insert
                debug!(domain, "platform insert raced, using existing row");
                repo.find_platform(domain).await
            }
        }
    }
}
