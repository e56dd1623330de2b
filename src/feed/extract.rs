use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use super::entry::{FeedEntry, TextNode};

/// Title used when an entry carries no usable title text.
pub const FALLBACK_TITLE: &str = "(no title)";

/// Canonical article fields derived from one feed entry.
#[derive(Debug, Clone)]
pub struct ExtractedFields {
    pub guid: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

fn img_src_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)<img[^>]*src=["']([^"']+)["'][^>]*>"#).unwrap())
}

fn dec_entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&#(\d+);").unwrap())
}

fn hex_entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&#x([0-9a-fA-F]+);").unwrap())
}

/// Decode the safe named entities plus numeric character references. Feeds
/// routinely double-encode titles and summaries; anything outside this set is
/// left alone.
pub fn decode_html_entities(text: &str) -> String {
    let text = text
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ");

    let text = dec_entity_re().replace_all(&text, |caps: &regex::Captures| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    hex_entity_re()
        .replace_all(&text, |caps: &regex::Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Normalize an image/link URL: protocol-relative and plain-http URLs are
/// upgraded to https. Root-relative paths are returned unchanged since no
/// base host is known at this point.
pub fn normalize_url(url: &str) -> String {
    if let Some(rest) = url.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if let Some(rest) = url.strip_prefix("http://") {
        return format!("https://{rest}");
    }
    url.to_string()
}

fn coerce_decoded(node: Option<&TextNode>) -> Option<String> {
    node.and_then(TextNode::coerce)
        .map(|s| decode_html_entities(&s))
}

fn first_img_src(html: &str) -> Option<String> {
    img_src_re()
        .captures(html)
        .map(|caps| normalize_url(&caps[1]))
}

/// Pick the entry image. Priority: image-typed enclosure, image-typed first
/// media:content, any media:thumbnail, first <img> inside the content body,
/// first <img> inside the summary.
fn extract_image(entry: &FeedEntry) -> Option<String> {
    if let Some(enclosure) = &entry.enclosure {
        if enclosure.is_image() {
            return Some(normalize_url(&enclosure.url));
        }
    }
    // Only the first media:content element counts; when it is not an image
    // the chain moves on to thumbnails rather than scanning the rest.
    if let Some(media) = entry.media_content.first().filter(|m| m.is_image()) {
        return Some(normalize_url(&media.url));
    }
    if let Some(thumb) = entry.media_thumbnails.first() {
        return Some(normalize_url(&thumb.url));
    }
    if let Some(content) = entry.content.as_ref().and_then(TextNode::coerce) {
        if let Some(src) = first_img_src(&content) {
            return Some(src);
        }
    }
    if let Some(summary) = entry.summary.as_ref().and_then(TextNode::coerce) {
        if let Some(src) = first_img_src(&summary) {
            return Some(src);
        }
    }
    None
}

/// Derive canonical article fields from one entry. Returns `None` for
/// entries missing a link (and therefore an identity); such entries are
/// skipped, not errors.
pub fn extract_fields(entry: &FeedEntry) -> Option<ExtractedFields> {
    let Some(link) = entry.link.clone() else {
        debug!(title = ?entry.title, "entry has no link, skipping");
        return None;
    };

    // The link doubles as identity when the feed omits guid/id.
    let guid = entry.guid.clone().unwrap_or_else(|| link.clone());

    // Missing or unparseable dates fall back to ingestion time so that
    // chronological feeds stay sortable.
    let published_at = entry.published.unwrap_or_else(Utc::now);

    let title = coerce_decoded(entry.title.as_ref()).unwrap_or_else(|| FALLBACK_TITLE.to_string());
    let description = coerce_decoded(entry.summary.as_ref());
    let content = coerce_decoded(entry.content.as_ref());
    let author = coerce_decoded(entry.author.as_ref());
    let category = entry.categories.first().and_then(TextNode::coerce);
    let image_url = extract_image(entry);

    Some(ExtractedFields {
        guid,
        link,
        published_at,
        title,
        description,
        content,
        author,
        category,
        image_url,
    })
}
