use chrono::{DateTime, Utc};
use feed_rs::model::Entry;

/// Text as produced by XML-to-object feed tooling. Upstream representations
/// vary between a plain string, a CDATA-wrapped object and an array of rich
/// text runs; all call sites go through [`TextNode::coerce`] instead of
/// shape-sniffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextNode {
    Plain(String),
    Wrapped(String),
    Runs(Vec<String>),
}

impl TextNode {
    /// Collapse to a plain string. Empty text counts as absent.
    pub fn coerce(&self) -> Option<String> {
        let text = match self {
            TextNode::Plain(s) | TextNode::Wrapped(s) => s.as_str(),
            TextNode::Runs(runs) => runs.first().map(String::as_str).unwrap_or(""),
        };
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// A media reference carried by an entry (enclosure, media:content or
/// media:thumbnail).
#[derive(Debug, Clone)]
pub struct MediaRef {
    pub url: String,
    pub mime_type: Option<String>,
}

impl MediaRef {
    pub fn is_image(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|t| t.starts_with("image/"))
    }
}

/// One item of a parsed feed, before field extraction. Transient: never
/// persisted directly.
#[derive(Debug, Clone, Default)]
pub struct FeedEntry {
    pub guid: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub title: Option<TextNode>,
    pub summary: Option<TextNode>,
    pub content: Option<TextNode>,
    pub author: Option<TextNode>,
    pub categories: Vec<TextNode>,
    pub enclosure: Option<MediaRef>,
    pub media_content: Vec<MediaRef>,
    pub media_thumbnails: Vec<MediaRef>,
}

fn text_node(text: feed_rs::model::Text) -> TextNode {
    if text.content_type.essence().to_string() == "text/html" {
        TextNode::Wrapped(text.content)
    } else {
        TextNode::Plain(text.content)
    }
}

impl FeedEntry {
    pub fn from_parsed(entry: Entry) -> Self {
        let guid = if entry.id.is_empty() {
            None
        } else {
            Some(entry.id)
        };

        let link = entry
            .links
            .iter()
            .find(|l| {
                let rel = l.rel.as_deref().unwrap_or("");
                (rel.is_empty() || rel.eq_ignore_ascii_case("alternate"))
                    && !l.href.trim().is_empty()
            })
            .or_else(|| entry.links.iter().find(|l| !l.href.trim().is_empty()))
            .map(|l| l.href.trim().to_string());

        // Atom advertises enclosures as links; feed-rs surfaces an RSS
        // <enclosure> as the out-of-line src of the entry content.
        let mut enclosure = entry
            .links
            .iter()
            .find(|l| {
                l.rel
                    .as_deref()
                    .is_some_and(|r| r.eq_ignore_ascii_case("enclosure"))
            })
            .map(|l| MediaRef {
                url: l.href.clone(),
                mime_type: l.media_type.clone(),
            });
        if enclosure.is_none() {
            if let Some(content) = &entry.content {
                if let Some(src) = &content.src {
                    enclosure = Some(MediaRef {
                        url: src.href.clone(),
                        mime_type: Some(content.content_type.to_string()),
                    });
                }
            }
        }

        let mut media_content = Vec::new();
        let mut media_thumbnails = Vec::new();
        for media in entry.media {
            for content in media.content {
                if let Some(url) = content.url {
                    media_content.push(MediaRef {
                        url: url.to_string(),
                        mime_type: content.content_type.as_ref().map(|m| m.to_string()),
                    });
                }
            }
            for thumbnail in media.thumbnails {
                media_thumbnails.push(MediaRef {
                    url: thumbnail.image.uri,
                    mime_type: None,
                });
            }
        }

        FeedEntry {
            guid,
            link,
            published: entry.published.or(entry.updated),
            title: entry.title.map(text_node),
            summary: entry.summary.map(text_node),
            content: entry.content.and_then(|c| {
                let body = c.body?;
                Some(if c.content_type.essence().to_string() == "text/html" {
                    TextNode::Wrapped(body)
                } else {
                    TextNode::Plain(body)
                })
            }),
            author: entry
                .authors
                .first()
                .filter(|a| !a.name.trim().is_empty())
                .map(|a| TextNode::Plain(a.name.clone())),
            categories: entry
                .categories
                .into_iter()
                .map(|c| TextNode::Plain(c.label.unwrap_or(c.term)))
                .collect(),
            enclosure,
            media_content,
            media_thumbnails,
        }
    }
}
