use feed_rs::parser;

use crate::error::FeedError;

use super::entry::FeedEntry;

/// Parse sanitized feed XML into entries. Parsing failures are fatal for the
/// whole feed; there is no per-entry recovery below the syndication parser.
pub fn parse_entries(xml: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let feed = parser::parse(xml.as_bytes())?;
    Ok(feed.entries.into_iter().map(FeedEntry::from_parsed).collect())
}
