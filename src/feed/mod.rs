pub mod entry;
pub mod extract;
pub mod fetcher;
pub mod parser;
pub mod sanitize;

pub use entry::{FeedEntry, MediaRef, TextNode};
pub use extract::{extract_fields, ExtractedFields};
pub use fetcher::{FeedFetcher, RawFetch};
pub use parser::parse_entries;
pub use sanitize::sanitize_xml;
