use std::sync::OnceLock;

use regex::Regex;

/// Matches an ampersand optionally followed by a complete entity reference
/// (named, decimal or hex). A bare `&` leaves the capture group empty.
fn amp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(#\d+;|#x[0-9a-fA-F]+;|[A-Za-z][A-Za-z0-9]+;)?").unwrap()
    })
}

/// Repair common feed XML defects before handing the document to the parser:
/// byte-order marks embedded in the text and unescaped ampersands, both of
/// which break strict XML parsing. Idempotent.
pub fn sanitize_xml(text: &str) -> String {
    let without_bom = text.replace('\u{FEFF}', "");
    amp_re()
        .replace_all(&without_bom, |caps: &regex::Captures| {
            match caps.get(1) {
                // Already a well-formed entity reference, keep as-is.
                Some(entity) => format!("&{}", entity.as_str()),
                None => "&amp;".to_string(),
            }
        })
        .into_owned()
}
