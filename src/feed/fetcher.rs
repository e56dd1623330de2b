use std::sync::OnceLock;
use std::time::Duration;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;

use crate::error::FeedError;

const USER_AGENT_STRING: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const ACCEPT_STRING: &str = "application/rss+xml, application/xml, text/xml, text/html, */*";

/// A fetched document decoded to Unicode, along with what the decode was
/// based on.
#[derive(Debug)]
pub struct RawFetch {
    pub text: String,
    pub content_type: String,
    pub charset: String,
}

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT_STRING)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Fetch a URL and decode the body with the best available charset.
    /// Network, timeout and HTTP-status failures are the only error paths;
    /// decoding itself is always lossy-total.
    pub async fn fetch_decoded(&self, url: &str) -> Result<RawFetch, FeedError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, ACCEPT_STRING)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::Http(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let bytes = response.bytes().await?;
        let (text, charset) = decode_bytes(&bytes, &content_type);

        Ok(RawFetch {
            text,
            content_type,
            charset,
        })
    }
}

fn charset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)charset=([^;]+)").unwrap())
}

/// Pull the charset parameter out of a Content-Type header value.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    charset_re()
        .captures(content_type)
        .map(|caps| caps[1].trim().replace('"', "").to_lowercase())
}

/// Decode raw bytes. Charset priority: header `charset=` parameter, then
/// statistical detection, then UTF-8. Label aliases (`utf8`, `latin5`, ...)
/// resolve through `encoding_rs`; an unknown label degrades to detection.
/// Returns the decoded text and the name of the charset actually used.
pub fn decode_bytes(bytes: &[u8], content_type: &str) -> (String, String) {
    let encoding = charset_from_content_type(content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or_else(|| detect_encoding(bytes));

    // encoding_rs substitutes U+FFFD for malformed sequences, so a wrongly
    // declared charset can degrade the text but never abort the fetch.
    let (text, used, _) = encoding.decode(bytes);
    (text.into_owned(), used.name().to_lowercase())
}

fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_is_read_from_header() {
        assert_eq!(
            charset_from_content_type("text/xml; charset=ISO-8859-9"),
            Some("iso-8859-9".to_string())
        );
        assert_eq!(
            charset_from_content_type(r#"application/rss+xml; charset="UTF-8""#),
            Some("utf-8".to_string())
        );
        assert_eq!(charset_from_content_type("text/xml"), None);
        assert_eq!(charset_from_content_type(""), None);
    }

    #[test]
    fn decodes_turkish_legacy_charset() {
        // "gündem şu" in windows-1254 / ISO-8859-9
        let bytes = b"g\xFCndem \xFEu";
        let (text, charset) = decode_bytes(bytes, "text/xml; charset=iso-8859-9");
        assert_eq!(text, "gündem şu");
        assert_eq!(charset, "windows-1254");
    }

    #[test]
    fn utf8_alias_is_normalized() {
        let (text, charset) = decode_bytes("başlık".as_bytes(), "text/xml; charset=utf8");
        assert_eq!(text, "başlık");
        assert_eq!(charset, "utf-8");
    }

    #[test]
    fn invalid_bytes_decode_lossily_instead_of_failing() {
        let bytes = b"ok \xFF\xFE broken";
        let (text, _) = decode_bytes(bytes, "text/xml; charset=utf-8");
        assert!(text.starts_with("ok "));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn detection_kicks_in_without_header_charset() {
        let (text, _) = decode_bytes("türkçe içerik".as_bytes(), "text/xml");
        assert_eq!(text, "türkçe içerik");
    }

    #[test]
    fn unknown_label_falls_back_to_detection() {
        let (text, _) = decode_bytes(b"plain ascii", "text/xml; charset=x-no-such-charset");
        assert_eq!(text, "plain ascii");
    }
}
