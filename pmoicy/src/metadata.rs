//! ICY metadata blocks and their parsed form.
//!
//! A metadata block is the text carried after each length byte of an
//! interleaved stream, e.g. `StreamTitle='Artist - Title';StreamUrl='';`
//! followed by zero padding up to a multiple of 16 bytes.

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::{self, HashMap};
use std::sync::OnceLock;

/// Key used by servers for the "now playing" line
pub const STREAM_TITLE: &str = "StreamTitle";

/// Key used by servers for an associated URL (often a cover or homepage)
pub const STREAM_URL: &str = "StreamUrl";

/// Largest block a single length byte can announce (255 × 16 bytes)
pub const MAX_METADATA_LEN: usize = 255 * 16;

/// One parsed metadata block.
///
/// Keys are unique; when a block repeats a key the last value wins.
/// Serializes as a flat map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IcyMetadata {
    fields: HashMap<String, String>,
}

impl IcyMetadata {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// `StreamTitle` value, usually `Artist - Title`
    pub fn stream_title(&self) -> Option<&str> {
        self.get(STREAM_TITLE)
    }

    /// `StreamUrl` value
    pub fn stream_url(&self) -> Option<&str> {
        self.get(STREAM_URL)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over `(key, value)` pairs in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Consume the snapshot and return the underlying map
    pub fn into_inner(self) -> HashMap<String, String> {
        self.fields
    }
}

impl From<HashMap<String, String>> for IcyMetadata {
    fn from(fields: HashMap<String, String>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for IcyMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for IcyMetadata {
    type Item = (String, String);
    type IntoIter = hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

fn pair_regex() -> &'static Regex {
    static PAIR: OnceLock<Regex> = OnceLock::new();
    // key: anything but '=' ; value: shortest run up to the first "';"
    PAIR.get_or_init(|| {
        Regex::new(r"(?s-u)([^=]+)='(.*?)';").expect("static ICY metadata pattern is valid")
    })
}

/// Decode header/metadata text: UTF-8 when valid, Latin-1 otherwise.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_owned(),
        Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}

/// Parse a raw metadata block into a snapshot.
///
/// Every `key='value';` occurrence contributes one pair. Anything that does
/// not match (typically the trailing NUL padding) is ignored, so this never
/// fails: an unreadable block yields an empty snapshot.
pub fn parse_metadata_block(block: &[u8]) -> IcyMetadata {
    let mut fields = HashMap::new();

    for caps in pair_regex().captures_iter(block) {
        let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        fields.insert(decode_text(key.as_bytes()), decode_text(value.as_bytes()));
    }

    IcyMetadata { fields }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(text: &str) -> Vec<u8> {
        let mut block = text.as_bytes().to_vec();
        block.resize(text.len().div_ceil(16) * 16, 0);
        block
    }

    #[test]
    fn test_parse_title_and_url() {
        let meta = parse_metadata_block(&padded(
            "StreamTitle='Miles Davis - So What';StreamUrl='http://example.com/cover.jpg';",
        ));

        assert_eq!(meta.len(), 2);
        assert_eq!(meta.stream_title(), Some("Miles Davis - So What"));
        assert_eq!(meta.stream_url(), Some("http://example.com/cover.jpg"));
    }

    #[test]
    fn test_pair_order_is_irrelevant() {
        let a = parse_metadata_block(b"a='1';b='2';c='3';");
        let b = parse_metadata_block(b"c='3';a='1';b='2';");

        let expected: IcyMetadata = [("a", "1"), ("b", "2"), ("c", "3")].into_iter().collect();
        assert_eq!(a, expected);
        assert_eq!(b, expected);
    }

    #[test]
    fn test_duplicate_key_keeps_last_value() {
        let meta = parse_metadata_block(b"StreamTitle='first';StreamTitle='second';");
        assert_eq!(meta.len(), 1);
        assert_eq!(meta.stream_title(), Some("second"));
    }

    #[test]
    fn test_padding_and_garbage_are_ignored() {
        let mut block = padded("title='x';");
        block.extend_from_slice(b"junk without terminator");
        block.extend_from_slice(&[0; 9]);

        let meta = parse_metadata_block(&block);
        assert_eq!(meta.len(), 1);
        assert_eq!(meta.get("title"), Some("x"));
    }

    #[test]
    fn test_all_padding_gives_empty_snapshot() {
        assert!(parse_metadata_block(&[0; 32]).is_empty());
        assert!(parse_metadata_block(b"").is_empty());
    }

    #[test]
    fn test_apostrophe_inside_value() {
        let meta = parse_metadata_block(b"StreamTitle='Guns N' Roses - Don't Cry';StreamUrl='';");
        assert_eq!(meta.stream_title(), Some("Guns N' Roses - Don't Cry"));
        assert_eq!(meta.stream_url(), Some(""));
    }

    #[test]
    fn test_value_ends_at_first_terminator_only() {
        // a bare apostrophe not followed by ';' belongs to the value
        let meta = parse_metadata_block(b"a='x'b';c='';");
        assert_eq!(meta.get("a"), Some("x'b"));
        assert_eq!(meta.get("c"), Some(""));

        // the first "';" ends the value even if another one follows
        let meta = parse_metadata_block(b"a='x';b';");
        assert_eq!(meta.get("a"), Some("x"));
        assert_eq!(meta.len(), 1);
    }

    #[test]
    fn test_latin1_fallback() {
        // "Café" with é as a single Latin-1 byte
        let meta = parse_metadata_block(b"StreamTitle='Caf\xe9';");
        assert_eq!(meta.stream_title(), Some("Café"));

        let utf8 = parse_metadata_block("StreamTitle='Café';".as_bytes());
        assert_eq!(utf8.stream_title(), Some("Café"));
    }

    #[test]
    fn test_serializes_as_flat_map() {
        let meta: IcyMetadata = [("StreamTitle", "x")].into_iter().collect();
        let yaml = serde_yaml::to_string(&meta).unwrap();
        assert_eq!(yaml.trim(), "StreamTitle: x");
    }
}
