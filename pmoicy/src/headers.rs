//! ICY request/response headers.

use std::num::NonZeroUsize;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::{Error, Result};
use crate::metadata::decode_text;

/// Request header asking the server to interleave metadata (`1` = yes)
pub const ICY_METADATA: &str = "icy-metadata";

/// Response header giving the metadata interval in bytes
pub const ICY_METAINT: &str = "icy-metaint";

pub const ICY_NAME: &str = "icy-name";
pub const ICY_GENRE: &str = "icy-genre";
pub const ICY_DESCRIPTION: &str = "icy-description";
pub const ICY_URL: &str = "icy-url";
pub const ICY_BITRATE: &str = "icy-br";
pub const ICY_PUBLIC: &str = "icy-pub";

/// Largest accepted `icy-metaint` (1 MiB). Servers use 8192 to 65536; the
/// decoder allocates one interval up front.
pub const MAX_METAINT: usize = 1 << 20;

/// Parse an `icy-metaint` value.
///
/// The value must be a positive decimal integer no larger than
/// [`MAX_METAINT`] (surrounding whitespace is tolerated). Zero, negative,
/// oversized and non-numeric values are rejected.
pub fn parse_metaint(value: &str) -> Result<NonZeroUsize> {
    value
        .trim()
        .parse::<NonZeroUsize>()
        .ok()
        .filter(|interval| interval.get() <= MAX_METAINT)
        .ok_or_else(|| Error::invalid_metaint(value))
}

/// Read the metadata interval announced in `headers`, if any.
pub fn metaint_from_headers(headers: &HeaderMap) -> Result<Option<NonZeroUsize>> {
    let Some(value) = headers.get(ICY_METAINT) else {
        return Ok(None);
    };
    let text = value
        .to_str()
        .map_err(|_| Error::invalid_metaint(decode_text(value.as_bytes())))?;
    parse_metaint(text).map(Some)
}

/// Station information sent by Icecast/Shoutcast servers in `icy-*` headers.
///
/// Every field is optional and parsed leniently: an unreadable value is
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcyHeaders {
    pub name: Option<String>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    /// Nominal bitrate in kbit/s
    pub bitrate: Option<u32>,
    /// Whether the station is listed in a public directory
    pub public: Option<bool>,
    /// Metadata interval, when announced and valid
    pub metaint: Option<NonZeroUsize>,
}

impl IcyHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            name: text_header(headers, ICY_NAME),
            genre: text_header(headers, ICY_GENRE),
            description: text_header(headers, ICY_DESCRIPTION),
            url: text_header(headers, ICY_URL),
            // some servers send "128,128" for icy-br
            bitrate: text_header(headers, ICY_BITRATE)
                .and_then(|v| v.split(',').next().and_then(|b| b.trim().parse().ok())),
            public: text_header(headers, ICY_PUBLIC).and_then(|v| match v.trim() {
                "1" => Some(true),
                "0" => Some(false),
                _ => None,
            }),
            metaint: metaint_from_headers(headers).ok().flatten(),
        }
    }

    /// True when the server sent none of the `icy-*` headers
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn text_header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(HeaderValue::as_bytes)
        .map(decode_text)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
