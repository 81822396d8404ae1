//! Canonical request form for Signature V4.
//!
//! A [`Url`] stores its path and query percent-encoded. Each component is
//! decoded and encoded again with the unreserved set, so a key is never
//! encoded twice.

use super::sha256_hex;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use url::Url;

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn reencode(component: &str) -> String {
    let decoded = percent_decode_str(component).decode_utf8_lossy();
    utf8_percent_encode(&decoded, UNRESERVED).to_string()
}

/// Whether a header takes part in the signature.
///
/// `content-length` is left out: streamed bodies may not carry it.
pub fn is_signed_header(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "host"
        || name.starts_with("x-amz-")
        || matches!(name.as_str(), "content-type" | "content-md5" | "range")
}

/// Path with every segment re-encoded. Empty segments survive, since keys
/// may contain consecutive slashes.
fn canonical_path(path: &str) -> String {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    let segments: Vec<String> = trimmed.split('/').map(reencode).collect();
    format!("/{}", segments.join("/"))
}

/// Query pairs re-encoded and sorted by name, then value. A bare
/// sub-resource such as `uploads` becomes `uploads=`.
fn canonical_query(query: &str) -> String {
    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (reencode(name), reencode(value))
        })
        .collect();
    pairs.sort();

    pairs
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&")
}

fn canonical_headers(headers: &HashMap<String, String>) -> BTreeMap<String, String> {
    let mut canonical: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers.iter().filter(|(name, _)| is_signed_header(name)) {
        let value = value.split_whitespace().collect::<Vec<_>>().join(" ");
        canonical
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    canonical
}

/// A request reduced to the form the signature is computed over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    method: String,
    path: String,
    query: String,
    headers: BTreeMap<String, String>,
    payload_hash: String,
}

impl CanonicalRequest {
    /// Canonicalize a request. Headers that are not signed are ignored.
    pub fn new(
        method: &str,
        url: &Url,
        headers: &HashMap<String, String>,
        payload_hash: &str,
    ) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: canonical_path(url.path()),
            query: canonical_query(url.query().unwrap_or("")),
            headers: canonical_headers(headers),
            payload_hash: payload_hash.to_string(),
        }
    }

    /// Signed header names, sorted and `;`-separated.
    pub fn signed_headers(&self) -> String {
        self.headers
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Hex SHA-256 of the canonical text.
    pub fn digest(&self) -> String {
        sha256_hex(self.to_string().as_bytes())
    }
}

impl fmt::Display for CanonicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.method)?;
        writeln!(f, "{}", self.path)?;
        writeln!(f, "{}", self.query)?;
        for (name, value) in &self.headers {
            writeln!(f, "{}:{}", name, value)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.signed_headers())?;
        f.write_str(&self.payload_hash)
    }
}
