//! Endpoint selection and request URL construction.
//!
//! Which endpoint a call targets and how the bucket is placed in the URL are
//! independent: the endpoint is chosen first, then the addressing style is
//! applied to it.

use crate::error::ConfigurationError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Unreserved characters plus `/`; used for object keys.
const KEY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Unreserved characters only; used for query names and values.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// How the bucket name is placed in request URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressingStyle {
    /// `https://endpoint/bucket/key`
    #[default]
    Path,
    /// `https://bucket.endpoint/key`
    VirtualHosted,
}

/// Ordered set of base endpoints.
///
/// Each logical call takes the next endpoint in rotation and keeps it for all
/// of its retries; it moves on only when the endpoint proves unreachable.
pub struct EndpointSet {
    endpoints: Vec<Url>,
    cursor: AtomicUsize,
}

impl EndpointSet {
    /// Create an endpoint set. At least one endpoint is required.
    pub fn new(endpoints: Vec<Url>) -> Result<Self, ConfigurationError> {
        if endpoints.is_empty() {
            return Err(ConfigurationError::NoEndpoints);
        }
        for endpoint in &endpoints {
            validate_endpoint(endpoint)?;
        }
        Ok(Self {
            endpoints,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Number of endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Always false; an endpoint set is never empty.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// All endpoints in configured order.
    pub fn endpoints(&self) -> &[Url] {
        &self.endpoints
    }

    /// The endpoint at `index`.
    pub fn get(&self, index: usize) -> &Url {
        &self.endpoints[index % self.endpoints.len()]
    }

    /// Starting endpoint for a new logical call.
    pub fn start_index(&self) -> usize {
        self.cursor.fetch_add(1, Ordering::Relaxed) % self.endpoints.len()
    }

    /// Endpoint to fail over to after `index` proved unreachable.
    pub fn failover_index(&self, index: usize) -> usize {
        (index + 1) % self.endpoints.len()
    }
}

impl fmt::Debug for EndpointSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.endpoints.iter().map(Url::as_str))
            .finish()
    }
}

fn validate_endpoint(endpoint: &Url) -> Result<(), ConfigurationError> {
    let invalid = |details: &str| ConfigurationError::InvalidEndpoint {
        url: endpoint.to_string(),
        details: details.to_string(),
    };
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if endpoint.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    if endpoint.query().is_some() {
        return Err(invalid("endpoint must not carry a query string"));
    }
    Ok(())
}

/// Whether a bucket name can be used as a DNS label.
pub fn is_dns_compatible(bucket: &str) -> bool {
    let len_ok = (3..=63).contains(&bucket.len());
    let chars_ok = bucket
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    let edges_ok = bucket
        .bytes()
        .next()
        .map_or(false, |b| b.is_ascii_alphanumeric())
        && bucket
            .bytes()
            .last()
            .map_or(false, |b| b.is_ascii_alphanumeric());
    len_ok && chars_ok && edges_ok
}

/// Percent-encode an object key, keeping `/` separators.
pub fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_SET).to_string()
}

/// Percent-encode a query parameter name or value.
pub fn encode_query_component(value: &str) -> String {
    utf8_percent_encode(value, QUERY_SET).to_string()
}

/// Build a request URL against `base`.
///
/// Virtual-hosted addressing falls back to path style for buckets that are
/// not DNS-compatible and for endpoints addressed by IP.
pub fn build_url(
    base: &Url,
    style: AddressingStyle,
    bucket: Option<&str>,
    key: Option<&str>,
    query: &[(String, Option<String>)],
) -> Result<Url, ConfigurationError> {
    let host = base
        .host_str()
        .ok_or_else(|| ConfigurationError::InvalidEndpoint {
            url: base.to_string(),
            details: "missing host".to_string(),
        })?;
    let host_is_ip = host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>().is_ok();
    let base_path = base.path().trim_end_matches('/');

    let virtual_host = match (style, bucket) {
        (AddressingStyle::VirtualHosted, Some(b)) if is_dns_compatible(b) && !host_is_ip => {
            Some(b)
        }
        _ => None,
    };

    let mut authority = match virtual_host {
        Some(b) => format!("{}.{}", b, host),
        None => host.to_string(),
    };
    if let Some(port) = base.port() {
        authority.push_str(&format!(":{}", port));
    }

    let mut path = base_path.to_string();
    if virtual_host.is_none() {
        if let Some(b) = bucket {
            path.push('/');
            path.push_str(&encode_key(b));
        }
    }
    match key {
        Some(k) => {
            path.push('/');
            path.push_str(&encode_key(k));
        }
        None if path.is_empty() => path.push('/'),
        None => {}
    }

    let mut raw = format!("{}://{}{}", base.scheme(), authority, path);
    if !query.is_empty() {
        let encoded: Vec<String> = query
            .iter()
            .map(|(name, value)| match value {
                Some(v) => format!(
                    "{}={}",
                    encode_query_component(name),
                    encode_query_component(v)
                ),
                None => encode_query_component(name),
            })
            .collect();
        raw.push('?');
        raw.push_str(&encoded.join("&"));
    }

    Url::parse(&raw).map_err(|e| ConfigurationError::InvalidEndpoint {
        url: raw.clone(),
        details: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_requires_an_endpoint() {
        assert!(matches!(
            EndpointSet::new(vec![]),
            Err(ConfigurationError::NoEndpoints)
        ));
        assert!(EndpointSet::new(vec![url("ftp://example.com")]).is_err());
    }

    #[test]
    fn test_rotation_and_failover() {
        let set = EndpointSet::new(vec![
            url("http://10.0.0.1:9020"),
            url("http://10.0.0.2:9020"),
            url("http://10.0.0.3:9020"),
        ])
        .unwrap();

        assert_eq!(set.start_index(), 0);
        assert_eq!(set.start_index(), 1);
        assert_eq!(set.start_index(), 2);
        assert_eq!(set.start_index(), 0);
        assert_eq!(set.failover_index(2), 0);
        assert_eq!(set.get(1).as_str(), "http://10.0.0.2:9020/");
    }

    #[test]
    fn test_path_style_url() {
        let built = build_url(
            &url("http://localhost:9000"),
            AddressingStyle::Path,
            Some("bucket"),
            Some("dir/my file.txt"),
            &[("versionId".to_string(), Some("v 1".to_string()))],
        )
        .unwrap();
        assert_eq!(
            built.as_str(),
            "http://localhost:9000/bucket/dir/my%20file.txt?versionId=v%201"
        );
    }

    #[test]
    fn test_virtual_hosted_url() {
        let built = build_url(
            &url("https://s3.example.com"),
            AddressingStyle::VirtualHosted,
            Some("bucket"),
            Some("key"),
            &[("acl".to_string(), None)],
        )
        .unwrap();
        assert_eq!(built.as_str(), "https://bucket.s3.example.com/key?acl");
    }

    #[test]
    fn test_virtual_hosted_falls_back_for_ip_and_odd_names() {
        let ip = build_url(
            &url("http://127.0.0.1:9000"),
            AddressingStyle::VirtualHosted,
            Some("bucket"),
            None,
            &[],
        )
        .unwrap();
        assert_eq!(ip.as_str(), "http://127.0.0.1:9000/bucket");

        let dotted = build_url(
            &url("https://s3.example.com"),
            AddressingStyle::VirtualHosted,
            Some("my.bucket"),
            Some("k"),
            &[],
        )
        .unwrap();
        assert_eq!(dotted.as_str(), "https://s3.example.com/my.bucket/k");
    }

    #[test]
    fn test_service_root_and_base_path() {
        let root = build_url(&url("http://localhost:9000"), AddressingStyle::Path, None, None, &[])
            .unwrap();
        assert_eq!(root.path(), "/");

        let prefixed = build_url(
            &url("http://gateway.local/s3/"),
            AddressingStyle::Path,
            Some("bucket"),
            Some("/leading"),
            &[],
        )
        .unwrap();
        assert_eq!(prefixed.path(), "/s3/bucket//leading");
    }

    #[test]
    fn test_dns_compatibility() {
        assert!(is_dns_compatible("my-bucket-1"));
        assert!(!is_dns_compatible("My_Bucket"));
        assert!(!is_dns_compatible("ab"));
        assert!(!is_dns_compatible("-bucket"));
        assert!(!is_dns_compatible("my.bucket"));
    }
}
