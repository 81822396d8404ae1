//! Signature V4 signer.

use super::*;
use crate::credentials::AwsCredentials;
use crate::error::SigningError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Longest expiry accepted for presigned URLs (seven days).
pub const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A computed request signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Header the value must be attached under.
    pub header_name: &'static str,
    /// Header value.
    pub value: String,
}

/// Request signer.
///
/// Implementations must be deterministic: the same inputs, timestamp
/// included, yield the same signature.
pub trait Signer: Send + Sync + fmt::Debug {
    /// Sign a request.
    ///
    /// Adds `host`, `x-amz-date`, `x-amz-content-sha256` (and the session
    /// token when present) to `headers`, then attaches the signature.
    fn sign(
        &self,
        method: &str,
        url: &Url,
        headers: &mut HashMap<String, String>,
        payload_hash: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Signature, SigningError>;

    /// Produce a URL carrying its signature in the query string.
    fn presign(
        &self,
        method: &str,
        url: &Url,
        expires_in: Duration,
        timestamp: DateTime<Utc>,
    ) -> Result<Url, SigningError>;
}

/// Signature V4 signer over a fixed credential set.
#[derive(Clone)]
pub struct SignerV4 {
    credentials: Option<AwsCredentials>,
    region: String,
}

impl SignerV4 {
    /// Create a signer. Without credentials every `sign` call fails.
    pub fn new(credentials: Option<AwsCredentials>, region: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
        }
    }

    /// The signing region.
    pub fn region(&self) -> &str {
        &self.region
    }

    fn credentials(&self) -> Result<&AwsCredentials, SigningError> {
        self.credentials
            .as_ref()
            .ok_or(SigningError::MissingCredentials)
    }
}

fn host_header(url: &Url) -> Result<String, SigningError> {
    let host = url.host_str().ok_or_else(|| SigningError::MissingHost {
        url: url.to_string(),
    })?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

impl Signer for SignerV4 {
    fn sign(
        &self,
        method: &str,
        url: &Url,
        headers: &mut HashMap<String, String>,
        payload_hash: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Signature, SigningError> {
        let credentials = self.credentials()?;
        let scope = SigningScope::new(timestamp, &self.region);

        headers.retain(|name, _| {
            !name.eq_ignore_ascii_case(AUTHORIZATION_HEADER)
                && !name.eq_ignore_ascii_case("x-amz-date")
        });
        headers.insert("host".to_string(), host_header(url)?);
        headers.insert("x-amz-date".to_string(), scope.amz_date().to_string());
        headers.insert(
            "x-amz-content-sha256".to_string(),
            payload_hash.to_string(),
        );
        if let Some(token) = credentials.session_token() {
            headers.insert("x-amz-security-token".to_string(), token.to_string());
        }

        let canonical = CanonicalRequest::new(method, url, headers, payload_hash);
        let value = format!(
            "{} Credential={}, SignedHeaders={}, Signature={}",
            ALGORITHM,
            scope.credential(credentials.access_key_id()),
            canonical.signed_headers(),
            scope.sign(credentials.secret_access_key(), &canonical)
        );

        headers.insert(AUTHORIZATION_HEADER.to_string(), value.clone());
        Ok(Signature {
            header_name: AUTHORIZATION_HEADER,
            value,
        })
    }

    fn presign(
        &self,
        method: &str,
        url: &Url,
        expires_in: Duration,
        timestamp: DateTime<Utc>,
    ) -> Result<Url, SigningError> {
        let credentials = self.credentials()?;
        if expires_in.is_zero() || expires_in > MAX_PRESIGN_EXPIRY {
            return Err(SigningError::InvalidExpiry {
                seconds: expires_in.as_secs(),
            });
        }

        let scope = SigningScope::new(timestamp, &self.region);
        let mut signed_headers = HashMap::new();
        signed_headers.insert("host".to_string(), host_header(url)?);

        let mut presigned = url.clone();
        presigned
            .query_pairs_mut()
            .append_pair("X-Amz-Algorithm", ALGORITHM)
            .append_pair("X-Amz-Credential", &scope.credential(credentials.access_key_id()))
            .append_pair("X-Amz-Date", scope.amz_date())
            .append_pair("X-Amz-Expires", &expires_in.as_secs().to_string());
        if let Some(token) = credentials.session_token() {
            presigned
                .query_pairs_mut()
                .append_pair("X-Amz-Security-Token", token);
        }
        presigned
            .query_pairs_mut()
            .append_pair("X-Amz-SignedHeaders", "host");

        let canonical =
            CanonicalRequest::new(method, &presigned, &signed_headers, UNSIGNED_PAYLOAD);
        let signature = scope.sign(credentials.secret_access_key(), &canonical);

        presigned
            .query_pairs_mut()
            .append_pair("X-Amz-Signature", &signature);
        Ok(presigned)
    }
}

impl fmt::Debug for SignerV4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerV4")
            .field("credentials", &self.credentials)
            .field("region", &self.region)
            .finish()
    }
}
