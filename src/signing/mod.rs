//! Signature V4 request signing.
//!
//! Signing is a pure function of method, URL, headers, payload hash,
//! credentials and timestamp. The executor re-signs every attempt with a
//! fresh timestamp; tests pin the timestamp to get reproducible output.

mod canonical;
mod signer;

pub use canonical::{is_signed_header, CanonicalRequest};
pub use signer::{Signature, Signer, SignerV4, MAX_PRESIGN_EXPIRY};

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Signature algorithm identifier.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name in the credential scope.
pub const SERVICE: &str = "s3";

/// Payload hash for bodies that are streamed rather than hashed.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// Header the authorization value is attached under.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// SHA-256 of the empty string.
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Hex SHA-256 digest.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// HMAC-SHA256 of `data` under `key`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Derive the signing key by chaining HMACs over date, region, service and
/// the `aws4_request` terminator, starting from `"AWS4" + secret`.
pub fn derive_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let seed = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes());
    [region.as_bytes(), service.as_bytes(), b"aws4_request"]
        .iter()
        .fold(seed, |key, part| hmac_sha256(&key, part))
}

/// The date and region a signature is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningScope {
    amz_date: String,
    date: String,
    region: String,
}

impl SigningScope {
    /// Scope for a signature made at `timestamp`.
    pub fn new(timestamp: DateTime<Utc>, region: &str) -> Self {
        Self {
            amz_date: timestamp.format("%Y%m%dT%H%M%SZ").to_string(),
            date: timestamp.format("%Y%m%d").to_string(),
            region: region.to_string(),
        }
    }

    /// Timestamp as sent in `x-amz-date`.
    pub fn amz_date(&self) -> &str {
        &self.amz_date
    }

    /// `{date}/{region}/s3/aws4_request`.
    pub fn credential_scope(&self) -> String {
        format!("{}/{}/{}/aws4_request", self.date, self.region, SERVICE)
    }

    /// `{access_key_id}/{credential_scope}`.
    pub fn credential(&self, access_key_id: &str) -> String {
        format!("{}/{}", access_key_id, self.credential_scope())
    }

    /// The string the signature is computed over.
    pub fn string_to_sign(&self, request: &CanonicalRequest) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            self.amz_date,
            self.credential_scope(),
            request.digest()
        )
    }

    /// Hex signature of `request`.
    pub fn sign(&self, secret: &str, request: &CanonicalRequest) -> String {
        let key = derive_signing_key(secret, &self.date, &self.region, SERVICE);
        hex::encode(hmac_sha256(&key, self.string_to_sign(request).as_bytes()))
    }
}
