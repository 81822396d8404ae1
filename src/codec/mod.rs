//! Body codec: request documents, integrity hashes and response decoding.
//!
//! Plain documents are decoded structurally; lists whose entries come in
//! several shapes (batch delete results, version listings) are decoded by
//! dispatching on each entry's element name.

mod batch;
mod builders;
mod documents;
mod tree;
mod versions;

pub use batch::decode_delete_result;
pub use builders::*;
pub use documents::*;
pub use tree::Element;
pub use versions::decode_list_versions;

use crate::error::mapping::parse_retry_after;
use crate::error::{classify_service_error, ErrorEnvelope, ResponseError, S3Error};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use md5::{Digest, Md5};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Base64 MD5 digest for the `Content-MD5` header.
pub fn content_md5(body: &[u8]) -> String {
    STANDARD.encode(Md5::digest(body))
}

/// Escape special characters for XML text and attribute values.
pub fn escape(s: &str) -> String {
    quick_xml::escape::escape(s).into_owned()
}

/// Decode a flat document through serde.
pub fn decode_xml<T: DeserializeOwned>(body: &[u8]) -> Result<T, ResponseError> {
    let xml = std::str::from_utf8(body).map_err(|e| ResponseError::XmlParse {
        message: e.to_string(),
    })?;
    quick_xml::de::from_str(xml).map_err(|e| ResponseError::XmlParse {
        message: e.to_string(),
    })
}

/// Decode an `<Error>` document. Returns `None` for anything else.
pub fn decode_error_envelope(body: &[u8]) -> Option<ErrorEnvelope> {
    let root = Element::parse(body).ok()?;
    if root.name != "Error" {
        return None;
    }
    let code = root.child_text("Code").unwrap_or_default();
    if code.is_empty() {
        return None;
    }
    Some(ErrorEnvelope {
        code,
        message: root.child_text("Message").unwrap_or_default(),
        resource: root
            .child_text("Resource")
            .or_else(|| root.child_text("Key"))
            .or_else(|| root.child_text("BucketName")),
        request_id: root.child_text("RequestId"),
        host_id: root.child_text("HostId"),
    })
}

fn header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Build the classified error for a failed response.
///
/// Without a decodable error document the envelope is synthetic and carries
/// only the status. The request ID falls back to the `x-amz-request-id` header.
pub fn error_from_response(status: u16, headers: &HashMap<String, String>, body: &[u8]) -> S3Error {
    let mut envelope = decode_error_envelope(body).unwrap_or_else(ErrorEnvelope::synthetic);
    if envelope.request_id.is_none() {
        envelope.request_id = header(headers, "x-amz-request-id").map(str::to_string);
    }
    if envelope.host_id.is_none() {
        envelope.host_id = header(headers, "x-amz-id-2").map(str::to_string);
    }
    let retry_after = parse_retry_after(header(headers, "retry-after"));
    classify_service_error(status, envelope, retry_after)
}
