//! Response types.

use super::{
    AccessControlList, Bucket, MultipartUpload, ObjectMetadata, Owner, Part, S3Object,
    VersionEntry,
};
use crate::error::S3Error;
use crate::transport::{stream_error, ResponseStream};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::fmt;
use url::Url;

/// PutObject output.
#[derive(Debug, Clone, Default)]
pub struct PutObjectOutput {
    /// ETag.
    pub e_tag: Option<String>,
    /// Version ID.
    pub version_id: Option<String>,
    /// Request ID.
    pub request_id: Option<String>,
}

/// GetObject output with a buffered body.
#[derive(Debug, Clone)]
pub struct GetObjectOutput {
    /// Object data.
    pub body: Bytes,
    /// Metadata.
    pub metadata: ObjectMetadata,
    /// Request ID.
    pub request_id: Option<String>,
}

/// GetObject output with a streaming body.
///
/// A body shorter than the advertised `Content-Length` ends with an error.
pub struct GetObjectStreamOutput {
    /// Object data.
    pub body: ResponseStream,
    /// Metadata.
    pub metadata: ObjectMetadata,
    /// Request ID.
    pub request_id: Option<String>,
}

impl GetObjectStreamOutput {
    /// Read the whole body into memory.
    pub async fn collect(mut self) -> Result<Bytes, S3Error> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk.map_err(stream_error)?);
        }
        Ok(buf.freeze())
    }
}

impl fmt::Debug for GetObjectStreamOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetObjectStreamOutput")
            .field("metadata", &self.metadata)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

/// HeadObject output.
#[derive(Debug, Clone)]
pub struct HeadObjectOutput {
    /// Metadata.
    pub metadata: ObjectMetadata,
    /// Request ID.
    pub request_id: Option<String>,
}

/// DeleteObject output.
#[derive(Debug, Clone, Default)]
pub struct DeleteObjectOutput {
    /// Version ID affected.
    pub version_id: Option<String>,
    /// Whether a delete marker was involved.
    pub delete_marker: bool,
    /// Request ID.
    pub request_id: Option<String>,
}

/// CopyObject output.
#[derive(Debug, Clone, Default)]
pub struct CopyObjectOutput {
    /// ETag of the new object.
    pub e_tag: Option<String>,
    /// Last modified date.
    pub last_modified: Option<String>,
    /// Version ID of the new object.
    pub version_id: Option<String>,
    /// Version ID of the source object.
    pub source_version_id: Option<String>,
}

/// ListBuckets output.
#[derive(Debug, Clone, Default)]
pub struct ListBucketsOutput {
    /// Owner.
    pub owner: Option<Owner>,
    /// Buckets.
    pub buckets: Vec<Bucket>,
}

/// ListObjects output.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsOutput {
    /// Bucket name.
    pub name: String,
    /// Prefix.
    pub prefix: Option<String>,
    /// Delimiter.
    pub delimiter: Option<String>,
    /// Marker.
    pub marker: Option<String>,
    /// Marker for the next page.
    ///
    /// Falls back to the last key of this page when the service omits it.
    pub next_marker: Option<String>,
    /// Max keys.
    pub max_keys: Option<u32>,
    /// Whether more results exist.
    pub is_truncated: bool,
    /// Objects.
    pub contents: Vec<S3Object>,
    /// Common prefixes.
    pub common_prefixes: Vec<String>,
}

/// ListObjectVersions output.
#[derive(Debug, Clone, Default)]
pub struct ListVersionsOutput {
    /// Bucket name.
    pub name: String,
    /// Prefix.
    pub prefix: Option<String>,
    /// Key marker.
    pub key_marker: Option<String>,
    /// Version ID marker.
    pub version_id_marker: Option<String>,
    /// Next key marker.
    pub next_key_marker: Option<String>,
    /// Next version ID marker.
    pub next_version_id_marker: Option<String>,
    /// Whether more results exist.
    pub is_truncated: bool,
    /// Versions and delete markers in document order.
    pub entries: Vec<VersionEntry>,
    /// Common prefixes.
    pub common_prefixes: Vec<String>,
}

/// CreateBucket output.
#[derive(Debug, Clone, Default)]
pub struct CreateBucketOutput {
    /// Location header.
    pub location: Option<String>,
}

/// GetBucketAcl / GetObjectAcl output.
pub type GetAclOutput = AccessControlList;

/// CreateMultipartUpload output.
#[derive(Debug, Clone)]
pub struct CreateMultipartUploadOutput {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Upload ID.
    pub upload_id: String,
}

/// CompleteMultipartUpload output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteMultipartUploadOutput {
    /// Location.
    pub location: Option<String>,
    /// Bucket name.
    pub bucket: Option<String>,
    /// Object key.
    pub key: Option<String>,
    /// ETag of the assembled object.
    pub e_tag: Option<String>,
    /// Version ID.
    pub version_id: Option<String>,
}

/// ListParts output.
#[derive(Debug, Clone, Default)]
pub struct ListPartsOutput {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Upload ID.
    pub upload_id: String,
    /// Part number marker.
    pub part_number_marker: Option<u32>,
    /// Next part number marker.
    pub next_part_number_marker: Option<u32>,
    /// Max parts.
    pub max_parts: Option<u32>,
    /// Whether more results exist.
    pub is_truncated: bool,
    /// Parts.
    pub parts: Vec<Part>,
}

/// ListMultipartUploads output.
#[derive(Debug, Clone, Default)]
pub struct ListMultipartUploadsOutput {
    /// Bucket name.
    pub bucket: String,
    /// Prefix.
    pub prefix: Option<String>,
    /// Key marker.
    pub key_marker: Option<String>,
    /// Upload ID marker.
    pub upload_id_marker: Option<String>,
    /// Next key marker.
    pub next_key_marker: Option<String>,
    /// Next upload ID marker.
    pub next_upload_id_marker: Option<String>,
    /// Whether more results exist.
    pub is_truncated: bool,
    /// Uploads.
    pub uploads: Vec<MultipartUpload>,
    /// Common prefixes.
    pub common_prefixes: Vec<String>,
}

/// A presigned URL.
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The URL, signature included.
    pub url: Url,
    /// HTTP method the URL is valid for.
    pub method: String,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
}

impl PresignedUrl {
    /// Whether the URL has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
