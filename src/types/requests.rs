//! Request types.

use super::{AclSetting, ByteRange, CannedAcl, ObjectIdentifier, StorageClass};
use crate::transport::RequestBody;
use std::collections::HashMap;

/// PutObject request.
#[derive(Debug, Clone, Default)]
pub struct PutObjectRequest {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Object data.
    pub body: RequestBody,
    /// Write only this range of an existing object.
    ///
    /// The body length must equal the range length.
    pub range: Option<ByteRange>,
    /// Content type.
    pub content_type: Option<String>,
    /// Content encoding.
    pub content_encoding: Option<String>,
    /// Content disposition.
    pub content_disposition: Option<String>,
    /// Cache control.
    pub cache_control: Option<String>,
    /// Send a `Content-MD5` computed from an in-memory body.
    pub compute_md5: bool,
    /// Storage class.
    pub storage_class: Option<StorageClass>,
    /// Canned ACL.
    pub acl: Option<CannedAcl>,
    /// User metadata.
    pub metadata: HashMap<String, String>,
}

impl PutObjectRequest {
    /// Create a new request.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        body: impl Into<RequestBody>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// Write into `range` of the existing object.
    pub fn with_range(mut self, range: ByteRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Set content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set cache control.
    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    /// Send `Content-MD5`.
    pub fn with_content_md5(mut self) -> Self {
        self.compute_md5 = true;
        self
    }

    /// Set storage class.
    pub fn with_storage_class(mut self, class: StorageClass) -> Self {
        self.storage_class = Some(class);
        self
    }

    /// Set canned ACL.
    pub fn with_acl(mut self, acl: CannedAcl) -> Self {
        self.acl = Some(acl);
        self
    }

    /// Add a user metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// GetObject request.
#[derive(Debug, Clone, Default)]
pub struct GetObjectRequest {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Version ID.
    pub version_id: Option<String>,
    /// Byte range.
    pub range: Option<ByteRange>,
    /// Return the object only if its ETag matches.
    pub if_match: Option<String>,
    /// Return the object only if its ETag differs.
    pub if_none_match: Option<String>,
}

impl GetObjectRequest {
    /// Create a new request.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    /// Set version ID.
    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    /// Fetch only `range`.
    pub fn with_range(mut self, range: ByteRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Set If-Match.
    pub fn with_if_match(mut self, etag: impl Into<String>) -> Self {
        self.if_match = Some(etag.into());
        self
    }

    /// Set If-None-Match.
    pub fn with_if_none_match(mut self, etag: impl Into<String>) -> Self {
        self.if_none_match = Some(etag.into());
        self
    }
}

/// CopyObject request.
#[derive(Debug, Clone, Default)]
pub struct CopyObjectRequest {
    /// Source bucket.
    pub source_bucket: String,
    /// Source key.
    pub source_key: String,
    /// Source version ID.
    pub source_version_id: Option<String>,
    /// Destination bucket.
    pub bucket: String,
    /// Destination key.
    pub key: String,
    /// Replacement metadata. `None` copies the source metadata.
    pub replace_metadata: Option<HashMap<String, String>>,
    /// Content type, used only when replacing metadata.
    pub content_type: Option<String>,
    /// Canned ACL.
    pub acl: Option<CannedAcl>,
    /// Storage class.
    pub storage_class: Option<StorageClass>,
}

impl CopyObjectRequest {
    /// Create a new request.
    pub fn new(
        source_bucket: impl Into<String>,
        source_key: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            source_key: source_key.into(),
            bucket: bucket.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    /// Copy a specific source version.
    pub fn with_source_version(mut self, version_id: impl Into<String>) -> Self {
        self.source_version_id = Some(version_id.into());
        self
    }

    /// Replace the metadata instead of copying it.
    pub fn with_replaced_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.replace_metadata = Some(metadata);
        self
    }

    /// Set canned ACL.
    pub fn with_acl(mut self, acl: CannedAcl) -> Self {
        self.acl = Some(acl);
        self
    }
}

/// DeleteObjects request.
#[derive(Debug, Clone, Default)]
pub struct DeleteObjectsRequest {
    /// Bucket name.
    pub bucket: String,
    /// Objects to delete, in submission order.
    pub objects: Vec<ObjectIdentifier>,
}

impl DeleteObjectsRequest {
    /// Create a new request.
    pub fn new<I, O>(bucket: impl Into<String>, objects: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<ObjectIdentifier>,
    {
        Self {
            bucket: bucket.into(),
            objects: objects.into_iter().map(Into::into).collect(),
        }
    }
}

/// ListObjects request.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsRequest {
    /// Bucket name.
    pub bucket: String,
    /// Key prefix.
    pub prefix: Option<String>,
    /// Delimiter for grouping keys.
    pub delimiter: Option<String>,
    /// Start listing after this key.
    pub marker: Option<String>,
    /// Maximum keys per page.
    pub max_keys: Option<u32>,
}

impl ListObjectsRequest {
    /// Create a new request.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Set prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set delimiter.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Set marker.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Set max keys.
    pub fn with_max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }
}

/// ListObjectVersions request.
#[derive(Debug, Clone, Default)]
pub struct ListVersionsRequest {
    /// Bucket name.
    pub bucket: String,
    /// Key prefix.
    pub prefix: Option<String>,
    /// Delimiter.
    pub delimiter: Option<String>,
    /// Start after this key.
    pub key_marker: Option<String>,
    /// Start after this version of `key_marker`.
    pub version_id_marker: Option<String>,
    /// Maximum entries per page.
    pub max_keys: Option<u32>,
}

impl ListVersionsRequest {
    /// Create a new request.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Set prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Continue from a previous page.
    pub fn with_markers(
        mut self,
        key_marker: impl Into<String>,
        version_id_marker: Option<String>,
    ) -> Self {
        self.key_marker = Some(key_marker.into());
        self.version_id_marker = version_id_marker;
        self
    }
}

/// CreateBucket request.
#[derive(Debug, Clone, Default)]
pub struct CreateBucketRequest {
    /// Bucket name.
    pub bucket: String,
    /// Location constraint. Omitted from the body when `None`.
    pub location_constraint: Option<String>,
    /// Canned ACL.
    pub acl: Option<CannedAcl>,
}

impl CreateBucketRequest {
    /// Create a new request.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Set location constraint.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location_constraint = Some(location.into());
        self
    }

    /// Set canned ACL.
    pub fn with_acl(mut self, acl: CannedAcl) -> Self {
        self.acl = Some(acl);
        self
    }
}

/// Request to set a bucket or object ACL.
#[derive(Debug, Clone)]
pub struct PutAclRequest {
    /// Bucket name.
    pub bucket: String,
    /// Object key; `None` targets the bucket.
    pub key: Option<String>,
    /// Version ID.
    pub version_id: Option<String>,
    /// ACL.
    pub acl: AclSetting,
}

impl PutAclRequest {
    /// Set a bucket ACL.
    pub fn bucket(bucket: impl Into<String>, acl: impl Into<AclSetting>) -> Self {
        Self {
            bucket: bucket.into(),
            key: None,
            version_id: None,
            acl: acl.into(),
        }
    }

    /// Set an object ACL.
    pub fn object(
        bucket: impl Into<String>,
        key: impl Into<String>,
        acl: impl Into<AclSetting>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: Some(key.into()),
            version_id: None,
            acl: acl.into(),
        }
    }
}

/// CreateMultipartUpload request.
#[derive(Debug, Clone, Default)]
pub struct CreateMultipartUploadRequest {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Content type.
    pub content_type: Option<String>,
    /// Storage class.
    pub storage_class: Option<StorageClass>,
    /// Canned ACL.
    pub acl: Option<CannedAcl>,
    /// User metadata.
    pub metadata: HashMap<String, String>,
}

impl CreateMultipartUploadRequest {
    /// Create a new request.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            ..Default::default()
        }
    }

    /// Set content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add a user metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// ListParts request.
#[derive(Debug, Clone, Default)]
pub struct ListPartsRequest {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Upload ID.
    pub upload_id: String,
    /// Maximum parts per page.
    pub max_parts: Option<u32>,
    /// Start after this part number.
    pub part_number_marker: Option<u32>,
}

impl ListPartsRequest {
    /// Create a new request.
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            upload_id: upload_id.into(),
            ..Default::default()
        }
    }
}

/// ListMultipartUploads request.
#[derive(Debug, Clone, Default)]
pub struct ListMultipartUploadsRequest {
    /// Bucket name.
    pub bucket: String,
    /// Key prefix.
    pub prefix: Option<String>,
    /// Delimiter.
    pub delimiter: Option<String>,
    /// Start after this key.
    pub key_marker: Option<String>,
    /// Start after this upload of `key_marker`.
    pub upload_id_marker: Option<String>,
    /// Maximum uploads per page.
    pub max_uploads: Option<u32>,
}

impl ListMultipartUploadsRequest {
    /// Create a new request.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Default::default()
        }
    }

    /// Set prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}
