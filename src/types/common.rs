//! Common enums and data types.

use crate::error::PreconditionError;
use std::collections::HashMap;
use std::fmt;

/// Storage class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageClass {
    /// Standard storage for frequently accessed data.
    #[default]
    Standard,
    /// Reduced redundancy storage.
    ReducedRedundancy,
    /// Infrequent access.
    StandardIa,
    /// Single-zone infrequent access.
    OnezoneIa,
    /// Automatic tiering.
    IntelligentTiering,
    /// Archive storage.
    Glacier,
    /// Long-term archive storage.
    DeepArchive,
}

impl StorageClass {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageClass::Standard => "STANDARD",
            StorageClass::ReducedRedundancy => "REDUCED_REDUNDANCY",
            StorageClass::StandardIa => "STANDARD_IA",
            StorageClass::OnezoneIa => "ONEZONE_IA",
            StorageClass::IntelligentTiering => "INTELLIGENT_TIERING",
            StorageClass::Glacier => "GLACIER",
            StorageClass::DeepArchive => "DEEP_ARCHIVE",
        }
    }
}

impl std::str::FromStr for StorageClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STANDARD" => Ok(StorageClass::Standard),
            "REDUCED_REDUNDANCY" => Ok(StorageClass::ReducedRedundancy),
            "STANDARD_IA" => Ok(StorageClass::StandardIa),
            "ONEZONE_IA" => Ok(StorageClass::OnezoneIa),
            "INTELLIGENT_TIERING" => Ok(StorageClass::IntelligentTiering),
            "GLACIER" => Ok(StorageClass::Glacier),
            "DEEP_ARCHIVE" => Ok(StorageClass::DeepArchive),
            _ => Err(format!("Unknown storage class: {}", s)),
        }
    }
}

/// Canned ACL settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CannedAcl {
    /// Owner gets FULL_CONTROL. No one else has access rights.
    #[default]
    Private,
    /// Owner gets FULL_CONTROL. Everyone else gets READ access.
    PublicRead,
    /// Owner gets FULL_CONTROL. Everyone else gets READ and WRITE access.
    PublicReadWrite,
    /// Owner gets FULL_CONTROL. Authenticated users get READ access.
    AuthenticatedRead,
    /// Object owner gets FULL_CONTROL. Bucket owner gets READ access.
    BucketOwnerRead,
    /// Both object and bucket owners get FULL_CONTROL.
    BucketOwnerFullControl,
}

impl CannedAcl {
    /// Returns the `x-amz-acl` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            CannedAcl::Private => "private",
            CannedAcl::PublicRead => "public-read",
            CannedAcl::PublicReadWrite => "public-read-write",
            CannedAcl::AuthenticatedRead => "authenticated-read",
            CannedAcl::BucketOwnerRead => "bucket-owner-read",
            CannedAcl::BucketOwnerFullControl => "bucket-owner-full-control",
        }
    }
}

/// Inclusive byte range, `bytes=first-last`.
///
/// `last` of `None` means "to the end of the resource".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    /// First byte offset.
    pub first: u64,
    /// Last byte offset, inclusive.
    pub last: Option<u64>,
}

impl ByteRange {
    /// Range covering `first..=last`.
    pub fn new(first: u64, last: u64) -> Self {
        Self {
            first,
            last: Some(last),
        }
    }

    /// Range from `first` to the end.
    pub fn from_offset(first: u64) -> Self {
        Self { first, last: None }
    }

    /// Range of `length` bytes starting at `offset`.
    ///
    /// A zero length yields an invalid range, rejected by [`validate`](Self::validate).
    pub fn span(offset: u64, length: u64) -> Self {
        match length {
            0 => Self {
                first: offset + 1,
                last: Some(offset),
            },
            n => Self::new(offset, offset + n - 1),
        }
    }

    /// Number of bytes covered, when bounded.
    pub fn len(&self) -> Option<u64> {
        self.last
            .filter(|last| *last >= self.first)
            .map(|last| last - self.first + 1)
    }

    /// Whether the range is bounded and covers no bytes.
    pub fn is_empty(&self) -> bool {
        matches!(self.last, Some(last) if last < self.first)
    }

    /// Reject ranges that cover no bytes.
    pub fn validate(&self) -> Result<(), PreconditionError> {
        if self.is_empty() {
            return Err(PreconditionError::InvalidRange {
                message: format!("{} covers no bytes", self),
            });
        }
        Ok(())
    }

    /// `Range` header value.
    pub fn header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last {
            Some(last) => write!(f, "bytes={}-{}", self.first, last),
            None => write!(f, "bytes={}-", self.first),
        }
    }
}

/// Resource owner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owner {
    /// Canonical user ID.
    pub id: Option<String>,
    /// Display name.
    pub display_name: Option<String>,
}

/// Bucket listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// Bucket name.
    pub name: String,
    /// Creation date as reported by the service.
    pub creation_date: Option<String>,
}

/// Object listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Object {
    /// Object key.
    pub key: String,
    /// Last modified date.
    pub last_modified: Option<String>,
    /// ETag.
    pub e_tag: Option<String>,
    /// Size in bytes.
    pub size: Option<u64>,
    /// Storage class.
    pub storage_class: Option<StorageClass>,
    /// Owner.
    pub owner: Option<Owner>,
}

/// Object (and optional version) addressed by a batch delete.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    /// Object key.
    pub key: String,
    /// Version ID.
    pub version_id: Option<String>,
}

impl ObjectIdentifier {
    /// Identify the current version of `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: None,
        }
    }

    /// Identify one version of `key`.
    pub fn with_version(key: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            version_id: Some(version_id.into()),
        }
    }
}

impl<S: Into<String>> From<S> for ObjectIdentifier {
    fn from(key: S) -> Self {
        ObjectIdentifier::new(key)
    }
}

/// Uploaded part as listed by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part number.
    pub part_number: u32,
    /// ETag.
    pub e_tag: String,
    /// Size in bytes.
    pub size: Option<u64>,
    /// Last modified date.
    pub last_modified: Option<String>,
}

/// Part reference used to complete a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// Part number.
    pub part_number: u32,
    /// ETag returned by the part upload.
    pub e_tag: String,
}

/// In-progress multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartUpload {
    /// Object key.
    pub key: String,
    /// Upload ID.
    pub upload_id: String,
    /// Initiation date.
    pub initiated: Option<String>,
    /// Storage class.
    pub storage_class: Option<StorageClass>,
    /// Owner.
    pub owner: Option<Owner>,
}

/// Object version from a version listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    /// Object key.
    pub key: String,
    /// Version ID.
    pub version_id: String,
    /// Whether this is the current version.
    pub is_latest: bool,
    /// Last modified date.
    pub last_modified: Option<String>,
    /// ETag.
    pub e_tag: Option<String>,
    /// Size in bytes.
    pub size: Option<u64>,
    /// Storage class.
    pub storage_class: Option<StorageClass>,
    /// Owner.
    pub owner: Option<Owner>,
}

/// Delete marker from a version listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteMarkerEntry {
    /// Object key.
    pub key: String,
    /// Version ID of the marker.
    pub version_id: String,
    /// Whether the marker is the current version.
    pub is_latest: bool,
    /// Last modified date.
    pub last_modified: Option<String>,
    /// Owner.
    pub owner: Option<Owner>,
}

/// One entry of a version listing, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionEntry {
    /// A stored object version.
    Version(ObjectVersion),
    /// A delete marker.
    DeleteMarker(DeleteMarkerEntry),
}

impl VersionEntry {
    /// Object key.
    pub fn key(&self) -> &str {
        match self {
            VersionEntry::Version(v) => &v.key,
            VersionEntry::DeleteMarker(m) => &m.key,
        }
    }

    /// Version ID.
    pub fn version_id(&self) -> &str {
        match self {
            VersionEntry::Version(v) => &v.version_id,
            VersionEntry::DeleteMarker(m) => &m.version_id,
        }
    }

    /// Whether the entry is the current version.
    pub fn is_latest(&self) -> bool {
        match self {
            VersionEntry::Version(v) => v.is_latest,
            VersionEntry::DeleteMarker(m) => m.is_latest,
        }
    }
}

/// Object metadata taken from response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Content length of this response's body.
    pub content_length: Option<u64>,
    /// Content type.
    pub content_type: Option<String>,
    /// Content encoding.
    pub content_encoding: Option<String>,
    /// Content disposition.
    pub content_disposition: Option<String>,
    /// Cache control.
    pub cache_control: Option<String>,
    /// `Content-Range` for partial responses.
    pub content_range: Option<String>,
    /// ETag.
    pub e_tag: Option<String>,
    /// Last modified date.
    pub last_modified: Option<String>,
    /// Version ID.
    pub version_id: Option<String>,
    /// Storage class.
    pub storage_class: Option<StorageClass>,
    /// User metadata (`x-amz-meta-*`), keyed without the prefix.
    pub user_metadata: HashMap<String, String>,
}
