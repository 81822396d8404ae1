//! Decoders for singular response documents.

use super::{decode_xml, Element};
use crate::error::ResponseError;
use crate::types::*;
use serde::Deserialize;

pub(crate) fn expect_root(root: &Element, name: &'static str) -> Result<(), ResponseError> {
    if root.name == name {
        Ok(())
    } else {
        Err(ResponseError::Invalid {
            message: format!("expected <{}> document, found <{}>", name, root.name),
        })
    }
}

pub(crate) fn decode_owner(element: Option<&Element>) -> Option<Owner> {
    element.map(|o| Owner {
        id: o.child_text("ID"),
        display_name: o.child_text("DisplayName"),
    })
}

fn common_prefixes(root: &Element) -> Vec<String> {
    root.children_named("CommonPrefixes")
        .filter_map(|p| p.child_text("Prefix"))
        .collect()
}

#[derive(Debug, Deserialize)]
struct OwnerDto {
    #[serde(rename = "ID")]
    id: Option<String>,
    #[serde(rename = "DisplayName")]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BucketDto {
    name: String,
    creation_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BucketsDto {
    #[serde(rename = "Bucket", default)]
    bucket: Vec<BucketDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListAllMyBucketsDto {
    owner: Option<OwnerDto>,
    #[serde(default)]
    buckets: BucketsDto,
}

/// Decode a ListAllMyBucketsResult document.
pub fn decode_list_buckets(body: &[u8]) -> Result<ListBucketsOutput, ResponseError> {
    let dto: ListAllMyBucketsDto = decode_xml(body)?;
    Ok(ListBucketsOutput {
        owner: dto.owner.map(|o| Owner {
            id: o.id,
            display_name: o.display_name,
        }),
        buckets: dto
            .buckets
            .bucket
            .into_iter()
            .map(|b| Bucket {
                name: b.name,
                creation_date: b.creation_date,
            })
            .collect(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateMultipartDto {
    bucket: String,
    key: String,
    upload_id: String,
}

/// Decode an InitiateMultipartUploadResult document.
pub fn decode_initiate_multipart(body: &[u8]) -> Result<CreateMultipartUploadOutput, ResponseError> {
    let dto: InitiateMultipartDto = decode_xml(body)?;
    if dto.upload_id.is_empty() {
        return Err(ResponseError::MissingField {
            field: "UploadId",
            document: "InitiateMultipartUploadResult",
        });
    }
    Ok(CreateMultipartUploadOutput {
        bucket: dto.bucket,
        key: dto.key,
        upload_id: dto.upload_id,
    })
}

#[derive(Debug, Deserialize)]
struct CompleteMultipartDto {
    #[serde(rename = "Location")]
    location: Option<String>,
    #[serde(rename = "Bucket")]
    bucket: Option<String>,
    #[serde(rename = "Key")]
    key: Option<String>,
    #[serde(rename = "ETag")]
    e_tag: Option<String>,
}

/// Decode a CompleteMultipartUploadResult document.
pub fn decode_complete_multipart(
    body: &[u8],
) -> Result<CompleteMultipartUploadOutput, ResponseError> {
    let dto: CompleteMultipartDto = decode_xml(body)?;
    Ok(CompleteMultipartUploadOutput {
        location: dto.location,
        bucket: dto.bucket,
        key: dto.key,
        e_tag: dto.e_tag,
        version_id: None,
    })
}

#[derive(Debug, Deserialize)]
struct CopyObjectDto {
    #[serde(rename = "ETag")]
    e_tag: Option<String>,
    #[serde(rename = "LastModified")]
    last_modified: Option<String>,
}

/// Decode a CopyObjectResult document.
pub fn decode_copy_result(body: &[u8]) -> Result<CopyObjectOutput, ResponseError> {
    let dto: CopyObjectDto = decode_xml(body)?;
    Ok(CopyObjectOutput {
        e_tag: dto.e_tag,
        last_modified: dto.last_modified,
        ..Default::default()
    })
}

/// Decode a LocationConstraint document. An empty constraint yields `None`.
pub fn decode_location(body: &[u8]) -> Result<Option<String>, ResponseError> {
    let root = Element::parse(body)?;
    expect_root(&root, "LocationConstraint")?;
    let location = root.text.trim();
    Ok((!location.is_empty()).then(|| location.to_string()))
}

fn decode_object(entry: &Element) -> Result<S3Object, ResponseError> {
    Ok(S3Object {
        key: entry.required_text("Key", "ListBucketResult")?,
        last_modified: entry.child_text("LastModified"),
        e_tag: entry.child_text("ETag"),
        size: entry.child_parse("Size"),
        storage_class: entry.child_parse("StorageClass"),
        owner: decode_owner(entry.child("Owner")),
    })
}

/// Decode a ListBucketResult document.
///
/// When the listing is truncated and the service omits `NextMarker`, the last
/// key (or common prefix) of the page is used as the next marker.
pub fn decode_list_objects(body: &[u8]) -> Result<ListObjectsOutput, ResponseError> {
    let root = Element::parse(body)?;
    expect_root(&root, "ListBucketResult")?;

    let contents = root
        .children_named("Contents")
        .map(decode_object)
        .collect::<Result<Vec<_>, _>>()?;
    let common_prefixes = common_prefixes(&root);
    let is_truncated = root.child_bool("IsTruncated");

    let next_marker = root.child_text("NextMarker").or_else(|| {
        if !is_truncated {
            return None;
        }
        let last_key = contents.last().map(|o| o.key.clone());
        let last_prefix = common_prefixes.last().cloned();
        last_key.max(last_prefix)
    });

    Ok(ListObjectsOutput {
        name: root.child_text("Name").unwrap_or_default(),
        prefix: root.child_text("Prefix").filter(|p| !p.is_empty()),
        delimiter: root.child_text("Delimiter"),
        marker: root.child_text("Marker").filter(|m| !m.is_empty()),
        next_marker,
        max_keys: root.child_parse("MaxKeys"),
        is_truncated,
        contents,
        common_prefixes,
    })
}

/// Decode a ListPartsResult document.
pub fn decode_list_parts(body: &[u8]) -> Result<ListPartsOutput, ResponseError> {
    let root = Element::parse(body)?;
    expect_root(&root, "ListPartsResult")?;

    let parts = root
        .children_named("Part")
        .map(|p| {
            Ok(Part {
                part_number: p.child_parse("PartNumber").ok_or(ResponseError::MissingField {
                    field: "PartNumber",
                    document: "ListPartsResult",
                })?,
                e_tag: p.required_text("ETag", "ListPartsResult")?,
                size: p.child_parse("Size"),
                last_modified: p.child_text("LastModified"),
            })
        })
        .collect::<Result<Vec<_>, ResponseError>>()?;

    Ok(ListPartsOutput {
        bucket: root.child_text("Bucket").unwrap_or_default(),
        key: root.child_text("Key").unwrap_or_default(),
        upload_id: root.required_text("UploadId", "ListPartsResult")?,
        part_number_marker: root.child_parse("PartNumberMarker"),
        next_part_number_marker: root.child_parse("NextPartNumberMarker"),
        max_parts: root.child_parse("MaxParts"),
        is_truncated: root.child_bool("IsTruncated"),
        parts,
    })
}

/// Decode a ListMultipartUploadsResult document.
pub fn decode_list_uploads(body: &[u8]) -> Result<ListMultipartUploadsOutput, ResponseError> {
    let root = Element::parse(body)?;
    expect_root(&root, "ListMultipartUploadsResult")?;

    let uploads = root
        .children_named("Upload")
        .map(|u| {
            Ok(MultipartUpload {
                key: u.required_text("Key", "ListMultipartUploadsResult")?,
                upload_id: u.required_text("UploadId", "ListMultipartUploadsResult")?,
                initiated: u.child_text("Initiated"),
                storage_class: u.child_parse("StorageClass"),
                owner: decode_owner(u.child("Owner")),
            })
        })
        .collect::<Result<Vec<_>, ResponseError>>()?;

    Ok(ListMultipartUploadsOutput {
        bucket: root.child_text("Bucket").unwrap_or_default(),
        prefix: root.child_text("Prefix").filter(|p| !p.is_empty()),
        key_marker: root.child_text("KeyMarker").filter(|m| !m.is_empty()),
        upload_id_marker: root.child_text("UploadIdMarker").filter(|m| !m.is_empty()),
        next_key_marker: root.child_text("NextKeyMarker").filter(|m| !m.is_empty()),
        next_upload_id_marker: root
            .child_text("NextUploadIdMarker")
            .filter(|m| !m.is_empty()),
        is_truncated: root.child_bool("IsTruncated"),
        uploads,
        common_prefixes: common_prefixes(&root),
    })
}

fn decode_grantee(element: &Element) -> Result<Grantee, ResponseError> {
    let kind = element.attribute("type").map(str::to_string).or_else(|| {
        if element.child("ID").is_some() {
            Some("CanonicalUser".to_string())
        } else if element.child("URI").is_some() {
            Some("Group".to_string())
        } else {
            None
        }
    });
    match kind.as_deref() {
        Some("CanonicalUser") => Ok(Grantee::CanonicalUser {
            id: element.required_text("ID", "AccessControlPolicy")?,
            display_name: element.child_text("DisplayName"),
        }),
        Some("Group") => Ok(Grantee::Group {
            uri: element.required_text("URI", "AccessControlPolicy")?,
        }),
        Some("AmazonCustomerByEmail") => Ok(Grantee::Email {
            address: element.required_text("EmailAddress", "AccessControlPolicy")?,
        }),
        other => Err(ResponseError::Invalid {
            message: format!("unsupported grantee type {:?}", other),
        }),
    }
}

/// Decode an AccessControlPolicy document.
pub fn decode_acl(body: &[u8]) -> Result<AccessControlList, ResponseError> {
    let root = Element::parse(body)?;
    expect_root(&root, "AccessControlPolicy")?;

    let mut grants = Vec::new();
    if let Some(list) = root.child("AccessControlList") {
        for grant in list.children_named("Grant") {
            let grantee = grant.child("Grantee").ok_or(ResponseError::MissingField {
                field: "Grantee",
                document: "AccessControlPolicy",
            })?;
            let permission = grant
                .required_text("Permission", "AccessControlPolicy")?
                .parse::<Permission>()
                .map_err(|message| ResponseError::Invalid { message })?;
            grants.push(Grant::new(decode_grantee(grantee)?, permission));
        }
    }

    Ok(AccessControlList {
        owner: decode_owner(root.child("Owner")).unwrap_or_default(),
        grants,
    })
}

/// Decode a VersioningConfiguration document.
pub fn decode_versioning(body: &[u8]) -> Result<VersioningConfiguration, ResponseError> {
    let root = Element::parse(body)?;
    expect_root(&root, "VersioningConfiguration")?;
    let status = root
        .child_text("Status")
        .map(|s| s.parse::<VersioningStatus>())
        .transpose()
        .map_err(|message| ResponseError::Invalid { message })?;
    Ok(VersioningConfiguration { status })
}

/// Decode a CORSConfiguration document.
pub fn decode_cors(body: &[u8]) -> Result<CorsConfiguration, ResponseError> {
    let root = Element::parse(body)?;
    expect_root(&root, "CORSConfiguration")?;

    let texts = |rule: &Element, name: &str| -> Vec<String> {
        rule.children_named(name).map(|e| e.text.clone()).collect()
    };

    let mut rules = Vec::new();
    for rule in root.children_named("CORSRule") {
        let allowed_methods = rule
            .children_named("AllowedMethod")
            .map(|m| m.text.trim().parse::<CorsMethod>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|message| ResponseError::Invalid { message })?;
        rules.push(CorsRule {
            id: rule.child_text("ID"),
            allowed_origins: texts(rule, "AllowedOrigin"),
            allowed_methods,
            allowed_headers: texts(rule, "AllowedHeader"),
            expose_headers: texts(rule, "ExposeHeader"),
            max_age_seconds: rule.child_parse("MaxAgeSeconds"),
        });
    }
    Ok(CorsConfiguration { rules })
}

/// Decode a LifecycleConfiguration document.
pub fn decode_lifecycle(body: &[u8]) -> Result<LifecycleConfiguration, ResponseError> {
    let root = Element::parse(body)?;
    expect_root(&root, "LifecycleConfiguration")?;

    let mut rules = Vec::new();
    for rule in root.children_named("Rule") {
        let prefix = rule
            .child_text("Prefix")
            .or_else(|| rule.child("Filter").and_then(|f| f.child_text("Prefix")))
            .unwrap_or_default();
        let status = match rule.required_text("Status", "LifecycleConfiguration")?.trim() {
            "Enabled" => RuleStatus::Enabled,
            "Disabled" => RuleStatus::Disabled,
            other => {
                return Err(ResponseError::Invalid {
                    message: format!("unknown rule status {:?}", other),
                })
            }
        };
        let expiration = rule.child("Expiration").and_then(|e| {
            e.child_parse("Days")
                .map(LifecycleExpiration::Days)
                .or_else(|| e.child_text("Date").map(LifecycleExpiration::Date))
        });
        rules.push(LifecycleRule {
            id: rule.child_text("ID"),
            prefix,
            status,
            expiration,
            noncurrent_version_expiration_days: rule
                .child("NoncurrentVersionExpiration")
                .and_then(|e| e.child_parse("NoncurrentDays")),
            abort_incomplete_multipart_days: rule
                .child("AbortIncompleteMultipartUpload")
                .and_then(|e| e.child_parse("DaysAfterInitiation")),
        });
    }
    Ok(LifecycleConfiguration { rules })
}
