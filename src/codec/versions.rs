//! Version listing decoding.

use super::documents::{decode_owner, expect_root};
use super::Element;
use crate::error::ResponseError;
use crate::types::{DeleteMarkerEntry, ListVersionsOutput, ObjectVersion, VersionEntry};

const DOCUMENT: &str = "ListVersionsResult";

/// Entries of a version listing that are not versions or delete markers.
const LISTING_FIELDS: &[&str] = &[
    "Name",
    "Prefix",
    "KeyMarker",
    "VersionIdMarker",
    "NextKeyMarker",
    "NextVersionIdMarker",
    "MaxKeys",
    "Delimiter",
    "IsTruncated",
    "EncodingType",
    "CommonPrefixes",
];

fn decode_entry(entry: &Element) -> Result<Option<VersionEntry>, ResponseError> {
    match entry.name.as_str() {
        "Version" => Ok(Some(VersionEntry::Version(ObjectVersion {
            key: entry.required_text("Key", DOCUMENT)?,
            version_id: entry.required_text("VersionId", DOCUMENT)?,
            is_latest: entry.child_bool("IsLatest"),
            last_modified: entry.child_text("LastModified"),
            e_tag: entry.child_text("ETag"),
            size: entry.child_parse("Size"),
            storage_class: entry.child_parse("StorageClass"),
            owner: decode_owner(entry.child("Owner")),
        }))),
        "DeleteMarker" => Ok(Some(VersionEntry::DeleteMarker(DeleteMarkerEntry {
            key: entry.required_text("Key", DOCUMENT)?,
            version_id: entry.required_text("VersionId", DOCUMENT)?,
            is_latest: entry.child_bool("IsLatest"),
            last_modified: entry.child_text("LastModified"),
            owner: decode_owner(entry.child("Owner")),
        }))),
        name if LISTING_FIELDS.contains(&name) => Ok(None),
        other => Err(ResponseError::UnknownElement {
            element: other.to_string(),
            document: DOCUMENT,
        }),
    }
}

/// Decode a ListVersionsResult document.
///
/// Versions and delete markers are interleaved in the document; the order is
/// preserved in [`ListVersionsOutput::entries`].
pub fn decode_list_versions(body: &[u8]) -> Result<ListVersionsOutput, ResponseError> {
    let root = Element::parse(body)?;
    expect_root(&root, DOCUMENT)?;

    let mut entries = Vec::new();
    for child in &root.children {
        if let Some(entry) = decode_entry(child)? {
            entries.push(entry);
        }
    }

    let non_empty = |name: &str| root.child_text(name).filter(|v| !v.is_empty());
    Ok(ListVersionsOutput {
        name: root.child_text("Name").unwrap_or_default(),
        prefix: non_empty("Prefix"),
        key_marker: non_empty("KeyMarker"),
        version_id_marker: non_empty("VersionIdMarker"),
        next_key_marker: non_empty("NextKeyMarker"),
        next_version_id_marker: non_empty("NextVersionIdMarker"),
        is_truncated: root.child_bool("IsTruncated"),
        entries,
        common_prefixes: root
            .children_named("CommonPrefixes")
            .filter_map(|p| p.child_text("Prefix"))
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaved_versions_and_markers() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
        <ListVersionsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
            <Name>bucket</Name><Prefix>doc</Prefix><KeyMarker></KeyMarker><VersionIdMarker></VersionIdMarker>
            <MaxKeys>1000</MaxKeys><IsTruncated>false</IsTruncated>
            <DeleteMarker><Key>doc.txt</Key><VersionId>v3</VersionId><IsLatest>true</IsLatest></DeleteMarker>
            <Version><Key>doc.txt</Key><VersionId>v2</VersionId><IsLatest>false</IsLatest><Size>12</Size></Version>
            <Version><Key>doc.txt</Key><VersionId>v1</VersionId><IsLatest>false</IsLatest><Size>10</Size></Version>
        </ListVersionsResult>"#;

        let output = decode_list_versions(xml).unwrap();
        assert_eq!(output.name, "bucket");
        assert_eq!(output.key_marker, None);
        let ids: Vec<_> = output.entries.iter().map(VersionEntry::version_id).collect();
        assert_eq!(ids, vec!["v3", "v2", "v1"]);
        assert!(matches!(output.entries[0], VersionEntry::DeleteMarker(_)));
        assert!(output.entries[0].is_latest());
        match &output.entries[1] {
            VersionEntry::Version(v) => assert_eq!(v.size, Some(12)),
            other => panic!("expected version, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_entry_kind_is_rejected() {
        let xml = b"<ListVersionsResult><Name>b</Name><Tombstone><Key>k</Key></Tombstone></ListVersionsResult>";
        assert!(matches!(
            decode_list_versions(xml),
            Err(ResponseError::UnknownElement { .. })
        ));
    }
}
