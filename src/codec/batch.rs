//! Batch delete result decoding.

use super::documents::expect_root;
use super::Element;
use crate::batch::{DeleteFailure, DeleteOutcome, DeleteSuccess};
use crate::error::ResponseError;

const DOCUMENT: &str = "DeleteResult";

/// Decode a DeleteResult document into per-key outcomes, in document order.
///
/// `<Deleted>` entries become successes and `<Error>` entries failures; any
/// other entry is a protocol violation.
pub fn decode_delete_result(body: &[u8]) -> Result<Vec<DeleteOutcome>, ResponseError> {
    let root = Element::parse(body)?;
    expect_root(&root, DOCUMENT)?;

    root.children
        .iter()
        .map(|entry| match entry.name.as_str() {
            "Deleted" => Ok(DeleteOutcome::Success(DeleteSuccess {
                key: entry.required_text("Key", DOCUMENT)?,
                version_id: entry.child_text("VersionId"),
                delete_marker: entry.child_bool("DeleteMarker"),
                delete_marker_version_id: entry.child_text("DeleteMarkerVersionId"),
            })),
            "Error" => Ok(DeleteOutcome::Error(DeleteFailure {
                key: entry.required_text("Key", DOCUMENT)?,
                version_id: entry.child_text("VersionId"),
                code: entry.required_text("Code", DOCUMENT)?,
                message: entry.child_text("Message").unwrap_or_default(),
            })),
            other => Err(ResponseError::UnknownElement {
                element: other.to_string(),
                document: DOCUMENT,
            }),
        })
        .collect()
}
