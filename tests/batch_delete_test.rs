//! Integration tests for batch delete and result reconciliation.

use s3_compat::batch::{DeleteOutcome, UNREPORTED_CODE};
use s3_compat::codec::{self, Element};
use s3_compat::error::ResponseError;
use s3_compat::mocks::{MockResponse, MockTransport, RecordedRequest, TestFixtures};
use s3_compat::types::*;
use s3_compat::{S3Client, S3Error};
use std::sync::Arc;

/// Reports every submitted key as deleted.
fn delete_everything(request: &RecordedRequest) -> MockResponse {
    let root = Element::parse(&request.body).unwrap();
    let keys: Vec<String> = root
        .children_named("Object")
        .map(|o| o.child_text("Key").unwrap())
        .collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    MockResponse::ok_with_body(TestFixtures::delete_result_xml(&refs, &[]))
}

#[tokio::test]
async fn test_partial_failure_and_omitted_key() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok_with_body(
        TestFixtures::delete_result_xml(&["a"], &[("b", "AccessDenied")]),
    )));
    let client = TestFixtures::client(transport.clone());

    let result = client
        .objects()
        .delete_objects(DeleteObjectsRequest::new("test-bucket", ["a", "b", "c"]))
        .await
        .unwrap();

    let outcomes = result.outcomes();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(
        outcomes.iter().map(DeleteOutcome::key).collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );
    assert!(outcomes[0].is_success());
    assert_eq!(outcomes[1].error_code(), Some("AccessDenied"));
    assert_eq!(outcomes[2].error_code(), Some(UNREPORTED_CODE));
    assert!(!result.all_succeeded());
    assert_eq!(result.failures().count(), 2);

    let recorded = transport.last_request().unwrap();
    assert_eq!(recorded.query_param("delete"), Some(String::new()));
    assert_eq!(
        recorded.header("content-md5"),
        Some(codec::content_md5(&recorded.body).as_str())
    );
    assert!(!recorded.body_text().contains("<Quiet>true</Quiet>"));
}

#[tokio::test]
async fn test_versioned_keys_are_matched_by_version() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok_with_body(
        r#"<DeleteResult>
            <Deleted><Key>doc</Key><VersionId>v2</VersionId></Deleted>
            <Error><Key>doc</Key><VersionId>v1</VersionId><Code>AccessDenied</Code><Message>no</Message></Error>
        </DeleteResult>"#,
    )));
    let client = TestFixtures::client(transport);

    let objects = vec![
        ObjectIdentifier::with_version("doc", "v1"),
        ObjectIdentifier::with_version("doc", "v2"),
    ];
    let result = client
        .objects()
        .delete_objects(DeleteObjectsRequest::new("test-bucket", objects))
        .await
        .unwrap();

    let outcomes = result.outcomes();
    assert_eq!(outcomes[0].version_id(), Some("v1"));
    assert!(!outcomes[0].is_success());
    assert_eq!(outcomes[1].version_id(), Some("v2"));
    assert!(outcomes[1].is_success());
}

#[tokio::test]
async fn test_unrequested_key_is_protocol_violation() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok_with_body(
        TestFixtures::delete_result_xml(&["a", "zzz"], &[]),
    )));
    let client = TestFixtures::client(transport);

    let err = client
        .objects()
        .delete_objects(DeleteObjectsRequest::new("test-bucket", ["a"]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        S3Error::MalformedResponse(ResponseError::UnexpectedKey { ref key }) if key == "zzz"
    ));
}

#[tokio::test]
async fn test_unknown_result_element_is_protocol_violation() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok_with_body(
        "<DeleteResult><Deleted><Key>a</Key></Deleted><Skipped><Key>b</Key></Skipped></DeleteResult>",
    )));
    let client = TestFixtures::client(transport);

    let err = client
        .objects()
        .delete_objects(DeleteObjectsRequest::new("test-bucket", ["a", "b"]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        S3Error::MalformedResponse(ResponseError::UnknownElement { ref element, .. })
            if element == "Skipped"
    ));
}

#[tokio::test]
async fn test_large_batches_are_chunked() {
    let transport = Arc::new(MockTransport::with_handler(delete_everything));
    let client = TestFixtures::client(transport.clone());

    let keys: Vec<String> = (0..2500).map(|i| format!("key-{:05}", i)).collect();
    let result = client
        .objects()
        .delete_objects(DeleteObjectsRequest::new("test-bucket", keys.clone()))
        .await
        .unwrap();

    assert_eq!(transport.request_count(), 3);
    assert_eq!(result.len(), 2500);
    assert!(result.all_succeeded());
    let returned: Vec<&str> = result.outcomes().iter().map(DeleteOutcome::key).collect();
    assert_eq!(returned, keys.iter().map(String::as_str).collect::<Vec<_>>());

    let sizes: Vec<usize> = transport
        .requests()
        .iter()
        .map(|r| {
            Element::parse(&r.body)
                .unwrap()
                .children_named("Object")
                .count()
        })
        .collect();
    assert_eq!(sizes, vec![1000, 1000, 500]);
}

#[tokio::test]
async fn test_whole_request_failure_is_an_error() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::error(
        403,
        TestFixtures::error_xml("AccessDenied", "Access Denied"),
    )));
    let client = TestFixtures::client(transport);

    let err = client
        .objects()
        .delete_objects(DeleteObjectsRequest::new("test-bucket", ["a"]))
        .await
        .unwrap_err();
    assert_eq!(err.operation(), Some("DeleteObjects"));
    assert_eq!(err.error_code(), Some("AccessDenied"));
}
