//! Integration tests for the multipart upload coordinator.

use bytes::Bytes;
use http::Method;
use s3_compat::codec::Element;
use s3_compat::error::{codes, PreconditionError};
use s3_compat::mocks::{MockResponse, MockTransport, RecordedRequest, TestFixtures};
use s3_compat::multipart::{MultipartUploadCoordinator, SessionState};
use s3_compat::transport::RequestBody;
use s3_compat::types::*;
use s3_compat::S3Error;
use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const UPLOAD_ID: &str = "upload-1";

/// A service that accepts every part; part `flaky` fails `failures` times first.
fn multipart_server(
    flaky: u32,
    failures: u32,
) -> impl Fn(&RecordedRequest) -> MockResponse + Send + Sync {
    let attempts: Mutex<HashMap<u32, u32>> = Mutex::new(HashMap::new());
    move |request: &RecordedRequest| {
        if request.method == Method::POST && request.query_param("uploads").is_some() {
            return MockResponse::ok_with_body(TestFixtures::create_multipart_xml(UPLOAD_ID));
        }
        if request.method == Method::POST {
            return MockResponse::ok_with_body(TestFixtures::complete_multipart_xml());
        }
        if request.method == Method::DELETE {
            return MockResponse::no_content();
        }
        let part: u32 = request
            .query_param("partNumber")
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        let mut attempts = attempts.lock().unwrap();
        let seen = attempts.entry(part).or_insert(0);
        *seen += 1;
        if part == flaky && *seen <= failures {
            return MockResponse::error(
                503,
                TestFixtures::error_xml("ServiceUnavailable", "Please retry"),
            );
        }
        MockResponse::ok().with_header("etag", format!("\"etag-{}\"", part))
    }
}

fn coordinator(transport: Arc<MockTransport>) -> Arc<MultipartUploadCoordinator> {
    Arc::new(MultipartUploadCoordinator::new(TestFixtures::executor(
        TestFixtures::config(),
        transport,
    )))
}

fn completion_parts(request: &RecordedRequest) -> Vec<(u32, String)> {
    let root = Element::parse(&request.body).unwrap();
    root.children_named("Part")
        .map(|p| {
            (
                p.child_parse("PartNumber").unwrap(),
                p.child_text("ETag").unwrap(),
            )
        })
        .collect()
}

fn request() -> CreateMultipartUploadRequest {
    CreateMultipartUploadRequest::new("test-bucket", "test-key.txt")
}

#[tokio::test]
async fn test_concurrent_parts_with_retried_part_complete_in_order() {
    let transport = Arc::new(MockTransport::with_handler(multipart_server(2, 2)));
    let coordinator = coordinator(transport.clone());

    let session = coordinator.initiate(request()).await.unwrap();
    assert_eq!(session.upload_id(), UPLOAD_ID);
    assert_eq!(session.state(), SessionState::Initiated);

    let parts: Vec<(u32, RequestBody)> = (1..=4)
        .map(|n| (n, RequestBody::from(format!("part-{}", n))))
        .collect();
    let uploaded = coordinator
        .upload_parts(&session, parts, 4)
        .await
        .unwrap();
    assert_eq!(
        uploaded.iter().map(|p| p.part_number).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(session.state(), SessionState::PartsInFlight);

    let output = coordinator.complete(&session, None).await.unwrap();
    assert_eq!(output.e_tag.as_deref(), Some("\"combined-etag-4\""));
    assert_eq!(session.state(), SessionState::Completed);

    let requests = transport.requests();
    let part_two_attempts = requests
        .iter()
        .filter(|r| r.query_param("partNumber").as_deref() == Some("2"))
        .count();
    assert_eq!(part_two_attempts, 3);

    let complete = requests.last().unwrap();
    assert_eq!(complete.query_param("uploadId"), Some(UPLOAD_ID.to_string()));
    assert_eq!(
        completion_parts(complete),
        (1..=4)
            .map(|n| (n, format!("\"etag-{}\"", n)))
            .collect::<Vec<_>>()
    );
    assert!(coordinator.session(UPLOAD_ID).is_err());
}

#[tokio::test]
async fn test_complete_with_missing_parts_fails_without_request() {
    let transport = Arc::new(MockTransport::with_handler(multipart_server(0, 0)));
    let coordinator = coordinator(transport.clone());
    let session = coordinator.initiate(request()).await.unwrap();

    coordinator.upload_part(&session, 1, "one").await.unwrap();
    coordinator.upload_part(&session, 3, "three").await.unwrap();
    let sent = transport.send_count();

    let err = coordinator
        .complete(&session, Some(vec![1, 2, 3]))
        .await
        .unwrap_err();
    match err {
        S3Error::Precondition(PreconditionError::MissingParts { missing, .. }) => {
            assert_eq!(missing, vec![2]);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(transport.send_count(), sent);

    // The session stays usable after a rejected completion.
    coordinator.upload_part(&session, 2, "two").await.unwrap();
    coordinator
        .complete(&session, Some(vec![3, 1, 2]))
        .await
        .unwrap();
    let complete = transport.last_request().unwrap();
    assert_eq!(
        completion_parts(&complete)
            .into_iter()
            .map(|(n, _)| n)
            .collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn test_invalid_part_numbers_are_rejected_locally() {
    let transport = Arc::new(MockTransport::with_handler(multipart_server(0, 0)));
    let coordinator = coordinator(transport.clone());
    let session = coordinator.initiate(request()).await.unwrap();
    let sent = transport.send_count();

    for number in [0, 10_001] {
        let err = coordinator
            .upload_part(&session, number, "x")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            S3Error::Precondition(PreconditionError::InvalidPartNumber { .. })
        ));
    }
    coordinator.upload_part(&session, 1, "x").await.unwrap();
    let err = coordinator
        .complete(&session, Some(vec![1, 1]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        S3Error::Precondition(PreconditionError::DuplicatePart { part_number: 1 })
    ));
    assert_eq!(transport.send_count(), sent + 1);
}

#[tokio::test]
async fn test_abort_waits_for_in_flight_parts() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_response(MockResponse::ok_with_body(TestFixtures::create_multipart_xml(
        UPLOAD_ID,
    )));
    transport.queue_response(
        MockResponse::ok()
            .with_header("etag", "\"slow\"")
            .with_delay(Duration::from_millis(100)),
    );
    transport.queue_response(MockResponse::no_content());
    let coordinator = coordinator(transport.clone());
    let session = coordinator.initiate(request()).await.unwrap();

    let part = {
        let coordinator = coordinator.clone();
        let session = session.clone();
        tokio::spawn(async move { coordinator.upload_part(&session, 1, "slow part").await })
    };
    while session.parts_in_flight() == 0 {
        tokio::task::yield_now().await;
    }

    coordinator.abort(&session).await.unwrap();

    assert!(part.is_finished());
    assert_eq!(session.part_etag(1).as_deref(), Some("\"slow\""));
    assert_eq!(session.state(), SessionState::Aborted);
    assert_eq!(transport.last_request().unwrap().method, Method::DELETE);
    part.await.unwrap().unwrap();

    let err = coordinator.upload_part(&session, 2, "late").await.unwrap_err();
    assert!(matches!(
        err,
        S3Error::Precondition(PreconditionError::InvalidSessionState { .. })
    ));
    // A second abort is a no-op.
    coordinator.abort(&session).await.unwrap();
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn test_cancelled_completion_reopens_session() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_response(MockResponse::ok_with_body(TestFixtures::create_multipart_xml(
        UPLOAD_ID,
    )));
    transport.queue_response(
        MockResponse::ok()
            .with_header("etag", "\"slow\"")
            .with_delay(Duration::from_millis(200)),
    );
    transport.queue_response(MockResponse::ok().with_header("etag", "\"p2\""));
    let coordinator = coordinator(transport.clone());
    let session = coordinator.initiate(request()).await.unwrap();

    let part = {
        let coordinator = coordinator.clone();
        let session = session.clone();
        tokio::spawn(async move { coordinator.upload_part(&session, 1, "slow part").await })
    };
    while session.parts_in_flight() == 0 {
        tokio::task::yield_now().await;
    }

    let waited = tokio::time::timeout(
        Duration::from_millis(20),
        coordinator.complete(&session, None),
    )
    .await;
    assert!(waited.is_err());
    assert_eq!(session.state(), SessionState::PartsInFlight);

    part.await.unwrap().unwrap();
    coordinator.upload_part(&session, 2, "more").await.unwrap();
    assert_eq!(session.completed_parts().len(), 2);
    assert_eq!(transport.request_count(), 3);
}

#[tokio::test]
async fn test_abort_of_vanished_upload_succeeds() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::error(
        404,
        TestFixtures::error_xml(codes::NO_SUCH_UPLOAD, "The specified upload does not exist."),
    )));
    let coordinator = coordinator(transport);
    let session = coordinator.attach("test-bucket", "test-key.txt", "stale-upload");

    coordinator.abort(&session).await.unwrap();
    assert_eq!(session.state(), SessionState::Aborted);
    assert!(coordinator.active_uploads().is_empty());
}

#[tokio::test]
async fn test_completion_error_in_success_body_requires_abort() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_response(MockResponse::ok_with_body(TestFixtures::create_multipart_xml(
        UPLOAD_ID,
    )));
    transport.queue_response(MockResponse::ok().with_header("etag", "\"p1\""));
    transport.queue_response(MockResponse::ok_with_body(TestFixtures::error_xml(
        codes::INVALID_PART,
        "One or more of the specified parts could not be found.",
    )));
    transport.queue_response(MockResponse::no_content());
    let coordinator = coordinator(transport.clone());
    let session = coordinator.initiate(request()).await.unwrap();
    coordinator.upload_part(&session, 1, "data").await.unwrap();

    let err = coordinator.complete(&session, None).await.unwrap_err();
    assert_eq!(err.error_code(), Some(codes::INVALID_PART));
    assert_eq!(session.state(), SessionState::Completing);

    let again = coordinator.complete(&session, None).await.unwrap_err();
    assert!(matches!(
        again,
        S3Error::Precondition(PreconditionError::InvalidSessionState { .. })
    ));

    coordinator.abort(&session).await.unwrap();
    assert_eq!(session.state(), SessionState::Aborted);
}

#[tokio::test]
async fn test_completion_error_after_retry_reports_attempts() {
    let transport = Arc::new(MockTransport::new());
    transport.queue_response(MockResponse::ok_with_body(TestFixtures::create_multipart_xml(
        UPLOAD_ID,
    )));
    transport.queue_response(MockResponse::ok().with_header("etag", "\"p1\""));
    transport.queue_response(MockResponse::error(
        503,
        TestFixtures::error_xml("ServiceUnavailable", "Please retry"),
    ));
    transport.queue_response(MockResponse::ok_with_body(TestFixtures::error_xml(
        codes::INVALID_PART,
        "One or more of the specified parts could not be found.",
    )));
    let coordinator = coordinator(transport);
    let session = coordinator.initiate(request()).await.unwrap();
    coordinator.upload_part(&session, 1, "data").await.unwrap();

    let err = coordinator.complete(&session, None).await.unwrap_err();
    assert_eq!(err.error_code(), Some(codes::INVALID_PART));
    assert_eq!(err.attempts(), Some(2));
    assert!(err.was_retried());
}

#[tokio::test]
async fn test_upload_splits_file_into_parts() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let content: Vec<u8> = (0..95u8).collect();
    file.write_all(&content).unwrap();
    file.flush().unwrap();

    let transport = Arc::new(MockTransport::with_handler(multipart_server(0, 0)));
    let mut config = TestFixtures::config();
    config.multipart_part_size = 20;
    config.multipart_concurrency = 3;
    let coordinator =
        MultipartUploadCoordinator::new(TestFixtures::executor(config, transport.clone()));

    coordinator
        .upload(request(), file.path().to_path_buf())
        .await
        .unwrap();

    let mut parts: Vec<(u32, Bytes)> = transport
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::PUT)
        .map(|r| (r.query_param("partNumber").unwrap().parse().unwrap(), r.body))
        .collect();
    parts.sort_by_key(|(n, _)| *n);

    assert_eq!(parts.len(), 5);
    assert_eq!(parts[4].1.len(), 15);
    let rebuilt: Vec<u8> = parts.iter().flat_map(|(_, b)| b.to_vec()).collect();
    assert_eq!(rebuilt, content);
}

#[tokio::test]
async fn test_failed_upload_is_aborted() {
    let transport = Arc::new(MockTransport::with_handler(|request: &RecordedRequest| {
        if request.method == Method::POST {
            return MockResponse::ok_with_body(TestFixtures::create_multipart_xml(UPLOAD_ID));
        }
        if request.method == Method::DELETE {
            return MockResponse::no_content();
        }
        if request.query_param("partNumber").as_deref() == Some("2") {
            return MockResponse::error(403, TestFixtures::error_xml("AccessDenied", "denied"));
        }
        MockResponse::ok().with_header("etag", "\"ok\"")
    }));
    let mut config = TestFixtures::config();
    config.multipart_part_size = 4;
    let coordinator =
        MultipartUploadCoordinator::new(TestFixtures::executor(config, transport.clone()));

    let err = coordinator
        .upload(request(), Bytes::from_static(b"0123456789"))
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), Some("AccessDenied"));
    let requests = transport.requests();
    assert_eq!(requests.last().unwrap().method, Method::DELETE);
    assert!(!requests
        .iter()
        .any(|r| r.method == Method::POST && r.query_param("uploadId").is_some()));
}

#[tokio::test]
async fn test_list_parts_and_uploads() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::ok_with_body(
            r#"<ListPartsResult>
                <Bucket>test-bucket</Bucket><Key>k</Key><UploadId>u1</UploadId>
                <PartNumberMarker>0</PartNumberMarker><NextPartNumberMarker>2</NextPartNumberMarker>
                <MaxParts>2</MaxParts><IsTruncated>true</IsTruncated>
                <Part><PartNumber>1</PartNumber><ETag>"a"</ETag><Size>5</Size></Part>
                <Part><PartNumber>2</PartNumber><ETag>"b"</ETag><Size>5</Size></Part>
            </ListPartsResult>"#,
        ),
        MockResponse::ok_with_body(
            r#"<ListMultipartUploadsResult>
                <Bucket>test-bucket</Bucket><IsTruncated>false</IsTruncated>
                <Upload><Key>k</Key><UploadId>u1</UploadId><Initiated>2024-01-01T00:00:00.000Z</Initiated></Upload>
            </ListMultipartUploadsResult>"#,
        ),
    ]));
    let coordinator = coordinator(transport.clone());

    let mut list = ListPartsRequest::new("test-bucket", "k", "u1");
    list.max_parts = Some(2);
    let parts = coordinator.list_parts(list).await.unwrap();
    assert!(parts.is_truncated);
    assert_eq!(parts.next_part_number_marker, Some(2));
    assert_eq!(parts.parts.len(), 2);
    assert_eq!(
        transport.requests()[0].query_param("max-parts"),
        Some("2".to_string())
    );

    let uploads = coordinator
        .list_uploads(ListMultipartUploadsRequest::new("test-bucket"))
        .await
        .unwrap();
    assert_eq!(uploads.uploads[0].upload_id, "u1");
}
