//! Integration tests for the request executor's retry and failover behavior.

use bytes::Bytes;
use futures::stream;
use http::Method;
use s3_compat::error::NetworkError;
use s3_compat::executor::{AttemptOutcome, S3Request};
use s3_compat::mocks::{MockResponse, MockTransport, TestFixtures};
use s3_compat::transport::{ByteStream, RequestBody};
use s3_compat::S3Error;
use std::sync::Arc;
use std::time::Duration;

fn unavailable() -> MockResponse {
    MockResponse::error(
        503,
        TestFixtures::error_xml("ServiceUnavailable", "Please reduce your request rate."),
    )
}

fn put(body: impl Into<RequestBody>) -> S3Request {
    S3Request::new("PutObject", Method::PUT)
        .bucket("test-bucket")
        .key("key")
        .body(body)
}

#[tokio::test]
async fn test_server_errors_are_retried_with_growing_backoff() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        unavailable(),
        unavailable(),
        unavailable(),
        MockResponse::ok().with_header("etag", "\"done\""),
    ]));
    let executor = TestFixtures::executor(TestFixtures::config(), transport.clone());

    let executed = executor.execute_recorded(put("payload")).await.unwrap();

    assert_eq!(executed.response.etag(), Some("\"done\""));
    assert_eq!(executed.attempts.len(), 4);
    assert_eq!(executed.attempts[3].outcome, AttemptOutcome::Success);
    let backoffs: Vec<Duration> = executed.attempts[..3]
        .iter()
        .map(|a| a.backoff.unwrap())
        .collect();
    assert!(backoffs.windows(2).all(|w| w[0] < w[1]), "{:?}", backoffs);

    // Every attempt carries the full body and a fresh signature.
    for request in transport.requests() {
        assert_eq!(request.body_text(), "payload");
        assert!(request.header("authorization").is_some());
        assert!(request.header("x-amz-date").is_some());
    }
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let transport = Arc::new(MockTransport::with_default(unavailable()));
    let executor = TestFixtures::executor(TestFixtures::config(), transport.clone());

    let err = executor.execute(put("payload")).await.unwrap_err();

    assert!(matches!(err.root(), S3Error::Server(_)));
    assert_eq!(err.attempts(), Some(4));
    assert!(err.was_retried());
    assert_eq!(err.operation(), Some("PutObject"));
    assert_eq!(transport.request_count(), 4);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::error(
        403,
        TestFixtures::error_xml("AccessDenied", "Access Denied"),
    )));
    let executor = TestFixtures::executor(TestFixtures::config(), transport.clone());

    let err = executor.execute(put("payload")).await.unwrap_err();
    assert!(matches!(err.root(), S3Error::Client(_)));
    assert_eq!(err.attempts(), Some(1));
    assert_eq!(transport.request_count(), 1);
}

#[tokio::test]
async fn test_throttling_is_retried() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        MockResponse::error(503, TestFixtures::error_xml("SlowDown", "Slow down")),
        MockResponse::ok(),
    ]));
    let executor = TestFixtures::executor(TestFixtures::config(), transport.clone());

    let executed = executor.execute_recorded(put("payload")).await.unwrap();
    assert_eq!(executed.attempts.len(), 2);
    assert!(matches!(
        executed.attempts[0].outcome,
        AttemptOutcome::RetryableError(_)
    ));
}

#[tokio::test]
async fn test_consumed_stream_is_not_resent() {
    let transport = Arc::new(MockTransport::with_default(unavailable()));
    let executor = TestFixtures::executor(TestFixtures::config(), transport.clone());

    let chunks: Vec<std::io::Result<Bytes>> = vec![
        Ok(Bytes::from_static(b"stream")),
        Ok(Bytes::from_static(b"ed")),
    ];
    let body = RequestBody::from_stream(stream::iter(chunks), Some(8));
    let err = executor.execute(put(body)).await.unwrap_err();

    assert!(matches!(err.root(), S3Error::Server(_)));
    assert_eq!(err.attempts(), Some(1));
    assert_eq!(transport.requests()[0].body_text(), "streamed");
}

#[tokio::test]
async fn test_replayable_stream_is_rebuilt_per_attempt() {
    let transport = Arc::new(MockTransport::with_responses(vec![
        unavailable(),
        MockResponse::ok(),
    ]));
    let executor = TestFixtures::executor(TestFixtures::config(), transport.clone());

    let body = RequestBody::from_factory(Some(5), || -> ByteStream {
        let chunks: Vec<std::io::Result<Bytes>> = vec![Ok(Bytes::from_static(b"fresh"))];
        Box::pin(stream::iter(chunks))
    });
    executor.execute(put(body)).await.unwrap();

    let bodies: Vec<String> = transport.requests().iter().map(|r| r.body_text()).collect();
    assert_eq!(bodies, vec!["fresh", "fresh"]);
}

#[tokio::test]
async fn test_unreachable_endpoint_fails_over() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok()).fail_connections(1));
    let config = TestFixtures::config_with_endpoints(&["http://10.0.0.1:9020", "http://10.0.0.2:9020"]);
    let executor = TestFixtures::executor(config, transport.clone());

    let executed = executor.execute_recorded(put("payload")).await.unwrap();

    assert_eq!(executed.attempts.len(), 2);
    assert!(executed.attempts[0].endpoint.contains("10.0.0.1"));
    assert!(executed.attempts[1].endpoint.contains("10.0.0.2"));
    let served = transport.last_request().unwrap();
    assert_eq!(served.url.host_str(), Some("10.0.0.2"));
    assert_eq!(served.header("host"), Some("10.0.0.2:9020"));
}

#[tokio::test]
async fn test_calls_rotate_over_endpoints() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok()));
    let config = TestFixtures::config_with_endpoints(&["http://10.0.0.1:9020", "http://10.0.0.2:9020"]);
    let executor = TestFixtures::executor(config, transport.clone());

    for _ in 0..4 {
        executor.execute(put("x")).await.unwrap();
    }
    let hosts: Vec<String> = transport
        .requests()
        .iter()
        .map(|r| r.url.host_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(hosts, vec!["10.0.0.1", "10.0.0.2", "10.0.0.1", "10.0.0.2"]);
}

#[tokio::test]
async fn test_missing_credentials_fail_before_sending() {
    let transport = Arc::new(MockTransport::with_default(MockResponse::ok()));
    let mut config = TestFixtures::config();
    config.credentials = None;
    let executor = TestFixtures::executor(config, transport.clone());

    let err = executor.execute(put("payload")).await.unwrap_err();
    assert!(matches!(err.root(), S3Error::Signing(_)));
    assert_eq!(err.attempts(), Some(1));
    assert_eq!(transport.send_count(), 0);
}

#[tokio::test]
async fn test_backoff_past_deadline_stops_the_call() {
    let transport = Arc::new(MockTransport::with_default(unavailable()));
    let mut config = TestFixtures::config();
    config.operation_timeout = Duration::from_millis(250);
    config.retry = s3_compat::RetryConfig::new(5)
        .with_initial_backoff(Duration::from_millis(300))
        .with_jitter(false);
    let executor = TestFixtures::executor(config, transport.clone());

    let started = std::time::Instant::now();
    let err = executor.execute(put("payload")).await.unwrap_err();

    assert!(matches!(err.root(), S3Error::Server(_)));
    assert_eq!(err.attempts(), Some(1));
    assert_eq!(transport.send_count(), 1);
    assert!(started.elapsed() < Duration::from_millis(250));
}

#[tokio::test]
async fn test_operation_deadline_covers_all_attempts() {
    let transport = Arc::new(MockTransport::with_default(
        MockResponse::ok().with_delay(Duration::from_millis(500)),
    ));
    let mut config = TestFixtures::config();
    config.operation_timeout = Duration::from_millis(50);
    let executor = TestFixtures::executor(config, transport);

    let err = executor.execute(put("payload")).await.unwrap_err();
    assert!(matches!(
        err.root(),
        S3Error::Connectivity(NetworkError::Timeout { .. })
    ));
    assert_eq!(err.attempts(), Some(1));
}
