//! End-to-end tests over the reqwest transport against a local mock server.

use s3_compat::error::NetworkError;
use s3_compat::types::*;
use s3_compat::{AwsCredentials, S3Client, S3ClientBuilder, S3Config, S3Error};
use std::time::Duration;
use wiremock::matchers::{body_string, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(uri: &str) -> s3_compat::S3ClientImpl {
    let config = S3Config::builder()
        .endpoint(uri)
        .region("us-east-1")
        .credentials(AwsCredentials::new("AKIDTEST", "SECRETTEST"))
        .retry(
            s3_compat::RetryConfig::new(2)
                .with_initial_backoff(Duration::from_millis(1))
                .with_jitter(false),
        )
        .build()
        .unwrap();
    S3ClientBuilder::new().config(config).build().unwrap()
}

#[tokio::test]
async fn test_put_and_get_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/test-bucket/dir/hello.txt"))
        .and(header_exists("authorization"))
        .and(header_exists("x-amz-date"))
        .and(header("content-type", "text/plain"))
        .and(body_string("Hello!"))
        .respond_with(ResponseTemplate::new(200).insert_header("etag", "\"e1\""))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/test-bucket/dir/hello.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("Hello!"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let put = client
        .objects()
        .put(PutObjectRequest::new("test-bucket", "dir/hello.txt", "Hello!").with_content_type("text/plain"))
        .await
        .unwrap();
    assert_eq!(put.e_tag.as_deref(), Some("\"e1\""));

    let got = client
        .objects()
        .get(GetObjectRequest::new("test-bucket", "dir/hello.txt"))
        .await
        .unwrap();
    assert_eq!(&got.body[..], b"Hello!");
    assert_eq!(got.metadata.content_type.as_deref(), Some("text/plain"));
}

#[tokio::test]
async fn test_streaming_file_upload_and_download() {
    let server = MockServer::start().await;
    let content = "file content ".repeat(1000);
    Mock::given(method("PUT"))
        .and(path("/test-bucket/big"))
        .and(header("x-amz-content-sha256", "UNSIGNED-PAYLOAD"))
        .and(body_string(content.clone()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/test-bucket/big"))
        .respond_with(ResponseTemplate::new(200).set_body_string(content.clone()))
        .mount(&server)
        .await;

    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), &content).unwrap();

    let client = client_for(&server.uri());
    client
        .objects()
        .put(PutObjectRequest::new(
            "test-bucket",
            "big",
            s3_compat::RequestBody::from_file(file.path()),
        ))
        .await
        .unwrap();

    let stream = client
        .objects()
        .get_stream(GetObjectRequest::new("test-bucket", "big"))
        .await
        .unwrap();
    let body = stream.collect().await.unwrap();
    assert_eq!(body.len(), content.len());
}

#[tokio::test]
async fn test_service_error_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test-bucket/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("x-amz-request-id", "REQ123")
                .set_body_string(
                    "<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>",
                ),
        )
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let err = client
        .objects()
        .get(GetObjectRequest::new("test-bucket", "missing"))
        .await
        .unwrap_err();

    assert_eq!(err.error_code(), Some("NoSuchKey"));
    assert_eq!(err.request_id(), Some("REQ123"));
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn test_server_errors_are_retried_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/test-bucket/k"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/test-bucket/k"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    client.objects().delete("test-bucket", "k").await.unwrap();

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

#[tokio::test]
async fn test_subresource_query_is_signed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test-bucket"))
        .and(query_param("versioning", ""))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<VersioningConfiguration><Status>Suspended</Status></VersioningConfiguration>",
        ))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let config = client.buckets().get_versioning("test-bucket").await.unwrap();
    assert_eq!(config.status, Some(VersioningStatus::Suspended));
}

#[tokio::test]
async fn test_refused_connection_is_connectivity_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let client = client_for(&format!("http://127.0.0.1:{}", port));
    let err = client.buckets().list().await.unwrap_err();

    assert!(matches!(
        err.root(),
        S3Error::Connectivity(NetworkError::ConnectionFailed { .. })
    ));
    assert_eq!(err.attempts(), Some(3));
}

#[tokio::test]
async fn test_read_timeout_bounds_header_wait() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/test-bucket/slow.txt"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = S3Config::builder()
        .endpoint(&server.uri())
        .credentials(AwsCredentials::new("AKIDTEST", "SECRETTEST"))
        .read_timeout(Duration::from_millis(100))
        .retry(s3_compat::RetryConfig::no_retry())
        .build()
        .unwrap();
    let client = S3ClientBuilder::new().config(config).build().unwrap();

    let err = client
        .objects()
        .get(GetObjectRequest::new("test-bucket", "slow.txt"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.root(),
        S3Error::Connectivity(NetworkError::Timeout { duration }) if *duration == Duration::from_millis(100)
    ));
}
