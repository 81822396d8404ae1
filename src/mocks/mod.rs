//! Mock implementations for testing.
//!
//! [`MockTransport`] replaces the HTTP layer; [`TestFixtures`] builds
//! clients wired to it and provides canned response documents.

mod transport;

pub use transport::{MockResponse, MockTransport, RecordedRequest};

use crate::client::S3ClientImpl;
use crate::config::S3Config;
use crate::credentials::AwsCredentials;
use crate::executor::RequestExecutor;
use crate::resilience::RetryConfig;
use crate::signing::SignerV4;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Endpoint used by fixture configurations.
pub const TEST_ENDPOINT: &str = "http://localhost:9000";

/// Test fixtures.
pub struct TestFixtures;

impl TestFixtures {
    /// Configuration with test credentials, one endpoint and fast retries.
    pub fn config() -> S3Config {
        Self::config_with_endpoints(&[TEST_ENDPOINT])
    }

    /// Configuration over several endpoints.
    pub fn config_with_endpoints(endpoints: &[&str]) -> S3Config {
        S3Config {
            endpoints: endpoints
                .iter()
                .filter_map(|e| Url::parse(e).ok())
                .collect(),
            credentials: Some(AwsCredentials::new("AKIDTEST", "SECRETTEST")),
            retry: RetryConfig::new(3)
                .with_initial_backoff(Duration::from_millis(1))
                .with_max_backoff(Duration::from_millis(20))
                .with_jitter(false),
            ..S3Config::default()
        }
    }

    /// Executor over `transport` using `config`.
    pub fn executor(config: S3Config, transport: Arc<MockTransport>) -> Arc<RequestExecutor> {
        let signer = Arc::new(SignerV4::new(
            config.credentials.clone(),
            config.region.clone(),
        ));
        match RequestExecutor::new(Arc::new(config), transport, signer) {
            Ok(executor) => Arc::new(executor),
            Err(e) => panic!("fixture configuration rejected: {}", e),
        }
    }

    /// Client over `transport` with the default fixture configuration.
    pub fn client(transport: Arc<MockTransport>) -> S3ClientImpl {
        S3ClientImpl::from_executor(Self::executor(Self::config(), transport))
    }

    /// Sample ListObjects response.
    pub fn list_objects_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Name>test-bucket</Name>
    <Prefix></Prefix>
    <Marker></Marker>
    <MaxKeys>1000</MaxKeys>
    <IsTruncated>false</IsTruncated>
    <Contents>
        <Key>file1.txt</Key>
        <LastModified>2024-01-15T10:30:00.000Z</LastModified>
        <ETag>"abc123"</ETag>
        <Size>1024</Size>
        <StorageClass>STANDARD</StorageClass>
    </Contents>
    <Contents>
        <Key>file2.txt</Key>
        <LastModified>2024-01-16T11:30:00.000Z</LastModified>
        <ETag>"def456"</ETag>
        <Size>2048</Size>
        <StorageClass>STANDARD_IA</StorageClass>
    </Contents>
    <CommonPrefixes>
        <Prefix>photos/</Prefix>
    </CommonPrefixes>
</ListBucketResult>"#
    }

    /// Sample ListBuckets response.
    pub fn list_buckets_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Owner>
        <ID>owner-id</ID>
        <DisplayName>Owner Name</DisplayName>
    </Owner>
    <Buckets>
        <Bucket>
            <Name>bucket1</Name>
            <CreationDate>2024-01-01T00:00:00.000Z</CreationDate>
        </Bucket>
        <Bucket>
            <Name>bucket2</Name>
            <CreationDate>2024-01-02T00:00:00.000Z</CreationDate>
        </Bucket>
    </Buckets>
</ListAllMyBucketsResult>"#
    }

    /// Error document with `code` and `message`.
    pub fn error_xml(code: &str, message: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
    <Code>{}</Code>
    <Message>{}</Message>
    <RequestId>test-request-id</RequestId>
</Error>"#,
            code, message
        )
    }

    /// Sample InitiateMultipartUpload response.
    pub fn create_multipart_xml(upload_id: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<InitiateMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Bucket>test-bucket</Bucket>
    <Key>test-key.txt</Key>
    <UploadId>{}</UploadId>
</InitiateMultipartUploadResult>"#,
            upload_id
        )
    }

    /// Sample CompleteMultipartUpload response.
    pub fn complete_multipart_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<CompleteMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Location>http://localhost:9000/test-bucket/test-key.txt</Location>
    <Bucket>test-bucket</Bucket>
    <Key>test-key.txt</Key>
    <ETag>"combined-etag-4"</ETag>
</CompleteMultipartUploadResult>"#
    }

    /// DeleteResult with the given `<Deleted>` keys and `<Error>` entries.
    pub fn delete_result_xml(deleted: &[&str], errors: &[(&str, &str)]) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<DeleteResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#,
        );
        for key in deleted {
            xml.push_str(&format!("<Deleted><Key>{}</Key></Deleted>", key));
        }
        for (key, code) in errors {
            xml.push_str(&format!(
                "<Error><Key>{}</Key><Code>{}</Code><Message>failed</Message></Error>",
                key, code
            ));
        }
        xml.push_str("</DeleteResult>");
        xml
    }

    /// Sample ListVersions response mixing versions and delete markers.
    pub fn list_versions_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListVersionsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Name>test-bucket</Name>
    <Prefix></Prefix>
    <KeyMarker></KeyMarker>
    <VersionIdMarker></VersionIdMarker>
    <MaxKeys>1000</MaxKeys>
    <IsTruncated>false</IsTruncated>
    <DeleteMarker>
        <Key>doc.txt</Key>
        <VersionId>v3</VersionId>
        <IsLatest>true</IsLatest>
        <LastModified>2024-01-03T00:00:00.000Z</LastModified>
    </DeleteMarker>
    <Version>
        <Key>doc.txt</Key>
        <VersionId>v2</VersionId>
        <IsLatest>false</IsLatest>
        <LastModified>2024-01-02T00:00:00.000Z</LastModified>
        <ETag>"e2"</ETag>
        <Size>20</Size>
        <StorageClass>STANDARD</StorageClass>
    </Version>
    <Version>
        <Key>doc.txt</Key>
        <VersionId>v1</VersionId>
        <IsLatest>false</IsLatest>
        <LastModified>2024-01-01T00:00:00.000Z</LastModified>
        <ETag>"e1"</ETag>
        <Size>10</Size>
        <StorageClass>STANDARD</StorageClass>
    </Version>
</ListVersionsResult>"#
    }

    /// Headers of a successful GET response.
    pub fn get_object_headers(length: usize) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        headers.insert("content-length".to_string(), length.to_string());
        headers.insert("etag".to_string(), "\"abc123\"".to_string());
        headers.insert(
            "last-modified".to_string(),
            "Mon, 15 Jan 2024 10:30:00 GMT".to_string(),
        );
        headers.insert("x-amz-request-id".to_string(), "test-request-id".to_string());
        headers
    }
}
