//! The client facade.
//!
//! Every service shares one [`RequestExecutor`]; services are created on
//! first use.

use crate::config::S3Config;
use crate::error::{S3Error, TransferError};
use crate::executor::RequestExecutor;
use crate::multipart::{MultipartUploadCoordinator, UploadSource};
use crate::services::{BucketsService, ObjectsService, PresignService};
use crate::signing::{Signer, SignerV4};
use crate::transport::{HttpTransport, ReqwestTransport, RequestBody};
use crate::types::{CompleteMultipartUploadOutput, CreateMultipartUploadRequest, PutObjectRequest};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Entry points to the storage operations.
pub trait S3Client: Send + Sync {
    /// Object reads, writes, copies and deletes.
    fn objects(&self) -> &ObjectsService;

    /// Bucket lifecycle and bucket-level settings.
    fn buckets(&self) -> &BucketsService;

    /// Multipart sessions started through this client.
    fn multipart(&self) -> &MultipartUploadCoordinator;

    /// Presigned URL generation.
    fn presign(&self) -> &PresignService;

    /// Settings the client was built with.
    fn config(&self) -> &S3Config;
}

/// Default [`S3Client`].
pub struct S3ClientImpl {
    executor: Arc<RequestExecutor>,

    objects: OnceCell<ObjectsService>,
    buckets: OnceCell<BucketsService>,
    multipart: OnceCell<MultipartUploadCoordinator>,
    presign: OnceCell<PresignService>,
}

/// What [`S3ClientImpl::upload`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Sent as one PUT.
    Single {
        /// ETag of the stored object.
        e_tag: Option<String>,
    },
    /// Sent as a multipart upload.
    Multipart(CompleteMultipartUploadOutput),
}

impl S3ClientImpl {
    /// Create a client over an explicit transport and signer.
    pub fn new(
        config: S3Config,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn Signer>,
    ) -> Result<Self, S3Error> {
        let executor = RequestExecutor::new(Arc::new(config), transport, signer)?;
        Ok(Self::from_executor(Arc::new(executor)))
    }

    /// Create a client sharing an existing executor.
    pub fn from_executor(executor: Arc<RequestExecutor>) -> Self {
        Self {
            executor,
            objects: OnceCell::new(),
            buckets: OnceCell::new(),
            multipart: OnceCell::new(),
            presign: OnceCell::new(),
        }
    }

    /// The request executor behind every service.
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// Upload an object, switching to multipart at the configured threshold.
    pub async fn upload(
        &self,
        request: CreateMultipartUploadRequest,
        source: impl Into<UploadSource>,
    ) -> Result<UploadOutcome, S3Error> {
        let source = source.into();
        let size = match &source {
            UploadSource::Bytes(bytes) => bytes.len() as u64,
            UploadSource::File(path) => tokio::fs::metadata(path)
                .await
                .map_err(|e| TransferError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?
                .len(),
        };

        if size >= self.config().multipart_threshold {
            return self
                .multipart()
                .upload(request, source)
                .await
                .map(UploadOutcome::Multipart);
        }

        let body = match source {
            UploadSource::Bytes(bytes) => RequestBody::from_bytes(bytes),
            UploadSource::File(path) => RequestBody::from_file(path),
        };
        let mut put = PutObjectRequest::new(request.bucket, request.key, body);
        put.content_type = request.content_type;
        put.storage_class = request.storage_class;
        put.acl = request.acl;
        put.metadata = request.metadata;

        let output = self.objects().put(put).await?;
        Ok(UploadOutcome::Single {
            e_tag: output.e_tag,
        })
    }
}

impl S3Client for S3ClientImpl {
    fn objects(&self) -> &ObjectsService {
        self.objects
            .get_or_init(|| ObjectsService::new(self.executor.clone()))
    }

    fn buckets(&self) -> &BucketsService {
        self.buckets
            .get_or_init(|| BucketsService::new(self.executor.clone()))
    }

    fn multipart(&self) -> &MultipartUploadCoordinator {
        self.multipart
            .get_or_init(|| MultipartUploadCoordinator::new(self.executor.clone()))
    }

    fn presign(&self) -> &PresignService {
        self.presign
            .get_or_init(|| PresignService::new(self.executor.clone()))
    }

    fn config(&self) -> &S3Config {
        self.executor.config()
    }
}

impl std::fmt::Debug for S3ClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ClientImpl")
            .field("config", self.executor.config())
            .finish_non_exhaustive()
    }
}

/// Assembles an [`S3ClientImpl`].
pub struct S3ClientBuilder {
    config: Option<S3Config>,
    from_env: bool,
    transport: Option<Arc<dyn HttpTransport>>,
    signer: Option<Arc<dyn Signer>>,
}

impl S3ClientBuilder {
    /// Builder with nothing set.
    pub fn new() -> Self {
        Self {
            config: None,
            from_env: false,
            transport: None,
            signer: None,
        }
    }

    /// Use `config` as is.
    pub fn config(mut self, config: S3Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Read settings from the environment when no config is given.
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Replace the reqwest transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the SigV4 signer.
    pub fn signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<S3ClientImpl, S3Error> {
        let config = match (self.config, self.from_env) {
            (Some(config), _) => config,
            (None, true) => S3Config::builder().from_env().build()?,
            (None, false) => S3Config::default(),
        };

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&config)?),
        };

        let signer = self.signer.unwrap_or_else(|| {
            Arc::new(SignerV4::new(
                config.credentials.clone(),
                config.region.clone(),
            ))
        });

        S3ClientImpl::new(config, transport, signer)
    }
}

impl Default for S3ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockTransport;

    #[test]
    fn test_builder_default() {
        let result = S3ClientBuilder::new().build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_builder_with_config() {
        let config = S3Config::builder()
            .endpoint("http://localhost:9000")
            .region("eu-west-1")
            .build()
            .unwrap();

        let client = S3ClientBuilder::new()
            .config(config)
            .transport(Arc::new(MockTransport::new()))
            .build()
            .unwrap();
        assert_eq!(client.config().region, "eu-west-1");
        assert_eq!(client.executor().endpoints().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_below_threshold_is_single_put() {
        use crate::mocks::{MockResponse, TestFixtures};

        let transport = Arc::new(MockTransport::with_default(
            MockResponse::ok().with_header("etag", "\"small\""),
        ));
        let client = TestFixtures::client(transport.clone());

        let outcome = client
            .upload(
                CreateMultipartUploadRequest::new("test-bucket", "small.txt"),
                b"tiny".to_vec(),
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            UploadOutcome::Single {
                e_tag: Some("\"small\"".to_string())
            }
        );
        assert_eq!(transport.request_count(), 1);
    }
}
