//! Presign service for generating presigned URLs.

use crate::error::S3Error;
use crate::executor::{RequestExecutor, S3Request};
use crate::types::PresignedUrl;
use chrono::Utc;
use http::Method;
use std::sync::Arc;
use std::time::Duration;

/// Service for generating presigned URLs.
pub struct PresignService {
    executor: Arc<RequestExecutor>,
}

impl PresignService {
    /// Create a new presign service.
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Presigned URL for downloading an object.
    pub fn presign_get(
        &self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        version_id: Option<String>,
        expires_in: Duration,
    ) -> Result<PresignedUrl, S3Error> {
        let request = S3Request::new("GetObject", Method::GET)
            .bucket(bucket)
            .key(key)
            .query_opt("versionId", version_id);
        self.presign(request, expires_in)
    }

    /// Presigned URL for uploading an object.
    pub fn presign_put(
        &self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        expires_in: Duration,
    ) -> Result<PresignedUrl, S3Error> {
        let request = S3Request::new("PutObject", Method::PUT)
            .bucket(bucket)
            .key(key);
        self.presign(request, expires_in)
    }

    fn presign(&self, request: S3Request, expires_in: Duration) -> Result<PresignedUrl, S3Error> {
        let url = self.executor.url_for(&request)?;
        let now = Utc::now();
        let signed = self
            .executor
            .signer()
            .presign(request.method.as_str(), &url, expires_in, now)?;
        let expires_at = now
            + chrono::Duration::from_std(expires_in).unwrap_or_else(|_| chrono::Duration::zero());

        Ok(PresignedUrl {
            url: signed,
            method: request.method.to_string(),
            expires_at,
        })
    }
}
