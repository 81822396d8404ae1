//! Buckets service for bucket operations and bucket configuration.

use super::objects::acl_body;
use crate::codec;
use crate::error::S3Error;
use crate::executor::{RequestExecutor, S3Request};
use crate::types::*;
use http::Method;
use std::sync::Arc;

/// Region whose buckets are created without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

/// Service for bucket operations.
pub struct BucketsService {
    executor: Arc<RequestExecutor>,
}

impl BucketsService {
    /// Create a new buckets service.
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Create a new bucket.
    ///
    /// Without an explicit location constraint the configured region is
    /// used, except for the default region which takes none.
    pub async fn create(&self, request: CreateBucketRequest) -> Result<CreateBucketOutput, S3Error> {
        let region = request
            .location_constraint
            .clone()
            .unwrap_or_else(|| self.executor.config().region.clone());

        let mut call = S3Request::new("CreateBucket", Method::PUT)
            .bucket(&request.bucket)
            .header_opt("x-amz-acl", request.acl.map(|a| a.as_str()));

        if region != DEFAULT_REGION && !region.is_empty() {
            call = call
                .header("content-type", "application/xml")
                .body(codec::build_create_bucket_xml(&region));
        }

        let response = self.executor.execute(call).await?;
        Ok(CreateBucketOutput {
            location: response.get_header("location").map(String::from),
        })
    }

    /// Delete an empty bucket.
    pub async fn delete(&self, bucket: impl Into<String>) -> Result<(), S3Error> {
        let call = S3Request::new("DeleteBucket", Method::DELETE).bucket(bucket);
        self.executor.execute(call).await?;
        Ok(())
    }

    /// Whether a bucket exists and is accessible.
    pub async fn exists(&self, bucket: impl Into<String>) -> Result<bool, S3Error> {
        let call = S3Request::new("HeadBucket", Method::HEAD).bucket(bucket);
        match self.executor.execute(call).await {
            Ok(_) => Ok(true),
            Err(e) if e.status_code() == Some(404) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List all buckets owned by the caller.
    pub async fn list(&self) -> Result<ListBucketsOutput, S3Error> {
        let call = S3Request::new("ListBuckets", Method::GET);
        let response = self.executor.execute(call).await?;
        Ok(codec::decode_list_buckets(&response.into_bytes().await?)?)
    }

    /// The bucket's location constraint; `None` for the default region.
    pub async fn location(&self, bucket: impl Into<String>) -> Result<Option<String>, S3Error> {
        let call = S3Request::new("GetBucketLocation", Method::GET)
            .bucket(bucket)
            .subresource("location");
        let response = self.executor.execute(call).await?;
        Ok(codec::decode_location(&response.into_bytes().await?)?)
    }

    /// Get the bucket's access control list.
    pub async fn get_acl(&self, bucket: impl Into<String>) -> Result<GetAclOutput, S3Error> {
        let call = S3Request::new("GetBucketAcl", Method::GET)
            .bucket(bucket)
            .subresource("acl");
        let response = self.executor.execute(call).await?;
        Ok(codec::decode_acl(&response.into_bytes().await?)?)
    }

    /// Set the bucket's access control list.
    pub async fn put_acl(&self, request: PutAclRequest) -> Result<(), S3Error> {
        let call = S3Request::new("PutBucketAcl", Method::PUT)
            .bucket(&request.bucket)
            .subresource("acl");
        self.executor.execute(acl_body(call, &request.acl)).await?;
        Ok(())
    }

    /// Get the bucket's versioning state.
    pub async fn get_versioning(
        &self,
        bucket: impl Into<String>,
    ) -> Result<VersioningConfiguration, S3Error> {
        let call = S3Request::new("GetBucketVersioning", Method::GET)
            .bucket(bucket)
            .subresource("versioning");
        let response = self.executor.execute(call).await?;
        Ok(codec::decode_versioning(&response.into_bytes().await?)?)
    }

    /// Enable or suspend versioning.
    pub async fn put_versioning(
        &self,
        bucket: impl Into<String>,
        status: VersioningStatus,
    ) -> Result<(), S3Error> {
        let call = S3Request::new("PutBucketVersioning", Method::PUT)
            .bucket(bucket)
            .subresource("versioning")
            .header("content-type", "application/xml")
            .body(codec::build_versioning_xml(status));
        self.executor.execute(call).await?;
        Ok(())
    }

    /// Get the bucket's lifecycle rules.
    pub async fn get_lifecycle(
        &self,
        bucket: impl Into<String>,
    ) -> Result<LifecycleConfiguration, S3Error> {
        let call = S3Request::new("GetBucketLifecycle", Method::GET)
            .bucket(bucket)
            .subresource("lifecycle");
        let response = self.executor.execute(call).await?;
        Ok(codec::decode_lifecycle(&response.into_bytes().await?)?)
    }

    /// Replace the bucket's lifecycle rules.
    pub async fn put_lifecycle(
        &self,
        bucket: impl Into<String>,
        config: &LifecycleConfiguration,
    ) -> Result<(), S3Error> {
        let xml = codec::build_lifecycle_xml(config);
        let call = S3Request::new("PutBucketLifecycle", Method::PUT)
            .bucket(bucket)
            .subresource("lifecycle")
            .header("content-type", "application/xml")
            .header("content-md5", codec::content_md5(xml.as_bytes()))
            .body(xml);
        self.executor.execute(call).await?;
        Ok(())
    }

    /// Remove the bucket's lifecycle rules.
    pub async fn delete_lifecycle(&self, bucket: impl Into<String>) -> Result<(), S3Error> {
        let call = S3Request::new("DeleteBucketLifecycle", Method::DELETE)
            .bucket(bucket)
            .subresource("lifecycle");
        self.executor.execute(call).await?;
        Ok(())
    }

    /// Get the bucket's CORS rules.
    pub async fn get_cors(&self, bucket: impl Into<String>) -> Result<CorsConfiguration, S3Error> {
        let call = S3Request::new("GetBucketCors", Method::GET)
            .bucket(bucket)
            .subresource("cors");
        let response = self.executor.execute(call).await?;
        Ok(codec::decode_cors(&response.into_bytes().await?)?)
    }

    /// Replace the bucket's CORS rules.
    pub async fn put_cors(
        &self,
        bucket: impl Into<String>,
        config: &CorsConfiguration,
    ) -> Result<(), S3Error> {
        let xml = codec::build_cors_xml(config);
        let call = S3Request::new("PutBucketCors", Method::PUT)
            .bucket(bucket)
            .subresource("cors")
            .header("content-type", "application/xml")
            .header("content-md5", codec::content_md5(xml.as_bytes()))
            .body(xml);
        self.executor.execute(call).await?;
        Ok(())
    }

    /// Remove the bucket's CORS rules.
    pub async fn delete_cors(&self, bucket: impl Into<String>) -> Result<(), S3Error> {
        let call = S3Request::new("DeleteBucketCors", Method::DELETE)
            .bucket(bucket)
            .subresource("cors");
        self.executor.execute(call).await?;
        Ok(())
    }
}
