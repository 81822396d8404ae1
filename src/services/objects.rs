//! Objects service for object operations.

use crate::batch::{BatchResult, BatchResultReconciler};
use crate::codec;
use crate::error::{PreconditionError, S3Error};
use crate::executor::{RequestExecutor, S3Request};
use crate::transport::HttpResponse;
use crate::types::*;
use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Maximum number of keys in one batch delete request.
pub const MAX_DELETE_BATCH: usize = 1000;

/// Service for object operations.
pub struct ObjectsService {
    executor: Arc<RequestExecutor>,
}

impl ObjectsService {
    /// Create a new objects service.
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Put an object into a bucket.
    ///
    /// With a range set the body replaces that byte range of an existing
    /// object instead of the whole object.
    pub async fn put(&self, request: PutObjectRequest) -> Result<PutObjectOutput, S3Error> {
        let operation = if request.range.is_some() {
            "PutObjectRange"
        } else {
            "PutObject"
        };

        let mut call = S3Request::new(operation, Method::PUT)
            .bucket(&request.bucket)
            .key(&request.key)
            .range(request.range)
            .header_opt("content-type", request.content_type.clone())
            .header_opt("content-encoding", request.content_encoding.clone())
            .header_opt("content-disposition", request.content_disposition.clone())
            .header_opt("cache-control", request.cache_control.clone())
            .header_opt(
                "x-amz-storage-class",
                request.storage_class.map(|c| c.as_str()),
            )
            .header_opt("x-amz-acl", request.acl.map(|a| a.as_str()));

        if request.compute_md5 {
            if let Some(bytes) = request.body.as_bytes() {
                call = call.header("content-md5", codec::content_md5(bytes));
            }
        }
        for (key, value) in &request.metadata {
            call = call.header(format!("x-amz-meta-{}", key), value.clone());
        }

        let response = self.executor.execute(call.body(request.body)).await?;

        Ok(PutObjectOutput {
            e_tag: response.etag().map(String::from),
            version_id: response.get_header("x-amz-version-id").map(String::from),
            request_id: response.request_id().map(String::from),
        })
    }

    /// Replace `range` of an existing object with `body`.
    pub async fn put_range(
        &self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        range: ByteRange,
        body: impl Into<crate::transport::RequestBody>,
    ) -> Result<PutObjectOutput, S3Error> {
        self.put(PutObjectRequest::new(bucket, key, body).with_range(range))
            .await
    }

    fn get_call(request: &GetObjectRequest) -> S3Request {
        S3Request::new("GetObject", Method::GET)
            .bucket(&request.bucket)
            .key(&request.key)
            .query_opt("versionId", request.version_id.as_ref())
            .range(request.range)
            .header_opt("if-match", request.if_match.clone())
            .header_opt("if-none-match", request.if_none_match.clone())
    }

    /// Get an object, buffering the body.
    pub async fn get(&self, request: GetObjectRequest) -> Result<GetObjectOutput, S3Error> {
        let response = self.executor.execute(Self::get_call(&request)).await?;
        let metadata = metadata_from_headers(&response);
        let request_id = response.request_id().map(String::from);
        let body = response.into_bytes().await?;

        Ok(GetObjectOutput {
            body,
            metadata,
            request_id,
        })
    }

    /// Get an inclusive byte range of an object.
    pub async fn get_range(
        &self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        range: ByteRange,
    ) -> Result<GetObjectOutput, S3Error> {
        self.get(GetObjectRequest::new(bucket, key).with_range(range))
            .await
    }

    /// Get an object as a byte stream.
    ///
    /// The stream fails with an incomplete-body error if the connection ends
    /// before the advertised length.
    pub async fn get_stream(
        &self,
        request: GetObjectRequest,
    ) -> Result<GetObjectStreamOutput, S3Error> {
        let call = Self::get_call(&request).streaming();
        let response = self.executor.execute(call).await?;
        let metadata = metadata_from_headers(&response);
        let request_id = response.request_id().map(String::from);

        Ok(GetObjectStreamOutput {
            body: response.body.into_stream(),
            metadata,
            request_id,
        })
    }

    /// Get object metadata without the body.
    pub async fn head(
        &self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        version_id: Option<String>,
    ) -> Result<HeadObjectOutput, S3Error> {
        let call = S3Request::new("HeadObject", Method::HEAD)
            .bucket(bucket)
            .key(key)
            .query_opt("versionId", version_id);

        let response = self.executor.execute(call).await?;
        Ok(HeadObjectOutput {
            metadata: metadata_from_headers(&response),
            request_id: response.request_id().map(String::from),
        })
    }

    /// Delete an object. Deleting a missing key succeeds.
    pub async fn delete(
        &self,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Result<DeleteObjectOutput, S3Error> {
        self.delete_call(bucket.into(), key.into(), None).await
    }

    /// Delete one version of an object.
    pub async fn delete_version(
        &self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Result<DeleteObjectOutput, S3Error> {
        self.delete_call(bucket.into(), key.into(), Some(version_id.into()))
            .await
    }

    async fn delete_call(
        &self,
        bucket: String,
        key: String,
        version_id: Option<String>,
    ) -> Result<DeleteObjectOutput, S3Error> {
        let call = S3Request::new("DeleteObject", Method::DELETE)
            .bucket(bucket)
            .key(key)
            .query_opt("versionId", version_id);

        let response = self.executor.execute(call).await?;
        Ok(DeleteObjectOutput {
            version_id: response.get_header("x-amz-version-id").map(String::from),
            delete_marker: response
                .get_header("x-amz-delete-marker")
                .map_or(false, |v| v.eq_ignore_ascii_case("true")),
            request_id: response.request_id().map(String::from),
        })
    }

    /// Delete many objects.
    ///
    /// Keys are sent in requests of at most 1000. Per-key failures are
    /// reported in the result, never as an error; the result holds exactly
    /// one outcome per submitted identifier.
    pub async fn delete_objects(
        &self,
        request: DeleteObjectsRequest,
    ) -> Result<BatchResult, S3Error> {
        if request.objects.is_empty() {
            return Err(PreconditionError::EmptyBatch.into());
        }

        let mut result = BatchResult::default();
        for chunk in request.objects.chunks(MAX_DELETE_BATCH) {
            let xml = codec::build_delete_objects_xml(chunk);
            let call = S3Request::new("DeleteObjects", Method::POST)
                .bucket(&request.bucket)
                .subresource("delete")
                .header("content-type", "application/xml")
                .header("content-md5", codec::content_md5(xml.as_bytes()))
                .body(xml);

            let response = self.executor.execute(call).await?;
            let outcomes = codec::decode_delete_result(&response.into_bytes().await?)?;
            let reconciled = BatchResultReconciler::reconcile(chunk, outcomes)?;
            debug!(
                bucket = %request.bucket,
                submitted = chunk.len(),
                failed = reconciled.failures().count(),
                "Batch delete chunk reconciled"
            );
            result.extend(reconciled);
        }
        Ok(result)
    }

    /// Copy an object, server side.
    pub async fn copy(&self, request: CopyObjectRequest) -> Result<CopyObjectOutput, S3Error> {
        let mut source = format!(
            "/{}/{}",
            request.source_bucket,
            crate::config::endpoints::encode_key(&request.source_key)
        );
        if let Some(version) = &request.source_version_id {
            source.push_str(&format!("?versionId={}", version));
        }

        let mut call = S3Request::new("CopyObject", Method::PUT)
            .bucket(&request.bucket)
            .key(&request.key)
            .header("x-amz-copy-source", source)
            .header_opt("content-type", request.content_type.clone())
            .header_opt("x-amz-acl", request.acl.map(|a| a.as_str()))
            .header_opt(
                "x-amz-storage-class",
                request.storage_class.map(|c| c.as_str()),
            );

        if let Some(metadata) = &request.replace_metadata {
            call = call.header("x-amz-metadata-directive", "REPLACE");
            for (key, value) in metadata {
                call = call.header(format!("x-amz-meta-{}", key), value.clone());
            }
        }

        let executed = self.executor.execute_recorded(call).await?;
        let attempts = executed.attempt_count();
        let response = executed.response;
        let version_id = response.get_header("x-amz-version-id").map(String::from);
        let source_version_id = response
            .get_header("x-amz-copy-source-version-id")
            .map(String::from);
        let status = response.status;
        let headers = response.headers.clone();
        let body = response.into_bytes().await?;

        if codec::decode_error_envelope(&body).is_some() {
            return Err(codec::error_from_response(status, &headers, &body)
                .for_operation("CopyObject", attempts));
        }

        let mut output = codec::decode_copy_result(&body)?;
        output.version_id = version_id;
        output.source_version_id = source_version_id;
        Ok(output)
    }

    /// List objects in a bucket.
    pub async fn list(&self, request: ListObjectsRequest) -> Result<ListObjectsOutput, S3Error> {
        let call = S3Request::new("ListObjects", Method::GET)
            .bucket(&request.bucket)
            .query_opt("delimiter", request.delimiter.as_ref())
            .query_opt("marker", request.marker.as_ref())
            .query_opt("max-keys", request.max_keys)
            .query_opt("prefix", request.prefix.as_ref());

        let response = self.executor.execute(call).await?;
        Ok(codec::decode_list_objects(&response.into_bytes().await?)?)
    }

    /// List object versions and delete markers in document order.
    pub async fn list_versions(
        &self,
        request: ListVersionsRequest,
    ) -> Result<ListVersionsOutput, S3Error> {
        let call = S3Request::new("ListObjectVersions", Method::GET)
            .bucket(&request.bucket)
            .subresource("versions")
            .query_opt("delimiter", request.delimiter.as_ref())
            .query_opt("key-marker", request.key_marker.as_ref())
            .query_opt("max-keys", request.max_keys)
            .query_opt("prefix", request.prefix.as_ref())
            .query_opt("version-id-marker", request.version_id_marker.as_ref());

        let response = self.executor.execute(call).await?;
        Ok(codec::decode_list_versions(&response.into_bytes().await?)?)
    }

    /// Get an object's access control list.
    pub async fn get_acl(
        &self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        version_id: Option<String>,
    ) -> Result<GetAclOutput, S3Error> {
        let call = S3Request::new("GetObjectAcl", Method::GET)
            .bucket(bucket)
            .key(key)
            .subresource("acl")
            .query_opt("versionId", version_id);

        let response = self.executor.execute(call).await?;
        Ok(codec::decode_acl(&response.into_bytes().await?)?)
    }

    /// Set an object's access control list.
    pub async fn put_acl(&self, request: PutAclRequest) -> Result<(), S3Error> {
        let key = request.key.clone().ok_or_else(|| PreconditionError::Validation {
            message: "object ACL requires a key".to_string(),
        })?;
        let call = S3Request::new("PutObjectAcl", Method::PUT)
            .bucket(&request.bucket)
            .key(key)
            .subresource("acl")
            .query_opt("versionId", request.version_id.as_ref());

        self.executor.execute(acl_body(call, &request.acl)).await?;
        Ok(())
    }
}

/// Attach an ACL to a request, as a canned header or a policy document.
pub(crate) fn acl_body(call: S3Request, acl: &AclSetting) -> S3Request {
    match acl {
        AclSetting::Canned(canned) => call.header("x-amz-acl", canned.as_str()),
        AclSetting::Policy(policy) => call
            .header("content-type", "application/xml")
            .body(codec::build_acl_xml(policy)),
    }
}

/// Object metadata carried in response headers.
pub fn metadata_from_headers(response: &HttpResponse) -> ObjectMetadata {
    let header = |name: &str| response.get_header(name).map(String::from);
    let user_metadata: HashMap<String, String> = response
        .headers
        .iter()
        .filter_map(|(name, value)| {
            let lower = name.to_ascii_lowercase();
            lower
                .strip_prefix("x-amz-meta-")
                .map(|key| (key.to_string(), value.clone()))
        })
        .collect();

    ObjectMetadata {
        content_length: response.content_length(),
        content_type: header("content-type"),
        content_encoding: header("content-encoding"),
        content_disposition: header("content-disposition"),
        cache_control: header("cache-control"),
        content_range: header("content-range"),
        e_tag: header("etag"),
        last_modified: header("last-modified"),
        version_id: header("x-amz-version-id"),
        storage_class: response
            .get_header("x-amz-storage-class")
            .and_then(|v| v.parse().ok()),
        user_metadata,
    }
}
