//! Multipart upload coordination.
//!
//! The coordinator owns every session it initiates, keyed by upload ID.
//! Part uploads for a session may run concurrently; the transitions into
//! `Completing` and `Aborted` are serialized per session.

mod session;

pub use session::{MultipartSession, SessionState, MAX_PART_NUMBER};

use crate::codec;
use crate::error::{codes, PreconditionError, ResponseError, S3Error, TransferError};
use crate::executor::{RequestExecutor, S3Request};
use crate::transport::RequestBody;
use crate::types::*;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use http::Method;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Source for [`MultipartUploadCoordinator::upload`].
#[derive(Debug, Clone)]
pub enum UploadSource {
    /// In-memory buffer, split by slicing.
    Bytes(Bytes),
    /// File on disk, split into byte ranges read per attempt.
    File(PathBuf),
}

impl From<Bytes> for UploadSource {
    fn from(bytes: Bytes) -> Self {
        UploadSource::Bytes(bytes)
    }
}

impl From<Vec<u8>> for UploadSource {
    fn from(bytes: Vec<u8>) -> Self {
        UploadSource::Bytes(Bytes::from(bytes))
    }
}

impl From<PathBuf> for UploadSource {
    fn from(path: PathBuf) -> Self {
        UploadSource::File(path)
    }
}

/// Coordinates multipart uploads over a shared executor.
pub struct MultipartUploadCoordinator {
    executor: Arc<RequestExecutor>,
    sessions: RwLock<HashMap<String, Arc<MultipartSession>>>,
}

impl MultipartUploadCoordinator {
    /// Create a coordinator.
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self {
            executor,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Initiate an upload and register its session.
    pub async fn initiate(
        &self,
        request: CreateMultipartUploadRequest,
    ) -> Result<Arc<MultipartSession>, S3Error> {
        let mut call = S3Request::new("CreateMultipartUpload", Method::POST)
            .bucket(&request.bucket)
            .key(&request.key)
            .subresource("uploads")
            .header_opt("content-type", request.content_type.clone())
            .header_opt(
                "x-amz-storage-class",
                request.storage_class.map(|c| c.as_str()),
            )
            .header_opt("x-amz-acl", request.acl.map(|a| a.as_str()));
        for (name, value) in &request.metadata {
            call = call.header(format!("x-amz-meta-{}", name), value.clone());
        }

        let response = self.executor.execute(call).await?;
        let output = codec::decode_initiate_multipart(&response.into_bytes().await?)?;

        info!(
            bucket = %output.bucket,
            key = %output.key,
            upload_id = %output.upload_id,
            "Multipart upload initiated"
        );
        Ok(self.register(output.bucket, output.key, output.upload_id))
    }

    /// Adopt an upload initiated elsewhere, e.g. by an earlier process.
    ///
    /// Parts uploaded before attaching are unknown to the session and must
    /// be uploaded again before completion.
    pub fn attach(
        &self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        upload_id: impl Into<String>,
    ) -> Arc<MultipartSession> {
        let upload_id = upload_id.into();
        if let Some(existing) = self.sessions.read().get(&upload_id) {
            return existing.clone();
        }
        self.register(bucket.into(), key.into(), upload_id)
    }

    fn register(&self, bucket: String, key: String, upload_id: String) -> Arc<MultipartSession> {
        let session = Arc::new(MultipartSession::new(bucket, key, upload_id.clone()));
        self.sessions
            .write()
            .entry(upload_id)
            .or_insert(session)
            .clone()
    }

    /// Look up a live session.
    pub fn session(&self, upload_id: &str) -> Result<Arc<MultipartSession>, PreconditionError> {
        self.sessions
            .read()
            .get(upload_id)
            .cloned()
            .ok_or_else(|| PreconditionError::UnknownSession {
                upload_id: upload_id.to_string(),
            })
    }

    /// Upload IDs of all live sessions.
    pub fn active_uploads(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }

    /// Upload one part and record its ETag.
    pub async fn upload_part(
        &self,
        session: &MultipartSession,
        part_number: u32,
        body: impl Into<RequestBody>,
    ) -> Result<CompletedPart, S3Error> {
        let _guard = session.begin_part(part_number)?;

        let request = S3Request::new("UploadPart", Method::PUT)
            .bucket(session.bucket())
            .key(session.key())
            .query("partNumber", part_number.to_string())
            .query("uploadId", session.upload_id())
            .body(body);

        let response = self.executor.execute(request).await?;
        let e_tag = response
            .etag()
            .map(str::to_string)
            .ok_or(ResponseError::MissingHeader { header: "etag" })?;

        session.record_part(part_number, e_tag.clone());
        Ok(CompletedPart { part_number, e_tag })
    }

    /// Upload several parts with at most `concurrency` in flight.
    ///
    /// Every part is driven to completion; the first failure is returned once
    /// all have settled. Successful parts stay recorded either way.
    pub async fn upload_parts(
        &self,
        session: &MultipartSession,
        parts: Vec<(u32, RequestBody)>,
        concurrency: usize,
    ) -> Result<Vec<CompletedPart>, S3Error> {
        let results: Vec<Result<CompletedPart, S3Error>> = stream::iter(parts)
            .map(|(number, body)| self.upload_part(session, number, body))
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;

        let mut completed = Vec::with_capacity(results.len());
        let mut first_error = None;
        for result in results {
            match result {
                Ok(part) => completed.push(part),
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(_) => {}
            }
        }
        if let Some(error) = first_error {
            return Err(error);
        }
        completed.sort_by_key(|p| p.part_number);
        Ok(completed)
    }

    /// Complete the upload.
    ///
    /// `parts` selects the part numbers to assemble; `None` uses every
    /// recorded part. An incomplete or inconsistent selection fails before
    /// any request is sent and leaves the session usable. A failed request
    /// leaves the session in `Completing`; the caller must then abort.
    pub async fn complete(
        &self,
        session: &MultipartSession,
        parts: Option<Vec<u32>>,
    ) -> Result<CompleteMultipartUploadOutput, S3Error> {
        let _transition = session.transition.lock().await;
        let closed = session.close("complete")?;
        session.settle().await;

        let selected = session.select_parts(parts.as_deref())?;
        session.set_state(SessionState::Completing);
        closed.commit();
        info!(
            upload_id = %session.upload_id(),
            parts = selected.len(),
            "Completing multipart upload"
        );

        let request = S3Request::new("CompleteMultipartUpload", Method::POST)
            .bucket(session.bucket())
            .key(session.key())
            .query("uploadId", session.upload_id())
            .header("content-type", "application/xml")
            .body(codec::build_complete_multipart_xml(&selected));

        let executed = self.executor.execute_recorded(request).await?;
        let attempts = executed.attempt_count();
        let response = executed.response;
        let status = response.status;
        let headers = response.headers.clone();
        let version_id = response.get_header("x-amz-version-id").map(str::to_string);
        let body = response.into_bytes().await?;

        // The service may report an assembly failure inside a 200 response.
        if codec::decode_error_envelope(&body).is_some() {
            let error = codec::error_from_response(status, &headers, &body);
            warn!(upload_id = %session.upload_id(), error = %error, "Completion rejected");
            return Err(error.for_operation("CompleteMultipartUpload", attempts));
        }

        let mut output = codec::decode_complete_multipart(&body)?;
        output.version_id = version_id;

        session.set_state(SessionState::Completed);
        self.sessions.write().remove(session.upload_id());
        info!(
            upload_id = %session.upload_id(),
            e_tag = ?output.e_tag,
            "Multipart upload completed"
        );
        Ok(output)
    }

    /// Abort the upload, releasing stored parts.
    ///
    /// Waits for in-flight part uploads to settle before sending the abort.
    /// Aborting an aborted session, or one the service no longer knows, succeeds.
    pub async fn abort(&self, session: &MultipartSession) -> Result<(), S3Error> {
        let _transition = session.transition.lock().await;
        if session.state() == SessionState::Aborted {
            return Ok(());
        }
        let closed = session.close("abort")?;
        session.settle().await;
        closed.commit();

        let request = S3Request::new("AbortMultipartUpload", Method::DELETE)
            .bucket(session.bucket())
            .key(session.key())
            .query("uploadId", session.upload_id());

        match self.executor.execute(request).await {
            Ok(_) => {}
            Err(e) if e.error_code() == Some(codes::NO_SUCH_UPLOAD) => {
                warn!(upload_id = %session.upload_id(), "Upload already gone on abort");
            }
            Err(e) => return Err(e),
        }

        session.set_state(SessionState::Aborted);
        self.sessions.write().remove(session.upload_id());
        info!(upload_id = %session.upload_id(), "Multipart upload aborted");
        Ok(())
    }

    /// List parts the service holds for an upload.
    pub async fn list_parts(&self, request: ListPartsRequest) -> Result<ListPartsOutput, S3Error> {
        let call = S3Request::new("ListParts", Method::GET)
            .bucket(&request.bucket)
            .key(&request.key)
            .query("uploadId", &request.upload_id)
            .query_opt("max-parts", request.max_parts)
            .query_opt("part-number-marker", request.part_number_marker);

        let response = self.executor.execute(call).await?;
        Ok(codec::decode_list_parts(&response.into_bytes().await?)?)
    }

    /// List uploads in progress for a bucket.
    pub async fn list_uploads(
        &self,
        request: ListMultipartUploadsRequest,
    ) -> Result<ListMultipartUploadsOutput, S3Error> {
        let call = S3Request::new("ListMultipartUploads", Method::GET)
            .bucket(&request.bucket)
            .subresource("uploads")
            .query_opt("prefix", request.prefix.as_ref())
            .query_opt("delimiter", request.delimiter.as_ref())
            .query_opt("key-marker", request.key_marker.as_ref())
            .query_opt("upload-id-marker", request.upload_id_marker.as_ref())
            .query_opt("max-uploads", request.max_uploads);

        let response = self.executor.execute(call).await?;
        Ok(codec::decode_list_uploads(&response.into_bytes().await?)?)
    }

    /// Upload a whole object as parts of the configured size.
    ///
    /// Any failure aborts the upload before the error is returned.
    pub async fn upload(
        &self,
        request: CreateMultipartUploadRequest,
        source: impl Into<UploadSource>,
    ) -> Result<CompleteMultipartUploadOutput, S3Error> {
        let source = source.into();
        let size = source_size(&source).await?;
        let part_size = plan_part_size(size, self.executor.config().multipart_part_size);
        let parts = split_parts(&source, size, part_size);

        let session = self.initiate(request).await?;
        let concurrency = self.executor.config().multipart_concurrency;

        let uploaded = self.upload_parts(&session, parts, concurrency).await;
        let completed = match uploaded {
            Ok(_) => self.complete(&session, None).await,
            Err(e) => Err(e),
        };

        match completed {
            Ok(output) => Ok(output),
            Err(error) => {
                warn!(
                    upload_id = %session.upload_id(),
                    error = %error,
                    "Multipart upload failed, aborting"
                );
                if let Err(abort_error) = self.abort(&session).await {
                    warn!(
                        upload_id = %session.upload_id(),
                        error = %abort_error,
                        "Abort after failed upload also failed"
                    );
                }
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for MultipartUploadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartUploadCoordinator")
            .field("sessions", &self.sessions.read().len())
            .finish()
    }
}

async fn source_size(source: &UploadSource) -> Result<u64, S3Error> {
    match source {
        UploadSource::Bytes(bytes) => Ok(bytes.len() as u64),
        UploadSource::File(path) => tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .map_err(|e| {
                TransferError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                }
                .into()
            }),
    }
}

/// Part size that keeps `size` within the part-count limit.
pub fn plan_part_size(size: u64, preferred: u64) -> u64 {
    let preferred = preferred.max(1);
    let minimum = (size + MAX_PART_NUMBER as u64 - 1) / MAX_PART_NUMBER as u64;
    preferred.max(minimum)
}

fn split_parts(source: &UploadSource, size: u64, part_size: u64) -> Vec<(u32, RequestBody)> {
    if size == 0 {
        let empty = match source {
            UploadSource::Bytes(_) => RequestBody::Empty,
            UploadSource::File(path) => RequestBody::from_file(path),
        };
        return vec![(1, empty)];
    }

    let count = (size + part_size - 1) / part_size;
    (0..count)
        .map(|index| {
            let offset = index * part_size;
            let length = part_size.min(size - offset);
            let body = match source {
                UploadSource::Bytes(bytes) => RequestBody::from_bytes(
                    bytes.slice(offset as usize..(offset + length) as usize),
                ),
                UploadSource::File(path) => {
                    RequestBody::from_file_range(path, ByteRange::span(offset, length))
                }
            };
            (index as u32 + 1, body)
        })
        .collect()
}
