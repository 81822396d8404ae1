//! Client for S3-compatible object storage.
//!
//! Typed operations are turned into Signature V4 signed HTTP requests and
//! the XML responses are decoded back into typed results.
//!
//! # Features
//!
//! - **Objects and buckets**: CRUD, ranged reads and writes, ACLs,
//!   versioning, lifecycle and CORS
//! - **Resilience**: retries with exponential backoff, endpoint failover and
//!   per-call deadlines
//! - **Streaming**: file-backed and streamed bodies, length-checked downloads
//! - **Multipart uploads**: concurrent part uploads with ordered completion
//! - **Batch delete**: exactly one outcome per submitted key
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use s3_compat::{PutObjectRequest, S3Client};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), s3_compat::S3Error> {
//!     let client = s3_compat::create_client_from_env()?;
//!
//!     let response = client
//!         .objects()
//!         .put(PutObjectRequest::new("my-bucket", "hello.txt", "Hello!"))
//!         .await?;
//!
//!     println!("Uploaded with ETag: {:?}", response.e_tag);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod batch;
pub mod client;
pub mod codec;
pub mod config;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod mocks;
pub mod multipart;
pub mod resilience;
pub mod services;
pub mod signing;
pub mod transport;
pub mod types;

// Re-export main types at crate root
pub use batch::{BatchResult, BatchResultReconciler, DeleteFailure, DeleteOutcome, DeleteSuccess};
pub use client::{S3Client, S3ClientBuilder, S3ClientImpl, UploadOutcome};
pub use config::{AddressingStyle, S3Config};
pub use credentials::AwsCredentials;
pub use error::{
    ConfigurationError, NetworkError, PreconditionError, ResponseError, S3Error, ServiceError,
    SigningError, TransferError,
};
pub use executor::{Attempt, AttemptOutcome, RequestExecutor, S3Request};
pub use multipart::{MultipartSession, MultipartUploadCoordinator, SessionState, UploadSource};
pub use resilience::{RetryConfig, RetryPolicy};
pub use services::{BucketsService, ObjectsService, PresignService};
pub use signing::{Signer, SignerV4};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, RequestBody, ReqwestTransport};
pub use types::*;

/// Create a client from environment variables.
///
/// Reads:
/// - `AWS_REGION` / `AWS_DEFAULT_REGION` for the region
/// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and `AWS_SESSION_TOKEN`
/// - `S3_ENDPOINTS` (comma separated) or `AWS_ENDPOINT_URL_S3`
///
/// # Example
///
/// ```rust,no_run
/// let client = s3_compat::create_client_from_env()?;
/// # Ok::<(), s3_compat::S3Error>(())
/// ```
pub fn create_client_from_env() -> Result<S3ClientImpl> {
    S3ClientBuilder::new().from_env().build()
}

/// Create a client with explicit configuration.
///
/// # Example
///
/// ```rust,no_run
/// use s3_compat::{AwsCredentials, S3Config};
///
/// let config = S3Config::builder()
///     .endpoint("http://localhost:9000")
///     .credentials(AwsCredentials::new("AKID", "SECRET"))
///     .build()?;
///
/// let client = s3_compat::create_client(config)?;
/// # Ok::<(), s3_compat::S3Error>(())
/// ```
pub fn create_client(config: S3Config) -> Result<S3ClientImpl> {
    S3ClientBuilder::new().config(config).build()
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, S3Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        let _ = std::any::type_name::<S3Error>();
        let _ = std::any::type_name::<S3Config>();
        let _ = std::any::type_name::<AwsCredentials>();
        let _ = std::any::type_name::<PutObjectRequest>();
        let _ = std::any::type_name::<MultipartUploadCoordinator>();
        let _ = std::any::type_name::<BatchResult>();
    }

    #[test]
    fn test_create_client_with_config() {
        let config = S3Config::builder()
            .endpoint("http://localhost:9000")
            .credentials(AwsCredentials::new("AKID", "SECRET"))
            .build()
            .unwrap();
        let client: Result<S3ClientImpl> = create_client(config);
        assert!(client.is_ok());
    }
}
