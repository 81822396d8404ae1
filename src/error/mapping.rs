//! Classification of service-reported errors.

use super::{S3Error, ServiceError};
use std::time::Duration;

/// Well-known service error codes.
pub mod codes {
    /// Bucket does not exist.
    pub const NO_SUCH_BUCKET: &str = "NoSuchBucket";
    /// Key does not exist.
    pub const NO_SUCH_KEY: &str = "NoSuchKey";
    /// Multipart upload does not exist.
    pub const NO_SUCH_UPLOAD: &str = "NoSuchUpload";
    /// Version does not exist.
    pub const NO_SUCH_VERSION: &str = "NoSuchVersion";
    /// Bucket name taken by another account.
    pub const BUCKET_ALREADY_EXISTS: &str = "BucketAlreadyExists";
    /// Bucket already created by the caller.
    pub const BUCKET_ALREADY_OWNED_BY_YOU: &str = "BucketAlreadyOwnedByYou";
    /// Bucket still has objects.
    pub const BUCKET_NOT_EMPTY: &str = "BucketNotEmpty";
    /// Bucket has no CORS configuration.
    pub const NO_SUCH_CORS_CONFIGURATION: &str = "NoSuchCORSConfiguration";
    /// Bucket has no lifecycle configuration.
    pub const NO_SUCH_LIFECYCLE_CONFIGURATION: &str = "NoSuchLifecycleConfiguration";
    /// Completion referenced a part the service does not know.
    pub const INVALID_PART: &str = "InvalidPart";
    /// Completion listed parts out of order.
    pub const INVALID_PART_ORDER: &str = "InvalidPartOrder";
    /// Requested range cannot be satisfied.
    pub const INVALID_RANGE: &str = "InvalidRange";
    /// Service asks the client to reduce its request rate.
    pub const SLOW_DOWN: &str = "SlowDown";

    /// Codes that signal rate limiting regardless of HTTP status.
    pub const THROTTLE_CODES: &[&str] = &[
        SLOW_DOWN,
        "Throttling",
        "ThrottlingException",
        "RequestLimitExceeded",
        "TooManyRequests",
        "RequestThrottled",
    ];
}

/// Error document decoded from a failed response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorEnvelope {
    /// Machine-readable code, e.g. `NoSuchKey`. Empty when synthetic.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Resource the error refers to (bucket, key or path).
    pub resource: Option<String>,
    /// Service request ID.
    pub request_id: Option<String>,
    /// Extended host ID.
    pub host_id: Option<String>,
}

impl ErrorEnvelope {
    /// Envelope for a failed response that carried no decodable error body.
    pub fn synthetic() -> Self {
        Self::default()
    }

    /// Whether this envelope was synthesized from the status alone.
    pub fn is_synthetic(&self) -> bool {
        self.code.is_empty()
    }
}

/// Map a failed response to the error kind the retry policy acts on.
///
/// Throttling is recognized by status 429 or by code; other 5xx statuses are
/// server errors and everything else is a client error.
pub fn classify_service_error(
    status: u16,
    envelope: ErrorEnvelope,
    retry_after: Option<Duration>,
) -> S3Error {
    let throttled =
        status == 429 || codes::THROTTLE_CODES.contains(&envelope.code.as_str());
    let error = ServiceError::new(status, envelope).with_retry_after(retry_after);

    if throttled {
        S3Error::Throttle(error)
    } else if status >= 500 {
        S3Error::Server(error)
    } else {
        S3Error::Client(error)
    }
}

/// Parse a `Retry-After` header given in seconds.
pub fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
