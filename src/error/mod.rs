//! Error types for the S3-compatible client.
//!
//! Errors are grouped by how a caller is expected to react to them: retryable
//! kinds (connectivity, server, throttle) are resolved by the executor's retry
//! policy, everything else is surfaced on the first occurrence.

pub mod mapping;

pub use mapping::{classify_service_error, codes, ErrorEnvelope};

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for the client.
#[derive(Debug, Error)]
pub enum S3Error {
    /// Invalid configuration or transport construction failure.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Request signing failed.
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// The endpoint could not be reached or the connection broke.
    #[error("Connectivity error: {0}")]
    Connectivity(#[from] NetworkError),

    /// The service answered with a 5xx status.
    #[error("Server error: {0}")]
    Server(ServiceError),

    /// The service asked the client to slow down.
    #[error("Throttled: {0}")]
    Throttle(ServiceError),

    /// The service rejected the request (4xx other than throttling).
    #[error("Client error: {0}")]
    Client(ServiceError),

    /// The response violated the protocol.
    #[error("Malformed response: {0}")]
    MalformedResponse(#[from] ResponseError),

    /// The caller misused the API; detected before any network call.
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    /// Local body source or body stream failure.
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// An error surfaced by the request executor for a named operation.
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    Operation {
        /// Operation name, e.g. `PutObject`.
        operation: String,
        /// Number of physical attempts made.
        attempts: u32,
        /// The last error observed.
        source: Box<S3Error>,
    },
}

impl S3Error {
    /// Wrap an error with the operation that produced it.
    pub fn for_operation(self, operation: impl Into<String>, attempts: u32) -> Self {
        S3Error::Operation {
            operation: operation.into(),
            attempts,
            source: Box::new(self),
        }
    }

    /// The innermost error, with operation context stripped.
    pub fn root(&self) -> &S3Error {
        let mut current = self;
        while let S3Error::Operation { source, .. } = current {
            current = source;
        }
        current
    }

    /// Name of the failing operation, if known.
    pub fn operation(&self) -> Option<&str> {
        match self {
            S3Error::Operation { operation, .. } => Some(operation),
            _ => None,
        }
    }

    /// Number of physical attempts made, if the error came from the executor.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            S3Error::Operation { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Whether the executor retried before surfacing this error.
    pub fn was_retried(&self) -> bool {
        self.attempts().map_or(false, |n| n > 1)
    }

    /// Returns true if the error kind is retryable.
    pub fn is_retryable(&self) -> bool {
        match self.root() {
            S3Error::Connectivity(e) => e.is_retryable(),
            S3Error::Server(_) | S3Error::Throttle(_) => true,
            _ => false,
        }
    }

    /// The service error details, for service-reported failures.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self.root() {
            S3Error::Server(e) | S3Error::Throttle(e) | S3Error::Client(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the service-reported error code if present.
    pub fn error_code(&self) -> Option<&str> {
        self.service_error()
            .map(|e| e.envelope.code.as_str())
            .filter(|code| !code.is_empty())
    }

    /// Returns the HTTP status code if the service answered.
    pub fn status_code(&self) -> Option<u16> {
        self.service_error().map(|e| e.status)
    }

    /// Returns the service request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        self.service_error()
            .and_then(|e| e.envelope.request_id.as_deref())
    }

    /// Returns the retry delay hint if the service sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        self.service_error().and_then(|e| e.retry_after)
    }
}

/// A failure reported by the service in a non-2xx response.
#[derive(Debug, Clone, Error)]
#[error("{}", self.describe())]
pub struct ServiceError {
    /// HTTP status code.
    pub status: u16,
    /// Decoded (or synthetic) error document.
    pub envelope: ErrorEnvelope,
    /// Value of the `Retry-After` header, if any.
    pub retry_after: Option<Duration>,
}

impl ServiceError {
    /// Create a service error.
    pub fn new(status: u16, envelope: ErrorEnvelope) -> Self {
        Self {
            status,
            envelope,
            retry_after: None,
        }
    }

    /// Set the retry-after hint.
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    fn describe(&self) -> String {
        if self.envelope.is_synthetic() {
            return format!("HTTP {}", self.status);
        }
        let mut out = format!("{} (HTTP {})", self.envelope.code, self.status);
        if !self.envelope.message.is_empty() {
            out.push_str(": ");
            out.push_str(&self.envelope.message);
        }
        if let Some(resource) = &self.envelope.resource {
            out.push_str(&format!(" [resource: {}]", resource));
        }
        if let Some(request_id) = &self.envelope.request_id {
            out.push_str(&format!(" [request id: {}]", request_id));
        }
        out
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// No endpoint was configured.
    #[error("At least one endpoint must be configured")]
    NoEndpoints,

    /// An endpoint URL could not be used.
    #[error("Invalid endpoint {url}: {details}")]
    InvalidEndpoint {
        /// The offending URL.
        url: String,
        /// Explanation.
        details: String,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidValue {
        /// Field name.
        field: &'static str,
        /// Explanation.
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP transport: {message}")]
    Transport {
        /// Underlying error message.
        message: String,
    },
}

/// Request signing errors.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The client has no credentials configured.
    #[error("No credentials configured")]
    MissingCredentials,

    /// The URL has no host to sign.
    #[error("Request URL has no host: {url}")]
    MissingHost {
        /// The URL.
        url: String,
    },

    /// Presigned URL expiry outside the allowed range.
    #[error("Presigned URL expiry of {seconds}s is outside 1..=604800")]
    InvalidExpiry {
        /// Requested expiry in seconds.
        seconds: u64,
    },
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection could not be established.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        /// Error message.
        message: String,
    },

    /// Connection was reset or closed mid-exchange.
    #[error("Connection reset: {message}")]
    ConnectionReset {
        /// Error message.
        message: String,
    },

    /// An attempt or the whole call ran past its deadline.
    #[error("Timed out after {duration:?}")]
    Timeout {
        /// The timeout that elapsed.
        duration: Duration,
    },

    /// The response body stream failed.
    #[error("Body stream error: {message}")]
    Body {
        /// Error message.
        message: String,
    },
}

impl NetworkError {
    /// Returns true if the error is retryable.
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// Whether the failure says the endpoint itself is unreachable.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, NetworkError::ConnectionFailed { .. })
    }
}

/// Protocol violations in response bodies.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// XML could not be parsed.
    #[error("Failed to parse XML: {message}")]
    XmlParse {
        /// Parser message.
        message: String,
    },

    /// An element kind was not recognized in a polymorphic list.
    #[error("Unrecognized element <{element}> in {document}")]
    UnknownElement {
        /// Element name.
        element: String,
        /// Enclosing document.
        document: &'static str,
    },

    /// A required field was missing.
    #[error("Missing field {field} in {document}")]
    MissingField {
        /// Field name.
        field: &'static str,
        /// Enclosing document.
        document: &'static str,
    },

    /// A batch result reported a key that was never submitted.
    #[error("Response reported key {key:?} that was not requested")]
    UnexpectedKey {
        /// The key.
        key: String,
    },

    /// A batch result reported a version of a key that was not requested.
    #[error("Response reported version {version_id:?} of key {key:?} that was not requested")]
    UnexpectedVersion {
        /// The key.
        key: String,
        /// The reported version.
        version_id: String,
    },

    /// A batch result reported the same key more often than it was submitted.
    #[error("Response reported key {key:?} more than once")]
    DuplicateKey {
        /// The key.
        key: String,
    },

    /// A header the operation relies on was absent.
    #[error("Missing response header {header}")]
    MissingHeader {
        /// Header name.
        header: &'static str,
    },

    /// Anything else that makes the response unusable.
    #[error("Invalid response: {message}")]
    Invalid {
        /// Explanation.
        message: String,
    },
}

/// Caller misuse detected before the network is touched.
#[derive(Debug, Error)]
pub enum PreconditionError {
    /// Generic argument validation failure.
    #[error("{message}")]
    Validation {
        /// Explanation.
        message: String,
    },

    /// Part number outside 1..=10000.
    #[error("Invalid part number {part_number}: must be between 1 and 10000")]
    InvalidPartNumber {
        /// The part number.
        part_number: u32,
    },

    /// Completion referenced parts with no recorded ETag.
    #[error("Parts {missing:?} of upload {upload_id} have no recorded ETag")]
    MissingParts {
        /// Upload ID.
        upload_id: String,
        /// Part numbers without an ETag.
        missing: Vec<u32>,
    },

    /// Completion listed the same part twice.
    #[error("Part {part_number} listed more than once")]
    DuplicatePart {
        /// The part number.
        part_number: u32,
    },

    /// The multipart session cannot perform the operation in its state.
    #[error("Upload {upload_id} is {state}; cannot {operation}")]
    InvalidSessionState {
        /// Upload ID.
        upload_id: String,
        /// Current state.
        state: String,
        /// Attempted operation.
        operation: &'static str,
    },

    /// The coordinator has no session for this upload ID.
    #[error("Unknown upload {upload_id}")]
    UnknownSession {
        /// Upload ID.
        upload_id: String,
    },

    /// Byte range is empty or inconsistent with the body.
    #[error("Invalid range: {message}")]
    InvalidRange {
        /// Explanation.
        message: String,
    },

    /// Batch delete with no keys.
    #[error("Batch delete requires at least one key")]
    EmptyBatch,
}

/// Body source and body stream failures.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Local I/O failure on a file-backed body.
    #[error("I/O error on {path}: {message}")]
    Io {
        /// File path.
        path: String,
        /// Error message.
        message: String,
    },

    /// The download ended before the advertised length.
    #[error("Incomplete body: expected {expected} bytes, received {received}")]
    IncompleteBody {
        /// Advertised length.
        expected: u64,
        /// Bytes actually received.
        received: u64,
    },

    /// A single-use body was requested again after it was consumed.
    #[error("Single-use body stream has already been consumed")]
    BodyConsumed,
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, S3Error>;
