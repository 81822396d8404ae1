//! Logical request description.

use crate::error::PreconditionError;
use crate::transport::RequestBody;
use crate::types::ByteRange;
use http::Method;
use std::collections::HashMap;

/// One logical S3 call, before endpoint selection and signing.
#[derive(Debug, Clone)]
pub struct S3Request {
    /// Operation name used in logs and surfaced errors, e.g. `PutObject`.
    pub operation: &'static str,
    /// HTTP method.
    pub method: Method,
    /// Bucket, if the call targets one.
    pub bucket: Option<String>,
    /// Object key.
    pub key: Option<String>,
    /// Query parameters in order; `None` values are sent as bare names.
    pub query: Vec<(String, Option<String>)>,
    /// Headers (lowercase names).
    pub headers: HashMap<String, String>,
    /// Byte range, sent as the `Range` header.
    pub range: Option<ByteRange>,
    /// Request body.
    pub body: RequestBody,
    /// Stream a successful response body instead of buffering it.
    pub stream_response: bool,
}

impl S3Request {
    /// Create a request with no bucket, key or body.
    pub fn new(operation: &'static str, method: Method) -> Self {
        Self {
            operation,
            method,
            bucket: None,
            key: None,
            query: Vec::new(),
            headers: HashMap::new(),
            range: None,
            body: RequestBody::Empty,
            stream_response: false,
        }
    }

    /// Target a bucket.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    /// Target an object key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), Some(value.into())));
        self
    }

    /// Add a query parameter when a value is present.
    pub fn query_opt<V: ToString>(mut self, name: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.query.push((name.to_string(), Some(value.to_string())));
        }
        self
    }

    /// Add a sub-resource flag such as `?acl` or `?uploads`.
    pub fn subresource(mut self, name: impl Into<String>) -> Self {
        self.query.push((name.into(), None));
        self
    }

    /// Add a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Add a header when a value is present.
    pub fn header_opt(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.header(name, value),
            None => self,
        }
    }

    /// Set the byte range.
    pub fn range(mut self, range: Option<ByteRange>) -> Self {
        self.range = range;
        self
    }

    /// Set the body.
    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = body.into();
        self
    }

    /// Stream the response body.
    pub fn streaming(mut self) -> Self {
        self.stream_response = true;
        self
    }

    /// Check the request before anything is sent.
    ///
    /// Keys with a `.` or `..` path segment are refused: URL normalization
    /// would resolve them and retarget the request. A ranged write must
    /// carry a body of exactly the range's length; a ranged read carries no
    /// body.
    pub fn validate(&self) -> Result<(), PreconditionError> {
        if let Some(key) = &self.key {
            validate_key(key)?;
        }
        let Some(range) = self.range else {
            return Ok(());
        };
        range.validate()?;

        if self.method == Method::PUT {
            let expected = range.len().ok_or_else(|| PreconditionError::InvalidRange {
                message: format!("ranged write needs a bounded range, got {}", range),
            })?;
            match self.body.known_length() {
                Some(actual) if actual == expected => Ok(()),
                Some(actual) => Err(PreconditionError::InvalidRange {
                    message: format!(
                        "{} covers {} bytes but the body has {}",
                        range, expected, actual
                    ),
                }),
                None => Err(PreconditionError::InvalidRange {
                    message: "ranged write needs a body of known length".to_string(),
                }),
            }
        } else if !self.body.is_empty() {
            Err(PreconditionError::InvalidRange {
                message: format!("{} request with a range cannot carry a body", self.method),
            })
        } else {
            Ok(())
        }
    }
}

fn validate_key(key: &str) -> Result<(), PreconditionError> {
    if key.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(PreconditionError::Validation {
            message: format!("object key {:?} contains a relative path segment", key),
        });
    }
    Ok(())
}
