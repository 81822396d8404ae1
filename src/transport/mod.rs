//! HTTP transport layer.
//!
//! A transport performs exactly one HTTP exchange. It knows nothing about
//! signing or retries; those belong to the executor.

mod body;

pub use body::{
    ByteStream, LengthChecked, RequestBody, ResponseStream, SingleUseBody, StreamFactory,
    TransportBody,
};
pub(crate) use body::AttemptBody;

use crate::config::S3Config;
use crate::error::{ConfigurationError, NetworkError, PreconditionError, S3Error, TransferError};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use http::Method;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::time::Duration;
use url::Url;

/// One outbound exchange, already addressed and signed.
#[derive(Debug)]
pub struct HttpRequest {
    /// Verb.
    pub method: Method,
    /// Fully resolved URL, query included.
    pub url: Url,
    /// Lowercase header names.
    pub headers: HashMap<String, String>,
    /// Payload for this attempt.
    pub body: TransportBody,
    /// Hand back a 2xx body as a stream rather than reading it to the end.
    pub stream_response: bool,
}

impl HttpRequest {
    /// Bodiless request.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: TransportBody::Empty,
            stream_response: false,
        }
    }

    /// Attach an in-memory payload.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = TransportBody::Bytes(body.into());
        self
    }

    /// Set `name` to `value`, replacing any earlier value.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Body of a received response.
pub enum ResponseBody {
    /// Fully read body.
    Buffered(Bytes),
    /// Body still being received; dropping it closes the stream.
    Streaming(ResponseStream),
}

impl ResponseBody {
    /// Read the whole body into memory.
    pub async fn collect(self) -> Result<Bytes, S3Error> {
        match self {
            ResponseBody::Buffered(bytes) => Ok(bytes),
            ResponseBody::Streaming(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk.map_err(stream_error)?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Turn the body into a stream.
    pub fn into_stream(self) -> ResponseStream {
        match self {
            ResponseBody::Buffered(bytes) => {
                Box::pin(futures::stream::once(async move { Ok(bytes) }))
            }
            ResponseBody::Streaming(stream) => stream,
        }
    }

    /// The buffered bytes, if the body was buffered.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseBody::Buffered(bytes) => Some(bytes),
            ResponseBody::Streaming(_) => None,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Buffered(b) => write!(f, "Buffered({} bytes)", b.len()),
            ResponseBody::Streaming(_) => f.write_str("Streaming"),
        }
    }
}

/// Map a body stream failure to the client error taxonomy.
///
/// A body that ended before its advertised length is a transfer error. A
/// stalled body is a timeout; any other stream failure is a connectivity
/// error.
pub fn stream_error(error: io::Error) -> S3Error {
    if let Some(TransferError::IncompleteBody { expected, received }) = error
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<TransferError>())
    {
        return S3Error::Transfer(TransferError::IncompleteBody {
            expected: *expected,
            received: *received,
        });
    }
    if let Some(NetworkError::Timeout { duration }) = error
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<NetworkError>())
    {
        return S3Error::Connectivity(NetworkError::Timeout {
            duration: *duration,
        });
    }
    S3Error::Connectivity(NetworkError::Body {
        message: error.to_string(),
    })
}

/// Status, headers and body of one exchange.
#[derive(Debug)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Lowercase header names.
    pub headers: HashMap<String, String>,
    /// Payload, buffered or streaming.
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Response whose body is already in memory.
    pub fn new(status: u16, headers: HashMap<String, String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: ResponseBody::Buffered(body.into()),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        matches!(self.status, 200..=299)
    }

    /// Header lookup that ignores ASCII case.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find_map(|(k, v)| k.eq_ignore_ascii_case(name).then_some(v.as_str()))
    }

    /// `x-amz-request-id`, when the service sent one.
    pub fn request_id(&self) -> Option<&str> {
        self.get_header("x-amz-request-id")
    }

    /// Parsed `content-length`.
    pub fn content_length(&self) -> Option<u64> {
        self.get_header("content-length")?.trim().parse().ok()
    }

    /// Quoted `etag`.
    pub fn etag(&self) -> Option<&str> {
        self.get_header("etag")
    }

    /// Drain the body into memory.
    pub async fn into_bytes(self) -> Result<Bytes, S3Error> {
        self.body.collect().await
    }
}

/// Performs a single HTTP exchange.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` once.
    ///
    /// Any status, 4xx and 5xx included, comes back as `Ok`. `Err` means no
    /// response was received at all.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, S3Error>;
}

/// [`HttpTransport`] over a pooled `reqwest` client.
pub struct ReqwestTransport {
    client: reqwest::Client,
    read_timeout: Duration,
}

impl ReqwestTransport {
    /// Transport tuned with the default [`S3Config`].
    pub fn new() -> Result<Self, S3Error> {
        Self::from_config(&S3Config::default())
    }

    /// Transport using the timeouts, pool limits, TLS mode and user agent
    /// of `config`.
    ///
    /// `read_timeout` limits the wait for response headers and for each
    /// body chunk, so long streaming transfers are not cut off.
    pub fn from_config(config: &S3Config) -> Result<Self, S3Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_connections)
            .pool_idle_timeout(config.idle_timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ConfigurationError::Transport {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            read_timeout: config.read_timeout,
        })
    }

    fn classify(&self, error: reqwest::Error) -> S3Error {
        let message = error.to_string();
        if error.is_builder() {
            PreconditionError::Validation {
                message: format!("request could not be built: {}", message),
            }
            .into()
        } else if error.is_timeout() {
            NetworkError::Timeout {
                duration: self.read_timeout,
            }
            .into()
        } else if error.is_connect() {
            NetworkError::ConnectionFailed { message }.into()
        } else {
            NetworkError::ConnectionReset { message }.into()
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, S3Error> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
            stream_response,
        } = request;

        let outbound = headers.iter().fold(
            self.client.request(method, url),
            |builder, (name, value)| builder.header(name.as_str(), value.as_str()),
        );
        let outbound = match body {
            TransportBody::Empty => outbound,
            TransportBody::Bytes(bytes) => outbound.body(bytes),
            TransportBody::Stream(stream) => outbound.body(reqwest::Body::wrap_stream(stream)),
        };

        // `read_timeout` bounds the wait for headers and each gap between
        // body chunks, never the transfer as a whole.
        let response = tokio::time::timeout(self.read_timeout, outbound.send())
            .await
            .map_err(|_| NetworkError::Timeout {
                duration: self.read_timeout,
            })?
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let streaming = stream_response && status.is_success();
        let expected = if streaming {
            response.content_length()
        } else {
            None
        };
        let chunks = LengthChecked::new(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| io::Error::new(io::ErrorKind::Other, e))),
            expected,
        )
        .with_idle_timeout(self.read_timeout);
        let body = if streaming {
            ResponseBody::Streaming(Box::pin(chunks))
        } else {
            ResponseBody::Streaming(Box::pin(chunks)).collect().await.map(ResponseBody::Buffered)?
        };

        Ok(HttpResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}
