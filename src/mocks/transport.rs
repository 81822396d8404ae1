//! Mock HTTP transport for testing.

use crate::error::{NetworkError, S3Error};
use crate::transport::{
    stream_error, HttpRequest, HttpResponse, HttpTransport, LengthChecked, ResponseBody,
};
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
    /// Deliver the body in small chunks when the request asked for a stream.
    pub chunked: bool,
    /// Delay before the response is returned.
    pub delay: Option<Duration>,
}

impl MockResponse {
    /// Response with a status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
            chunked: false,
            delay: None,
        }
    }

    /// Create a successful response with empty body.
    pub fn ok() -> Self {
        Self::new(200, Bytes::new())
    }

    /// Create a successful response with body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self::new(200, body)
    }

    /// Create a 204 No Content response.
    pub fn no_content() -> Self {
        Self::new(204, Bytes::new())
    }

    /// Create an error response.
    pub fn error(status: u16, body: impl Into<Bytes>) -> Self {
        Self::new(status, body)
    }

    /// Add a header to the response.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Stream the body in chunks.
    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    /// Delay the response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// A request as seen by the mock, body fully read.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Bytes,
}

impl RecordedRequest {
    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Query parameter value; bare flags yield an empty string.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Body as UTF-8 text.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

type Handler = Box<dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync>;

/// Mock HTTP transport for testing.
///
/// Serves queued responses, a default response, or the result of a handler
/// closure. Request bodies are read to the end before a response is chosen.
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    default_response: Option<MockResponse>,
    handler: Option<Handler>,
    requests: Mutex<Vec<RecordedRequest>>,
    connect_failures: AtomicUsize,
    sends: AtomicUsize,
}

impl MockTransport {
    /// Create a new mock transport with no responses.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default_response: None,
            handler: None,
            requests: Mutex::new(Vec::new()),
            connect_failures: AtomicUsize::new(0),
            sends: AtomicUsize::new(0),
        }
    }

    /// Create a mock transport with queued responses.
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        let transport = Self::new();
        transport.responses.lock().extend(responses);
        transport
    }

    /// Create a mock transport with a default response.
    pub fn with_default(response: MockResponse) -> Self {
        Self {
            default_response: Some(response),
            ..Self::new()
        }
    }

    /// Create a mock transport that answers every request with `handler`.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        Self {
            handler: Some(Box::new(handler)),
            ..Self::new()
        }
    }

    /// Fail the next `count` sends as unreachable, without reading their bodies.
    pub fn fail_connections(self, count: usize) -> Self {
        self.connect_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Get the number of requests that reached the mock.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Number of `send` calls, including injected connection failures.
    pub fn send_count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    /// Get the last request made.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    fn take_connect_failure(&self) -> bool {
        self.connect_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn next_response(&self, request: &RecordedRequest) -> Option<MockResponse> {
        if let Some(handler) = &self.handler {
            return Some(handler(request));
        }
        self.responses
            .lock()
            .pop_front()
            .or_else(|| self.default_response.clone())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, S3Error> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        if self.take_connect_failure() {
            return Err(S3Error::Connectivity(NetworkError::ConnectionFailed {
                message: format!("connection refused: {}", request.url),
            }));
        }

        let body = request.body.collect().await.map_err(stream_error)?;
        let recorded = RecordedRequest {
            method: request.method,
            url: request.url,
            headers: request.headers,
            body,
        };
        let mock = self.next_response(&recorded);
        self.requests.lock().push(recorded);

        let mock = mock.ok_or_else(|| {
            S3Error::Connectivity(NetworkError::ConnectionReset {
                message: "No mock response available".to_string(),
            })
        })?;
        if let Some(delay) = mock.delay {
            tokio::time::sleep(delay).await;
        }

        let success = (200..300).contains(&mock.status);
        let body = if request.stream_response && success && mock.chunked {
            let expected = mock
                .headers
                .get("content-length")
                .and_then(|v| v.parse::<u64>().ok());
            let chunks: Vec<std::io::Result<Bytes>> = mock
                .body
                .chunks(4)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            ResponseBody::Streaming(Box::pin(LengthChecked::new(
                futures::stream::iter(chunks),
                expected,
            )))
        } else {
            ResponseBody::Buffered(mock.body)
        };

        Ok(HttpResponse {
            status: mock.status,
            headers: mock.headers,
            body,
        })
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued_responses", &self.responses.lock().len())
            .field("recorded_requests", &self.requests.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportBody;

    fn get(url: &str) -> HttpRequest {
        HttpRequest::new(Method::GET, Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_mock_transport_multiple_responses() {
        let transport = MockTransport::with_responses(vec![
            MockResponse::ok_with_body("first"),
            MockResponse::error(404, "Not Found"),
        ]);

        let first = transport.send(get("https://example.com/1")).await.unwrap();
        assert_eq!(first.into_bytes().await.unwrap(), Bytes::from("first"));

        let second = transport.send(get("https://example.com/2")).await.unwrap();
        assert_eq!(second.status, 404);
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_transport_records_stream_bodies() {
        let transport = MockTransport::with_default(MockResponse::ok());
        let mut request = HttpRequest::new(Method::PUT, Url::parse("https://example.com/k").unwrap());
        request.body = TransportBody::Stream(Box::pin(futures::stream::iter(vec![
            Ok(Bytes::from("ab")),
            Ok(Bytes::from("cd")),
        ])));
        transport.send(request).await.unwrap();

        let recorded = transport.last_request().unwrap();
        assert_eq!(recorded.method, Method::PUT);
        assert_eq!(recorded.body_text(), "abcd");
    }

    #[tokio::test]
    async fn test_injected_connection_failures() {
        let transport = MockTransport::with_default(MockResponse::ok()).fail_connections(2);

        assert!(transport.send(get("https://example.com")).await.is_err());
        assert!(transport.send(get("https://example.com")).await.is_err());
        assert!(transport.send(get("https://example.com")).await.is_ok());
        assert_eq!(transport.send_count(), 3);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_chunked_body_checks_length() {
        let transport = MockTransport::with_default(
            MockResponse::ok_with_body("short")
                .with_header("Content-Length", "10")
                .chunked(),
        );
        let mut request = get("https://example.com/obj");
        request.stream_response = true;

        let response = transport.send(request).await.unwrap();
        assert!(response.into_bytes().await.is_err());
    }
}
