//! Request and response body sources.
//!
//! Request bodies are either replayable (in memory, file-backed, or rebuilt
//! by a caller-supplied factory) or single-use streams. A single-use stream
//! records the moment it is first polled; after that it must not be resent.

use crate::error::{NetworkError, PreconditionError, S3Error, TransferError};
use crate::signing::{sha256_hex, UNSIGNED_PAYLOAD};
use crate::types::ByteRange;
use bytes::{Bytes, BytesMut};
use futures::stream::{Stream, StreamExt};
use parking_lot::Mutex;
use pin_project_lite::pin_project;
use std::fmt;
use std::future::Future;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::time::Sleep;
use tokio_util::io::ReaderStream;

/// Outgoing byte stream.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync>>;

/// Incoming byte stream.
pub type ResponseStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Rebuilds a request body stream for each attempt.
pub type StreamFactory = Arc<dyn Fn() -> ByteStream + Send + Sync>;

/// Body of an outgoing request.
#[derive(Clone, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// In-memory bytes.
    Bytes(Bytes),
    /// A file, or a byte range of it, read from disk on every attempt.
    File {
        /// File path.
        path: PathBuf,
        /// Optional inclusive byte range within the file.
        range: Option<ByteRange>,
    },
    /// A stream rebuilt by the factory on every attempt.
    Replayable {
        /// Stream factory.
        factory: StreamFactory,
        /// Exact length, if known.
        length: Option<u64>,
    },
    /// A stream that can be sent at most once after it starts.
    Stream(SingleUseBody),
}

impl RequestBody {
    /// In-memory body.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        RequestBody::Bytes(bytes.into())
    }

    /// Whole-file body.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        RequestBody::File {
            path: path.as_ref().to_path_buf(),
            range: None,
        }
    }

    /// Body made of one byte range of a file.
    pub fn from_file_range(path: impl AsRef<Path>, range: ByteRange) -> Self {
        RequestBody::File {
            path: path.as_ref().to_path_buf(),
            range: Some(range),
        }
    }

    /// Single-use stream body.
    pub fn from_stream<S>(stream: S, length: Option<u64>) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + Sync + 'static,
    {
        RequestBody::Stream(SingleUseBody::new(Box::pin(stream), length))
    }

    /// Stream body that can be recreated for retries.
    pub fn from_factory<F>(length: Option<u64>, factory: F) -> Self
    where
        F: Fn() -> ByteStream + Send + Sync + 'static,
    {
        RequestBody::Replayable {
            factory: Arc::new(factory),
            length,
        }
    }

    /// Whether the body carries no bytes.
    pub fn is_empty(&self) -> bool {
        match self {
            RequestBody::Empty => true,
            RequestBody::Bytes(b) => b.is_empty(),
            _ => false,
        }
    }

    /// Whether the body can always be sent again.
    pub fn is_replayable(&self) -> bool {
        !matches!(self, RequestBody::Stream(_))
    }

    /// Whether the body may be sent (again) now.
    pub fn can_resend(&self) -> bool {
        match self {
            RequestBody::Stream(s) => !s.started(),
            _ => true,
        }
    }

    /// Body length when it is known without touching the source.
    pub fn known_length(&self) -> Option<u64> {
        match self {
            RequestBody::Empty => Some(0),
            RequestBody::Bytes(b) => Some(b.len() as u64),
            RequestBody::File { range, .. } => range.and_then(|r| r.len()),
            RequestBody::Replayable { length, .. } => *length,
            RequestBody::Stream(s) => s.length(),
        }
    }

    /// In-memory contents, for bodies held in memory.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            RequestBody::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Prepare the body for one physical attempt.
    pub(crate) async fn open(&self) -> Result<AttemptBody, S3Error> {
        Ok(match self {
            RequestBody::Empty => AttemptBody {
                body: TransportBody::Empty,
                length: Some(0),
                payload_hash: sha256_hex(b""),
            },
            RequestBody::Bytes(bytes) => AttemptBody {
                body: TransportBody::Bytes(bytes.clone()),
                length: Some(bytes.len() as u64),
                payload_hash: sha256_hex(bytes),
            },
            RequestBody::File { path, range } => {
                let (stream, length) = open_file(path, *range).await?;
                AttemptBody {
                    body: TransportBody::Stream(stream),
                    length: Some(length),
                    payload_hash: UNSIGNED_PAYLOAD.to_string(),
                }
            }
            RequestBody::Replayable { factory, length } => AttemptBody {
                body: TransportBody::Stream(factory()),
                length: *length,
                payload_hash: UNSIGNED_PAYLOAD.to_string(),
            },
            RequestBody::Stream(single) => AttemptBody {
                body: TransportBody::Stream(single.attempt()?),
                length: single.length(),
                payload_hash: UNSIGNED_PAYLOAD.to_string(),
            },
        })
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            RequestBody::File { path, range } => f
                .debug_struct("File")
                .field("path", path)
                .field("range", range)
                .finish(),
            RequestBody::Replayable { length, .. } => {
                f.debug_struct("Replayable").field("length", length).finish()
            }
            RequestBody::Stream(s) => f
                .debug_struct("Stream")
                .field("length", &s.length())
                .field("started", &s.started())
                .finish(),
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(bytes.into())
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Bytes(text.into())
    }
}

impl From<&'static str> for RequestBody {
    fn from(text: &'static str) -> Self {
        RequestBody::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<&'static [u8]> for RequestBody {
    fn from(bytes: &'static [u8]) -> Self {
        RequestBody::Bytes(Bytes::from_static(bytes))
    }
}

/// Body material for one physical attempt.
pub(crate) struct AttemptBody {
    pub body: TransportBody,
    pub length: Option<u64>,
    pub payload_hash: String,
}

/// Body handed to the transport.
pub enum TransportBody {
    /// No body.
    Empty,
    /// In-memory bytes.
    Bytes(Bytes),
    /// Streamed body.
    Stream(ByteStream),
}

impl TransportBody {
    /// Drain the body into memory.
    pub async fn collect(self) -> io::Result<Bytes> {
        match self {
            TransportBody::Empty => Ok(Bytes::new()),
            TransportBody::Bytes(b) => Ok(b),
            TransportBody::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }
}

impl fmt::Debug for TransportBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportBody::Empty => f.write_str("Empty"),
            TransportBody::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            TransportBody::Stream(_) => f.write_str("Stream"),
        }
    }
}

async fn open_file(path: &Path, range: Option<ByteRange>) -> Result<(ByteStream, u64), S3Error> {
    let io_error = |e: io::Error| TransferError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let mut file = tokio::fs::File::open(path).await.map_err(io_error)?;
    let file_len = file.metadata().await.map_err(io_error)?.len();

    let (start, length) = match range {
        None => (0, file_len),
        Some(r) => {
            let last = r.last.unwrap_or(file_len.saturating_sub(1));
            if r.first >= file_len || last >= file_len {
                return Err(PreconditionError::InvalidRange {
                    message: format!(
                        "{} is outside {} ({} bytes)",
                        r,
                        path.display(),
                        file_len
                    ),
                }
                .into());
            }
            (r.first, last - r.first + 1)
        }
    };

    if start > 0 {
        file.seek(SeekFrom::Start(start)).await.map_err(io_error)?;
    }
    let stream: ByteStream = Box::pin(ReaderStream::new(file.take(length)));
    Ok((stream, length))
}

struct SingleUseInner {
    slot: Mutex<Option<ByteStream>>,
    started: AtomicBool,
    length: Option<u64>,
}

/// A stream body that can be transmitted once.
///
/// Every attempt reads through the same underlying stream. If an attempt
/// fails before polling it, the stream is untouched and may be sent again.
#[derive(Clone)]
pub struct SingleUseBody {
    inner: Arc<SingleUseInner>,
}

impl SingleUseBody {
    fn new(stream: ByteStream, length: Option<u64>) -> Self {
        Self {
            inner: Arc::new(SingleUseInner {
                slot: Mutex::new(Some(stream)),
                started: AtomicBool::new(false),
                length,
            }),
        }
    }

    /// Whether any attempt has started reading the stream.
    pub fn started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Declared length.
    pub fn length(&self) -> Option<u64> {
        self.inner.length
    }

    fn attempt(&self) -> Result<ByteStream, S3Error> {
        if self.started() {
            return Err(TransferError::BodyConsumed.into());
        }
        Ok(Box::pin(TrackedStream {
            inner: self.inner.clone(),
        }))
    }
}

struct TrackedStream {
    inner: Arc<SingleUseInner>,
}

impl Stream for TrackedStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.started.store(true, Ordering::SeqCst);
        let mut slot = self.inner.slot.lock();
        match slot.as_mut() {
            Some(stream) => {
                let polled = stream.as_mut().poll_next(cx);
                if let Poll::Ready(None) = polled {
                    *slot = None;
                }
                polled
            }
            None => Poll::Ready(None),
        }
    }
}

pin_project! {
    /// Wraps a response stream and fails if it ends before the advertised
    /// length, or, with an idle timeout, if no chunk arrives in time.
    pub struct LengthChecked<S> {
        #[pin]
        inner: S,
        expected: Option<u64>,
        received: u64,
        idle_timeout: Option<Duration>,
        idle: Option<Pin<Box<Sleep>>>,
        timed_out: bool,
    }
}

impl<S> LengthChecked<S> {
    /// Wrap `inner`, expecting `expected` bytes in total.
    pub fn new(inner: S, expected: Option<u64>) -> Self {
        Self {
            inner,
            expected,
            received: 0,
            idle_timeout: None,
            idle: None,
            timed_out: false,
        }
    }

    /// Fail the stream when the gap between chunks exceeds `timeout`.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }
}

impl<S> Stream for LengthChecked<S>
where
    S: Stream<Item = io::Result<Bytes>>,
{
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        if *this.timed_out {
            return Poll::Ready(None);
        }
        let item = match this.inner.poll_next(cx) {
            Poll::Ready(item) => item,
            Poll::Pending => {
                let Some(timeout) = *this.idle_timeout else {
                    return Poll::Pending;
                };
                let idle = this
                    .idle
                    .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
                ready!(idle.as_mut().poll(cx));
                *this.timed_out = true;
                return Poll::Ready(Some(Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    NetworkError::Timeout { duration: timeout },
                ))));
            }
        };
        *this.idle = None;

        match item {
            Some(Ok(chunk)) => {
                *this.received += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => Poll::Ready(Some(Err(e))),
            None => match this.expected.take() {
                Some(expected) if *this.received < expected => {
                    Poll::Ready(Some(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        TransferError::IncompleteBody {
                            expected,
                            received: *this.received,
                        },
                    ))))
                }
                _ => Poll::Ready(None),
            },
        }
    }
}
