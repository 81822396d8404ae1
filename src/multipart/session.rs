//! Multipart upload session state.

use crate::error::PreconditionError;
use crate::types::CompletedPart;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Highest part number the protocol allows.
pub const MAX_PART_NUMBER: u32 = 10_000;

/// Lifecycle state of a multipart upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Upload created, no part sent yet.
    Initiated,
    /// At least one part has been dispatched.
    PartsInFlight,
    /// Completion has been requested.
    Completing,
    /// The service assembled the object.
    Completed,
    /// The upload was aborted and its parts released.
    Aborted,
}

impl SessionState {
    /// Whether the session reached a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Aborted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Initiated => "initiated",
            SessionState::PartsInFlight => "uploading parts",
            SessionState::Completing => "completing",
            SessionState::Completed => "completed",
            SessionState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

struct Lifecycle {
    state: SessionState,
    accepting_parts: bool,
}

/// One multipart upload, owned by the coordinator that created it.
///
/// Parts may be recorded concurrently. Transitions into `Completing` and
/// `Aborted` are serialized by the coordinator through `transition`.
pub struct MultipartSession {
    bucket: String,
    key: String,
    upload_id: String,
    lifecycle: Mutex<Lifecycle>,
    parts: Mutex<BTreeMap<u32, String>>,
    in_flight: AtomicUsize,
    settled: Notify,
    pub(super) transition: tokio::sync::Mutex<()>,
}

impl MultipartSession {
    pub(super) fn new(bucket: String, key: String, upload_id: String) -> Self {
        Self {
            bucket,
            key,
            upload_id,
            lifecycle: Mutex::new(Lifecycle {
                state: SessionState::Initiated,
                accepting_parts: true,
            }),
            parts: Mutex::new(BTreeMap::new()),
            in_flight: AtomicUsize::new(0),
            settled: Notify::new(),
            transition: tokio::sync::Mutex::new(()),
        }
    }

    /// Target bucket.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Target key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Upload ID assigned by the service.
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.lifecycle.lock().state
    }

    /// Number of part uploads currently running.
    pub fn parts_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Recorded parts in ascending part-number order.
    pub fn completed_parts(&self) -> Vec<CompletedPart> {
        self.parts
            .lock()
            .iter()
            .map(|(n, etag)| CompletedPart {
                part_number: *n,
                e_tag: etag.clone(),
            })
            .collect()
    }

    /// ETag recorded for `part_number`.
    pub fn part_etag(&self, part_number: u32) -> Option<String> {
        self.parts.lock().get(&part_number).cloned()
    }

    fn invalid_state(&self, state: SessionState, operation: &'static str) -> PreconditionError {
        PreconditionError::InvalidSessionState {
            upload_id: self.upload_id.clone(),
            state: state.to_string(),
            operation,
        }
    }

    /// Register a part upload. The returned guard must live until it settles.
    pub(super) fn begin_part(&self, part_number: u32) -> Result<PartGuard<'_>, PreconditionError> {
        if part_number == 0 || part_number > MAX_PART_NUMBER {
            return Err(PreconditionError::InvalidPartNumber { part_number });
        }
        let mut lifecycle = self.lifecycle.lock();
        if !lifecycle.accepting_parts {
            return Err(self.invalid_state(lifecycle.state, "upload parts"));
        }
        lifecycle.state = SessionState::PartsInFlight;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Ok(PartGuard { session: self })
    }

    pub(super) fn record_part(&self, part_number: u32, e_tag: String) {
        self.parts.lock().insert(part_number, e_tag);
    }

    /// Stop accepting parts ahead of `Completing` or `Aborted`.
    ///
    /// The session reopens when the returned guard drops without being
    /// committed, including when the caller's future is cancelled.
    pub(super) fn close(&self, operation: &'static str) -> Result<Closed<'_>, PreconditionError> {
        let mut lifecycle = self.lifecycle.lock();
        match lifecycle.state {
            SessionState::Completed | SessionState::Aborted => {
                Err(self.invalid_state(lifecycle.state, operation))
            }
            SessionState::Completing if operation == "complete" => {
                Err(self.invalid_state(lifecycle.state, operation))
            }
            previous => {
                lifecycle.accepting_parts = false;
                Ok(Closed {
                    session: self,
                    previous: Some(previous),
                })
            }
        }
    }

    fn reopen(&self, previous: SessionState) {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.state = previous;
        lifecycle.accepting_parts = true;
    }

    pub(super) fn set_state(&self, state: SessionState) {
        self.lifecycle.lock().state = state;
    }

    /// Wait until no part upload is running.
    pub(super) async fn settle(&self) {
        loop {
            let notified = self.settled.notified();
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Check a completion part list against the recorded parts.
    ///
    /// `None` selects every recorded part. The result is in ascending order.
    pub(super) fn select_parts(
        &self,
        requested: Option<&[u32]>,
    ) -> Result<Vec<CompletedPart>, PreconditionError> {
        let recorded = self.parts.lock();
        let Some(requested) = requested else {
            if recorded.is_empty() {
                return Err(PreconditionError::MissingParts {
                    upload_id: self.upload_id.clone(),
                    missing: Vec::new(),
                });
            }
            return Ok(recorded
                .iter()
                .map(|(n, etag)| CompletedPart {
                    part_number: *n,
                    e_tag: etag.clone(),
                })
                .collect());
        };

        if requested.is_empty() {
            return Err(PreconditionError::MissingParts {
                upload_id: self.upload_id.clone(),
                missing: Vec::new(),
            });
        }

        let mut sorted = requested.to_vec();
        sorted.sort_unstable();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(PreconditionError::DuplicatePart {
                part_number: pair[0],
            });
        }
        if let Some(&bad) = sorted.iter().find(|n| **n == 0 || **n > MAX_PART_NUMBER) {
            return Err(PreconditionError::InvalidPartNumber { part_number: bad });
        }

        let missing: Vec<u32> = sorted
            .iter()
            .copied()
            .filter(|n| !recorded.contains_key(n))
            .collect();
        if !missing.is_empty() {
            return Err(PreconditionError::MissingParts {
                upload_id: self.upload_id.clone(),
                missing,
            });
        }

        Ok(sorted
            .into_iter()
            .filter_map(|n| {
                recorded.get(&n).map(|etag| CompletedPart {
                    part_number: n,
                    e_tag: etag.clone(),
                })
            })
            .collect())
    }
}

impl fmt::Debug for MultipartSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartSession")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("upload_id", &self.upload_id)
            .field("state", &self.state())
            .field("parts", &self.parts.lock().len())
            .field("in_flight", &self.parts_in_flight())
            .finish()
    }
}

/// Marks one part upload as running until dropped.
pub(super) struct PartGuard<'a> {
    session: &'a MultipartSession,
}

impl Drop for PartGuard<'_> {
    fn drop(&mut self) {
        if self.session.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.session.settled.notify_waiters();
        }
    }
}

/// A session closed to new parts by [`MultipartSession::close`].
pub(super) struct Closed<'a> {
    session: &'a MultipartSession,
    previous: Option<SessionState>,
}

impl Closed<'_> {
    /// Keep the session closed past this guard.
    pub(super) fn commit(mut self) {
        self.previous = None;
    }
}

impl Drop for Closed<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.session.reopen(previous);
        }
    }
}
