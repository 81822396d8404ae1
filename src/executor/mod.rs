//! Request executor: sign, send, classify, retry.
//!
//! Every logical call runs `Sign -> Send -> Classify` until the retry policy
//! stops it, and produces exactly one response or one error. Each physical
//! attempt is signed afresh.

mod request;

pub use request::S3Request;

use crate::codec;
use crate::config::endpoints::build_url;
use crate::config::{EndpointSet, S3Config};
use crate::error::{NetworkError, S3Error};
use crate::resilience::{RetryDecision, RetryPolicy, StopReason};
use crate::signing::Signer;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

/// Outcome of one physical attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The service answered 2xx.
    Success,
    /// Failed, and the failure kind is retryable.
    RetryableError(String),
    /// Failed, and retrying cannot help.
    FatalError(String),
}

/// Record of one physical HTTP exchange.
#[derive(Debug, Clone)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Endpoint the attempt was sent to.
    pub endpoint: String,
    /// Duration of the attempt.
    pub elapsed: Duration,
    /// Outcome.
    pub outcome: AttemptOutcome,
    /// Delay slept before the next attempt, if one followed.
    pub backoff: Option<Duration>,
}

/// A successful call with its attempt history.
#[derive(Debug)]
pub struct Executed {
    /// The 2xx response.
    pub response: HttpResponse,
    /// All attempts, the successful one last.
    pub attempts: Vec<Attempt>,
}

impl Executed {
    /// Number of physical attempts the call took.
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }
}

/// Executes logical calls against the configured endpoints.
///
/// Safe to share between tasks; calls hold no shared mutable state besides
/// the endpoint rotation cursor and the transport's connection pool.
pub struct RequestExecutor {
    config: Arc<S3Config>,
    endpoints: EndpointSet,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn Signer>,
    retry: RetryPolicy,
}

impl RequestExecutor {
    /// Create an executor.
    pub fn new(
        config: Arc<S3Config>,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn Signer>,
    ) -> Result<Self, S3Error> {
        let endpoints = config.endpoint_set()?;
        let retry = RetryPolicy::new(config.retry.clone());
        Ok(Self {
            config,
            endpoints,
            transport,
            signer,
            retry,
        })
    }

    /// Client configuration.
    pub fn config(&self) -> &S3Config {
        &self.config
    }

    /// Configured endpoints.
    pub fn endpoints(&self) -> &EndpointSet {
        &self.endpoints
    }

    /// The request signer.
    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }

    /// URL for `request` against the next endpoint in rotation.
    pub fn url_for(&self, request: &S3Request) -> Result<Url, S3Error> {
        request.validate()?;
        let index = self.endpoints.start_index();
        self.build_url(request, index)
    }

    fn build_url(&self, request: &S3Request, endpoint: usize) -> Result<Url, S3Error> {
        Ok(build_url(
            self.endpoints.get(endpoint),
            self.config.addressing_style,
            request.bucket.as_deref(),
            request.key.as_deref(),
            &request.query,
        )?)
    }

    /// Execute a call and return its 2xx response.
    pub async fn execute(&self, request: S3Request) -> Result<HttpResponse, S3Error> {
        self.execute_recorded(request).await.map(|e| e.response)
    }

    /// Execute a call and return its response with the attempt history.
    ///
    /// Errors detected before sending (invalid ranges, bad arguments) are
    /// returned as they are; errors from the exchange are wrapped with the
    /// operation name and attempt count.
    pub async fn execute_recorded(&self, request: S3Request) -> Result<Executed, S3Error> {
        let span = info_span!(
            "s3_call",
            operation = request.operation,
            invocation_id = %Uuid::new_v4(),
        );
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: S3Request) -> Result<Executed, S3Error> {
        request.validate()?;

        let started = Instant::now();
        let call_timeout = self.config.operation_timeout;
        let mut endpoint = self.endpoints.start_index();
        let mut attempts: Vec<Attempt> = Vec::new();

        loop {
            let number = attempts.len() as u32 + 1;
            let attempt_started = Instant::now();
            let endpoint_url = self.endpoints.get(endpoint).to_string();
            let remaining = call_timeout.saturating_sub(started.elapsed());

            let outcome = match tokio::time::timeout(remaining, self.attempt(&request, endpoint))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(S3Error::Connectivity(NetworkError::Timeout {
                    duration: call_timeout,
                })),
            };
            let elapsed = attempt_started.elapsed();

            let error = match outcome {
                Ok(response) => {
                    debug!(
                        attempt = number,
                        endpoint = %endpoint_url,
                        status = response.status,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Attempt succeeded"
                    );
                    attempts.push(Attempt {
                        number,
                        endpoint: endpoint_url,
                        elapsed,
                        outcome: AttemptOutcome::Success,
                        backoff: None,
                    });
                    return Ok(Executed {
                        response,
                        attempts,
                    });
                }
                Err(error) => error,
            };

            if matches!(error, S3Error::Precondition(_)) {
                return Err(error);
            }

            let class = RetryPolicy::classify_error(&error);
            debug!(
                attempt = number,
                endpoint = %endpoint_url,
                status = error.status_code(),
                error = %error,
                "Attempt failed"
            );

            // No attempt may start after the call deadline, so a backoff
            // that would outlast it ends the call instead.
            let decision = match self.retry.decide(
                class,
                number,
                started.elapsed(),
                request.body.can_resend(),
                error.retry_after(),
            ) {
                RetryDecision::Retry(delay) if started.elapsed() + delay >= call_timeout => {
                    RetryDecision::Stop(StopReason::DeadlineExceeded)
                }
                decision => decision,
            };

            let message = error.to_string();
            let (attempt_outcome, backoff) = match decision {
                RetryDecision::Retry(delay) => (AttemptOutcome::RetryableError(message), Some(delay)),
                RetryDecision::Stop(_) if class.is_retryable() => {
                    (AttemptOutcome::RetryableError(message), None)
                }
                RetryDecision::Stop(_) => (AttemptOutcome::FatalError(message), None),
            };
            attempts.push(Attempt {
                number,
                endpoint: endpoint_url.clone(),
                elapsed,
                outcome: attempt_outcome,
                backoff,
            });

            match decision {
                RetryDecision::Retry(delay) => {
                    if let S3Error::Connectivity(e) = &error {
                        if e.is_unreachable() && self.endpoints.len() > 1 {
                            let next = self.endpoints.failover_index(endpoint);
                            warn!(
                                from = %endpoint_url,
                                to = %self.endpoints.get(next),
                                "Endpoint unreachable, failing over"
                            );
                            endpoint = next;
                        }
                    }
                    warn!(
                        attempt = number,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying request"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Stop(reason) => {
                    if class.is_retryable() {
                        warn!(
                            attempts = number,
                            reason = ?reason,
                            error = %error,
                            "Giving up on request"
                        );
                    }
                    return Err(error.for_operation(request.operation, number));
                }
            }
        }
    }

    async fn attempt(&self, request: &S3Request, endpoint: usize) -> Result<HttpResponse, S3Error> {
        let url = self.build_url(request, endpoint)?;
        let opened = request.body.open().await?;

        let mut headers = request.headers.clone();
        if let Some(length) = opened.length {
            if length > 0 || matches!(request.method.as_str(), "PUT" | "POST") {
                headers.insert("content-length".to_string(), length.to_string());
            }
        }
        if let Some(range) = request.range {
            headers.insert("range".to_string(), range.header_value());
        }

        self.signer.sign(
            request.method.as_str(),
            &url,
            &mut headers,
            &opened.payload_hash,
            Utc::now(),
        )?;

        let response = self
            .transport
            .send(HttpRequest {
                method: request.method.clone(),
                url,
                headers,
                body: opened.body,
                stream_response: request.stream_response,
            })
            .await?;

        if response.is_success() {
            return Ok(response);
        }
        let status = response.status;
        let headers = response.headers.clone();
        let body = response.body.collect().await.unwrap_or_default();
        Err(codec::error_from_response(status, &headers, &body))
    }
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("endpoints", &self.endpoints)
            .field("signer", &self.signer)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

