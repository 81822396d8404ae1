//! Retry classification and backoff.
//!
//! The policy is pure: it classifies an attempt outcome and decides whether
//! another attempt is allowed. Sleeping and re-sending are the executor's job.

use crate::error::S3Error;
use rand::Rng;
use std::time::Duration;

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Scale each delay by a random factor in `[0.5, 1.0)`.
    pub use_jitter: bool,
    /// Ceiling on total time spent across all attempts of one call.
    pub max_elapsed: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(20),
            backoff_multiplier: 2.0,
            use_jitter: true,
            max_elapsed: Duration::from_secs(120),
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with the given retry count.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set the initial backoff duration.
    pub fn with_initial_backoff(mut self, duration: Duration) -> Self {
        self.initial_backoff = duration;
        self
    }

    /// Set the maximum backoff duration.
    pub fn with_max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, use_jitter: bool) -> Self {
        self.use_jitter = use_jitter;
        self
    }

    /// Set the total elapsed-time ceiling.
    pub fn with_max_elapsed(mut self, duration: Duration) -> Self {
        self.max_elapsed = duration;
        self
    }

    /// Create a no-retry configuration.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }
}

/// Classification of one attempt's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// The attempt succeeded.
    Success,
    /// 5xx, connection failure or timeout.
    RetryableServer,
    /// Explicit rate-limit signal.
    RetryableThrottle,
    /// Anything a retry cannot fix.
    NonRetryable,
}

impl RetryClass {
    /// Whether another attempt may help.
    pub fn is_retryable(self) -> bool {
        matches!(self, RetryClass::RetryableServer | RetryClass::RetryableThrottle)
    }
}

/// Why the policy refused another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The last attempt succeeded.
    Success,
    /// The failure is not retryable.
    NonRetryable,
    /// The retry budget is used up.
    AttemptsExhausted,
    /// Another attempt would start past the elapsed-time ceiling or the call deadline.
    DeadlineExceeded,
    /// The body was a single-use stream that already started transmitting.
    BodyNotReplayable,
}

/// Outcome of [`RetryPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the delay, then send again.
    Retry(Duration),
    /// Surface the current outcome.
    Stop(StopReason),
}

/// Retry policy with exponential backoff.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Get the retry configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Classify an attempt outcome.
    pub fn classify<T>(outcome: &Result<T, S3Error>) -> RetryClass {
        match outcome {
            Ok(_) => RetryClass::Success,
            Err(error) => Self::classify_error(error),
        }
    }

    /// Classify a failed attempt.
    pub fn classify_error(error: &S3Error) -> RetryClass {
        match error.root() {
            S3Error::Throttle(_) => RetryClass::RetryableThrottle,
            S3Error::Server(_) => RetryClass::RetryableServer,
            S3Error::Connectivity(e) if e.is_retryable() => RetryClass::RetryableServer,
            _ => RetryClass::NonRetryable,
        }
    }

    /// Decide whether to make another attempt.
    ///
    /// `attempts_made` counts physical sends so far, `elapsed` is the time
    /// since the call started and `replayable` says whether the body can be
    /// sent again.
    pub fn decide(
        &self,
        class: RetryClass,
        attempts_made: u32,
        elapsed: Duration,
        replayable: bool,
        retry_after: Option<Duration>,
    ) -> RetryDecision {
        if class == RetryClass::Success {
            return RetryDecision::Stop(StopReason::Success);
        }
        if !class.is_retryable() {
            return RetryDecision::Stop(StopReason::NonRetryable);
        }
        if !replayable {
            return RetryDecision::Stop(StopReason::BodyNotReplayable);
        }
        if attempts_made > self.config.max_retries {
            return RetryDecision::Stop(StopReason::AttemptsExhausted);
        }

        let delay = self.backoff(attempts_made.saturating_sub(1), class, retry_after);
        if elapsed + delay > self.config.max_elapsed {
            return RetryDecision::Stop(StopReason::DeadlineExceeded);
        }
        RetryDecision::Retry(delay)
    }

    /// Delay before retry number `retry_index` (zero-based).
    ///
    /// Throttled attempts wait twice as long and honor a server-provided
    /// `Retry-After` up to the configured maximum.
    pub fn backoff(
        &self,
        retry_index: u32,
        class: RetryClass,
        retry_after: Option<Duration>,
    ) -> Duration {
        let base = self.config.initial_backoff.as_secs_f64();
        let mut delay = base * self.config.backoff_multiplier.powi(retry_index as i32);
        if class == RetryClass::RetryableThrottle {
            delay *= 2.0;
        }
        let max = self.config.max_backoff.as_secs_f64();
        let capped = delay.min(max);

        let jittered = if self.config.use_jitter {
            capped * rand::thread_rng().gen_range(0.5..1.0)
        } else {
            capped
        };

        let hinted = retry_after.map_or(0.0, |d| d.as_secs_f64().min(max));
        Duration::from_secs_f64(jittered.max(hinted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{
        ErrorEnvelope, NetworkError, PreconditionError, ResponseError, ServiceError,
        SigningError,
    };

    fn no_jitter() -> RetryPolicy {
        RetryPolicy::new(
            RetryConfig::new(3)
                .with_initial_backoff(Duration::from_millis(100))
                .with_multiplier(2.0)
                .with_jitter(false),
        )
    }

    fn service(status: u16) -> ServiceError {
        ServiceError::new(status, ErrorEnvelope::synthetic())
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff, Duration::from_millis(100));
        assert_eq!(config.backoff_multiplier, 2.0);
        assert!(config.use_jitter);
    }

    #[test]
    fn test_classification() {
        let ok: Result<(), S3Error> = Ok(());
        assert_eq!(RetryPolicy::classify(&ok), RetryClass::Success);

        let cases = vec![
            (S3Error::Server(service(503)), RetryClass::RetryableServer),
            (S3Error::Throttle(service(503)), RetryClass::RetryableThrottle),
            (
                S3Error::Connectivity(NetworkError::ConnectionReset {
                    message: "reset".into(),
                }),
                RetryClass::RetryableServer,
            ),
            (S3Error::Client(service(404)), RetryClass::NonRetryable),
            (
                S3Error::MalformedResponse(ResponseError::Invalid {
                    message: "bad".into(),
                }),
                RetryClass::NonRetryable,
            ),
            (
                S3Error::Signing(SigningError::MissingCredentials),
                RetryClass::NonRetryable,
            ),
            (
                S3Error::Precondition(PreconditionError::EmptyBatch),
                RetryClass::NonRetryable,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(RetryPolicy::classify_error(&error), expected, "{}", error);
        }
    }

    #[test]
    fn test_backoff_calculation() {
        let policy = no_jitter();
        let server = RetryClass::RetryableServer;
        assert_eq!(policy.backoff(0, server, None), Duration::from_millis(100));
        assert_eq!(policy.backoff(1, server, None), Duration::from_millis(200));
        assert_eq!(policy.backoff(2, server, None), Duration::from_millis(400));
        assert_eq!(
            policy.backoff(0, RetryClass::RetryableThrottle, None),
            Duration::from_millis(200)
        );
    }

    #[test]
    fn test_backoff_capped() {
        let policy = RetryPolicy::new(
            RetryConfig::new(10)
                .with_initial_backoff(Duration::from_secs(1))
                .with_max_backoff(Duration::from_secs(5))
                .with_multiplier(10.0)
                .with_jitter(false),
        );
        assert_eq!(
            policy.backoff(5, RetryClass::RetryableServer, None),
            Duration::from_secs(5)
        );
        assert_eq!(
            policy.backoff(0, RetryClass::RetryableThrottle, Some(Duration::from_secs(60))),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_jitter_stays_within_half_to_full() {
        let policy = RetryPolicy::new(
            RetryConfig::new(3).with_initial_backoff(Duration::from_millis(100)),
        );
        for _ in 0..100 {
            let delay = policy.backoff(0, RetryClass::RetryableServer, None);
            assert!(delay >= Duration::from_millis(50));
            assert!(delay <= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_decide_limits() {
        let policy = no_jitter();
        let server = RetryClass::RetryableServer;
        let zero = Duration::ZERO;

        assert_eq!(
            policy.decide(server, 1, zero, true, None),
            RetryDecision::Retry(Duration::from_millis(100))
        );
        assert_eq!(
            policy.decide(server, 3, zero, true, None),
            RetryDecision::Retry(Duration::from_millis(400))
        );
        assert_eq!(
            policy.decide(server, 4, zero, true, None),
            RetryDecision::Stop(StopReason::AttemptsExhausted)
        );
        assert_eq!(
            policy.decide(server, 1, zero, false, None),
            RetryDecision::Stop(StopReason::BodyNotReplayable)
        );
        assert_eq!(
            policy.decide(RetryClass::NonRetryable, 1, zero, true, None),
            RetryDecision::Stop(StopReason::NonRetryable)
        );
        assert_eq!(
            policy.decide(RetryClass::Success, 1, zero, true, None),
            RetryDecision::Stop(StopReason::Success)
        );
    }

    #[test]
    fn test_decide_respects_elapsed_ceiling() {
        let policy = RetryPolicy::new(
            RetryConfig::new(5)
                .with_jitter(false)
                .with_max_elapsed(Duration::from_millis(150)),
        );
        assert_eq!(
            policy.decide(RetryClass::RetryableServer, 1, Duration::from_millis(100), true, None),
            RetryDecision::Stop(StopReason::DeadlineExceeded)
        );
    }
}
