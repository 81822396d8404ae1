//! Retry policy for request execution.

mod retry;

pub use retry::{RetryClass, RetryConfig, RetryDecision, RetryPolicy, StopReason};
