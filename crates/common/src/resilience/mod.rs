//! Resilience policies for outbound requests
//!
//! Only retry lives here. There is no circuit breaker; failures reach the
//! caller once the retry budget is spent.

pub mod retry;

pub use retry::{
    backoff_delay, compute_delay, should_retry, AttemptState, RetryConfig, RetryController,
    RetryDecision, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES,
};
