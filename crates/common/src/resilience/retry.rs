//! Retry decisions for failed requests
//!
//! The controller answers two questions for a classified failure: should the
//! request be re-issued, and how long to wait first. It never performs I/O
//! itself; the request executor owns the loop and the sleep.
//!
//! Delays follow `base_delay * 2^retry_count` unless the server supplied a
//! `Retry-After` hint, which always wins.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ErrorKind, ErrorRecord};
use crate::time::{Clock, SystemClock};
use crate::utils::serde::duration_millis;

/// Retries allowed after the initial attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay before the first retry when no hint is supplied
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Retry budget and backoff base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    #[serde(with = "duration_millis")]
    pub base_delay: Duration,
}

impl RetryConfig {
    /// Config with the given retry budget and backoff base
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES, base_delay: DEFAULT_BASE_DELAY }
    }
}

/// Per-call retry counter
///
/// Created fresh for every top-level request and never shared between
/// concurrent requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptState {
    retry_count: u32,
}

impl AttemptState {
    /// State for a request that has not been retried yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries performed so far (0 during the initial attempt)
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Total attempts made, counting the current one
    pub fn attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    /// Count one more retry; called just before the delay is awaited
    pub fn record_retry(&mut self) {
        self.retry_count = self.retry_count.saturating_add(1);
    }
}

/// Outcome of consulting the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait for the given delay, then re-issue the request
    Retry(Duration),
    /// Surface the error to the caller
    Stop,
}

/// Whether `record` may be retried given the attempts made so far
///
/// `auth` is excluded here: it gets a single refresh-and-retry from the
/// executor instead.
pub fn should_retry(record: &ErrorRecord, attempt: &AttemptState, max_retries: u32) -> bool {
    if attempt.retry_count() >= max_retries {
        return false;
    }

    match record.kind() {
        ErrorKind::Network | ErrorKind::Server | ErrorKind::RateLimit => true,
        ErrorKind::Auth | ErrorKind::NotFound | ErrorKind::Validation | ErrorKind::Unknown => {
            false
        }
    }
}

/// Delay before the next attempt
///
/// A `Retry-After` hint on the record overrides exponential backoff.
pub fn compute_delay(
    record: &ErrorRecord,
    attempt: &AttemptState,
    base_delay: Duration,
    now: DateTime<Utc>,
) -> Duration {
    match record.retry_after_hint() {
        Some(hint) => hint.delay_from(now),
        None => backoff_delay(base_delay, attempt.retry_count()),
    }
}

/// `base_delay * 2^retry_count`, saturating at `Duration::MAX`
pub fn backoff_delay(base_delay: Duration, retry_count: u32) -> Duration {
    let factor = 1u32.checked_shl(retry_count).unwrap_or(u32::MAX);
    base_delay.saturating_mul(factor)
}

/// Applies [`RetryConfig`] to classified failures
#[derive(Clone)]
pub struct RetryController {
    config: RetryConfig,
    clock: Arc<dyn Clock>,
}

impl RetryController {
    /// Controller using the system clock
    pub fn new(config: RetryConfig) -> Self {
        Self { config, clock: Arc::new(SystemClock) }
    }

    /// Resolve `Retry-After` dates against `clock` instead of the system time
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Retry budget and backoff base in use
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Whether `record` qualifies for another attempt
    pub fn should_retry(&self, record: &ErrorRecord, attempt: &AttemptState) -> bool {
        should_retry(record, attempt, self.config.max_retries)
    }

    /// Wait before the next attempt, honoring `Retry-After`
    pub fn compute_delay(&self, record: &ErrorRecord, attempt: &AttemptState) -> Duration {
        compute_delay(record, attempt, self.config.base_delay, self.clock.now())
    }

    /// Decide and, on `Retry`, count the retry
    ///
    /// The delay is computed from the count before the increment, so the
    /// first retry waits `base_delay * 2^0`.
    pub fn decide(&self, record: &ErrorRecord, attempt: &mut AttemptState) -> RetryDecision {
        if !self.should_retry(record, attempt) {
            return RetryDecision::Stop;
        }

        let delay = self.compute_delay(record, attempt);
        attempt.record_retry();
        debug!(
            kind = %record.kind(),
            retry = attempt.retry_count(),
            max_retries = self.config.max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling retry"
        );
        RetryDecision::Retry(delay)
    }
}

impl Default for RetryController {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl std::fmt::Debug for RetryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryController").field("config", &self.config).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::error::RetryAfter;
    use crate::time::MockClock;

    fn record(kind: ErrorKind) -> ErrorRecord {
        ErrorRecord::new(kind, "failure")
    }

    #[test]
    fn retries_only_transient_kinds() {
        let attempt = AttemptState::new();
        for kind in [ErrorKind::Network, ErrorKind::Server, ErrorKind::RateLimit] {
            assert!(should_retry(&record(kind), &attempt, 3), "{kind} should retry");
        }
        for kind in
            [ErrorKind::Auth, ErrorKind::NotFound, ErrorKind::Validation, ErrorKind::Unknown]
        {
            assert!(!should_retry(&record(kind), &attempt, 3), "{kind} should not retry");
        }
    }

    #[test]
    fn budget_is_respected() {
        let mut attempt = AttemptState::new();
        let server = record(ErrorKind::Server);
        for _ in 0..3 {
            assert!(should_retry(&server, &attempt, 3));
            attempt.record_retry();
        }
        assert!(!should_retry(&server, &attempt, 3));
        assert!(!should_retry(&server, &AttemptState::new(), 0));
    }

    #[test]
    fn exponential_backoff_without_hint() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(100));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(200));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(400));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(800));
    }

    #[test]
    fn backoff_saturates() {
        assert_eq!(backoff_delay(Duration::MAX, 4), Duration::MAX);
        assert!(backoff_delay(Duration::from_secs(1), 64) > Duration::from_secs(1));
    }

    #[test]
    fn retry_after_seconds_override_backoff() {
        let limited = record(ErrorKind::RateLimit).with_retry_after(RetryAfter::Seconds(5));
        let mut attempt = AttemptState::new();
        attempt.record_retry();
        attempt.record_retry();

        let delay = compute_delay(&limited, &attempt, Duration::from_millis(10), Utc::now());
        assert_eq!(delay, Duration::from_millis(5000));
    }

    #[test]
    fn retry_after_date_uses_clock() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let clock = MockClock::new(now);
        let controller = RetryController::default().with_clock(Arc::new(clock.clone()));

        let hinted = record(ErrorKind::Server)
            .with_retry_after(RetryAfter::At(now + chrono::Duration::seconds(3)));
        assert_eq!(controller.compute_delay(&hinted, &AttemptState::new()), Duration::from_secs(3));

        clock.advance(Duration::from_secs(10));
        assert_eq!(controller.compute_delay(&hinted, &AttemptState::new()), Duration::ZERO);
    }

    #[test]
    fn decide_increments_after_computing_delay() {
        let controller = RetryController::new(RetryConfig::new(2, Duration::from_millis(50)));
        let server = record(ErrorKind::Server);
        let mut attempt = AttemptState::new();

        assert_eq!(
            controller.decide(&server, &mut attempt),
            RetryDecision::Retry(Duration::from_millis(50))
        );
        assert_eq!(attempt.retry_count(), 1);
        assert_eq!(
            controller.decide(&server, &mut attempt),
            RetryDecision::Retry(Duration::from_millis(100))
        );
        assert_eq!(controller.decide(&server, &mut attempt), RetryDecision::Stop);
        assert_eq!(attempt.retry_count(), 2);
        assert_eq!(attempt.attempts(), 3);
    }

    #[test]
    fn config_serializes_delay_as_millis() {
        let json = serde_json::to_value(RetryConfig::default()).unwrap();
        assert_eq!(json["max_retries"], 3);
        assert_eq!(json["base_delay"], 1000);
    }
}
