//! Integration tests for the retry controller
//!
//! Drives the controller the way the request executor does: classify,
//! decide, count attempts.

#![cfg(feature = "runtime")]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::StatusCode;
use stellar_common::error::classifier::classify_response;
use stellar_common::{
    AttemptState, ErrorKind, ErrorRecord, MockClock, RetryConfig, RetryController, RetryDecision,
};

fn server_error() -> ErrorRecord {
    classify_response(StatusCode::INTERNAL_SERVER_ERROR, None, &HeaderMap::new())
}

/// Validates that a permanently failing call gets exactly `max_retries`
/// retries with doubling delays.
///
/// # Test Steps
/// 1. Configure 3 retries with a 100 ms base
/// 2. Feed the same server error until the controller stops
/// 3. Verify the delays 100, 200, 400 ms and 4 total attempts
#[test]
fn test_budget_and_backoff_sequence() {
    let controller = RetryController::new(RetryConfig::new(3, Duration::from_millis(100)));
    let record = server_error();
    let mut attempt = AttemptState::new();
    let mut delays = Vec::new();

    while let RetryDecision::Retry(delay) = controller.decide(&record, &mut attempt) {
        delays.push(delay);
    }

    assert_eq!(
        delays,
        vec![Duration::from_millis(100), Duration::from_millis(200), Duration::from_millis(400)]
    );
    assert_eq!(attempt.attempts(), 4);
}

#[test]
fn test_retry_after_overrides_backoff() {
    let mut headers = HeaderMap::new();
    headers.insert(RETRY_AFTER, HeaderValue::from_static("5"));
    let record = classify_response(StatusCode::TOO_MANY_REQUESTS, None, &headers);

    let controller = RetryController::default();
    let mut attempt = AttemptState::new();

    assert_eq!(
        controller.decide(&record, &mut attempt),
        RetryDecision::Retry(Duration::from_millis(5000))
    );
}

#[test]
fn test_past_http_date_waits_zero() {
    let now = Utc.with_ymd_and_hms(2024, 6, 2, 12, 0, 0).unwrap();
    let controller = RetryController::default().with_clock(Arc::new(MockClock::new(now)));

    let mut headers = HeaderMap::new();
    headers.insert(RETRY_AFTER, HeaderValue::from_static("Sun, 02 Jun 2024 11:59:00 GMT"));
    let record = classify_response(StatusCode::BAD_GATEWAY, None, &headers);

    assert_eq!(
        controller.decide(&record, &mut AttemptState::new()),
        RetryDecision::Retry(Duration::ZERO)
    );
}

#[test]
fn test_terminal_kinds_never_retry() {
    let controller = RetryController::new(RetryConfig::new(10, Duration::from_millis(1)));

    for kind in [ErrorKind::Auth, ErrorKind::NotFound, ErrorKind::Validation, ErrorKind::Unknown] {
        let mut attempt = AttemptState::new();
        let record = ErrorRecord::new(kind, "terminal");
        assert_eq!(controller.decide(&record, &mut attempt), RetryDecision::Stop);
        assert_eq!(attempt.retry_count(), 0);
    }
}
