//! Integration tests for response classification
//!
//! Exercises the classifier through the public API the way the request
//! executor uses it: status + decoded body + headers in, record out.

#![cfg(feature = "runtime")]

use chrono::{TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde_json::json;
use stellar_common::error::classifier::{classify_response, is_rate_limit_signal};
use stellar_common::{ErrorClassification, ErrorKind, ErrorSeverity, RetryAfter};

fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(*name, HeaderValue::from_static(value));
    }
    map
}

/// Validates that every 5xx status is a retryable server failure.
#[test]
fn test_server_statuses_are_retryable() {
    for code in 500..=599u16 {
        let status = StatusCode::from_u16(code).expect("valid status");
        let record = classify_response(status, None, &HeaderMap::new());
        assert_eq!(record.kind(), ErrorKind::Server, "status {code}");
        assert!(record.retryable(), "status {code}");
    }
}

/// Validates the 429 path including the retry hint.
///
/// # Test Steps
/// 1. Classify a 429 carrying `Retry-After: 5`
/// 2. Verify kind, retryability and the hint in seconds
/// 3. Verify the user-facing sentence mentions the wait
#[test]
fn test_too_many_requests_with_retry_after() {
    let record = classify_response(
        StatusCode::TOO_MANY_REQUESTS,
        Some(&json!({"message": "Too many requests"})),
        &headers(&[("retry-after", "5")]),
    );

    assert_eq!(record.kind(), ErrorKind::RateLimit);
    assert!(record.retryable());
    assert_eq!(record.retry_after_seconds(Utc::now()), Some(5));
    assert_eq!(record.user_message(), "Rate limit exceeded; wait 5 seconds before retrying.");
    assert_eq!(record.severity(), ErrorSeverity::Warning);
}

#[test]
fn test_http_date_retry_after() {
    let record = classify_response(
        StatusCode::SERVICE_UNAVAILABLE,
        None,
        &headers(&[("retry-after", "Sun, 02 Jun 2024 10:00:30 GMT")]),
    );

    let now = Utc.with_ymd_and_hms(2024, 6, 2, 10, 0, 0).unwrap();
    assert!(matches!(record.retry_after_hint(), Some(RetryAfter::At(_))));
    assert_eq!(record.retry_after_seconds(now), Some(30));
}

#[test]
fn test_rate_limit_signal_in_validation_status() {
    let body = json!({"error": "rate_limit_exceeded"});
    assert!(is_rate_limit_signal(&body));

    let record = classify_response(StatusCode::BAD_REQUEST, Some(&body), &HeaderMap::new());
    assert_eq!(record.kind(), ErrorKind::RateLimit);
    assert!(record.retryable());
}

#[test]
fn test_not_found_is_terminal() {
    let record = classify_response(StatusCode::NOT_FOUND, None, &HeaderMap::new());
    assert_eq!(record.kind(), ErrorKind::NotFound);
    assert!(!record.retryable());
    assert_eq!(record.message(), "Resource not found");
}

/// Validates that classifying the same input twice yields equal records.
#[test]
fn test_classification_is_idempotent() {
    let body = json!({"error_description": "token expired"});
    let hdrs = headers(&[("x-request-id", "abc"), ("retry-after", "2")]);

    let first = classify_response(StatusCode::UNAUTHORIZED, Some(&body), &hdrs);
    let second = classify_response(StatusCode::UNAUTHORIZED, Some(&body), &hdrs);

    assert_eq!(first, second);
    assert_eq!(first.kind(), ErrorKind::Auth);
    assert_eq!(first.message(), "token expired");
    assert_eq!(first.request_id(), Some("abc"));
}
