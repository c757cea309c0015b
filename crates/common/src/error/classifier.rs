//! Maps raw request outcomes onto [`ErrorRecord`]s
//!
//! Classification is a pure function of its inputs: the same status, body
//! and headers always produce the same record. Two entry points exist, one
//! for outcomes where no response arrived at all and one for HTTP responses
//! with a non-success status.

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde_json::Value;

use super::{ErrorKind, ErrorRecord, RetryAfter};

/// Header carrying the server-assigned request identifier
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Body `error` code the API uses to report throttling on 400/422
const RATE_LIMIT_ERROR_CODE: &str = "rate_limit_exceeded";

/// Classify a failure where no response was received
///
/// Always yields a retryable `network` record with the underlying transport
/// error attached as its cause.
pub fn classify_transport_failure<E>(cause: E) -> ErrorRecord
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = format!("{}: {cause}", ErrorKind::Network.default_message());
    ErrorRecord::network(message).with_cause(cause)
}

/// Classify a non-success HTTP response
///
/// `body` is the decoded response body when one could be decoded. The
/// `x-request-id` and `Retry-After` headers are captured whatever the status.
pub fn classify_response(
    status: StatusCode,
    body: Option<&Value>,
    headers: &HeaderMap,
) -> ErrorRecord {
    let kind = kind_for_status(status, body);
    let message = select_message(kind, body);

    let mut record = ErrorRecord::new(kind, message).with_status(status.as_u16());

    if let Some(request_id) = header_str(headers, REQUEST_ID_HEADER) {
        record = record.with_request_id(request_id);
    }
    if let Some(retry_after) = headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(RetryAfter::parse)
    {
        record = record.with_retry_after(retry_after);
    }
    if let Some(body) = body {
        record = record.with_raw_body(body.clone());
    }

    record
}

/// Decide the kind for a status code, consulting the body where the API
/// overloads 400/422 to report throttling
#[must_use]
pub fn kind_for_status(status: StatusCode, body: Option<&Value>) -> ErrorKind {
    match status.as_u16() {
        401 | 403 => ErrorKind::Auth,
        404 => ErrorKind::NotFound,
        429 => ErrorKind::RateLimit,
        400 | 422 if body.is_some_and(is_rate_limit_signal) => ErrorKind::RateLimit,
        400 | 422 => ErrorKind::Validation,
        500..=599 => ErrorKind::Server,
        _ => ErrorKind::Unknown,
    }
}

/// Whether a response body reports a rate-limit condition
///
/// Matches the `rate_limit_exceeded` error code, or "rate limit" (any case)
/// inside the `message` or `error_description` fields.
#[must_use]
pub fn is_rate_limit_signal(body: &Value) -> bool {
    if body.get("error").and_then(Value::as_str) == Some(RATE_LIMIT_ERROR_CODE) {
        return true;
    }

    ["message", "error_description"].iter().any(|field| {
        body.get(field)
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_ascii_lowercase().contains("rate limit"))
    })
}

/// Pick the most descriptive message from the body
///
/// Precedence: `error_description`, then `message`, then `error` when it is
/// a plain string, then the kind's default.
#[must_use]
pub fn select_message(kind: ErrorKind, body: Option<&Value>) -> String {
    body.and_then(|body| {
        ["error_description", "message", "error"]
            .iter()
            .find_map(|field| body.get(field).and_then(Value::as_str))
            .filter(|text| !text.trim().is_empty())
    })
    .map_or_else(|| kind.default_message().to_string(), str::to_string)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok()).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;
    use serde_json::json;

    use super::*;

    fn classify(status: u16, body: Option<Value>) -> ErrorRecord {
        let status = StatusCode::from_u16(status).unwrap();
        classify_response(status, body.as_ref(), &HeaderMap::new())
    }

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(classify(401, None).kind(), ErrorKind::Auth);
        assert_eq!(classify(403, None).kind(), ErrorKind::Auth);
        assert_eq!(classify(404, None).kind(), ErrorKind::NotFound);
        assert_eq!(classify(429, None).kind(), ErrorKind::RateLimit);
        assert_eq!(classify(400, None).kind(), ErrorKind::Validation);
        assert_eq!(classify(422, None).kind(), ErrorKind::Validation);
        assert_eq!(classify(500, None).kind(), ErrorKind::Server);
        assert_eq!(classify(503, None).kind(), ErrorKind::Server);
        assert_eq!(classify(418, None).kind(), ErrorKind::Unknown);
        assert_eq!(classify(302, None).kind(), ErrorKind::Unknown);
    }

    #[test]
    fn throttling_reported_through_400_is_rate_limit() {
        let coded = classify(400, Some(json!({"error": "rate_limit_exceeded"})));
        assert_eq!(coded.kind(), ErrorKind::RateLimit);
        assert!(coded.retryable());

        let described = classify(422, Some(json!({"message": "Rate Limit reached for app"})));
        assert_eq!(described.kind(), ErrorKind::RateLimit);

        let plain = classify(400, Some(json!({"error": "invalid_param"})));
        assert_eq!(plain.kind(), ErrorKind::Validation);
        assert!(!plain.retryable());
    }

    #[test]
    fn message_precedence() {
        let body = json!({
            "error": "invalid_grant",
            "message": "generic",
            "error_description": "Refresh token revoked"
        });
        assert_eq!(classify(400, Some(body)).message(), "Refresh token revoked");

        let body = json!({"error": "invalid_grant", "message": "generic"});
        assert_eq!(classify(400, Some(body)).message(), "generic");

        let body = json!({"error": "invalid_grant"});
        assert_eq!(classify(400, Some(body)).message(), "invalid_grant");

        let body = json!({"error": {"code": 7}});
        assert_eq!(classify(400, Some(body)).message(), ErrorKind::Validation.default_message());

        assert_eq!(classify(500, None).message(), ErrorKind::Server.default_message());
    }

    #[test]
    fn headers_are_captured_on_any_status() {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-42"));
        headers.insert(RETRY_AFTER, HeaderValue::from_static("5"));

        let record = classify_response(StatusCode::SERVICE_UNAVAILABLE, None, &headers);
        assert_eq!(record.kind(), ErrorKind::Server);
        assert_eq!(record.request_id(), Some("req-42"));
        assert_eq!(record.retry_after_hint(), Some(RetryAfter::Seconds(5)));
        assert_eq!(record.status_code(), Some(503));
    }

    #[test]
    fn raw_body_is_retained() {
        let body = json!({"message": "nope"});
        let record = classify(404, Some(body.clone()));
        assert_eq!(record.raw_body(), Some(&body));
    }

    #[test]
    fn classification_is_deterministic() {
        let body = json!({"error": "rate_limit_exceeded"});
        assert_eq!(classify(400, Some(body.clone())), classify(400, Some(body)));
    }

    #[test]
    fn transport_failures_are_network() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let record = classify_transport_failure(io);

        assert_eq!(record.kind(), ErrorKind::Network);
        assert!(record.retryable());
        assert_eq!(record.status_code(), None);
        assert!(record.cause().is_some());
        assert!(record.message().contains("connection refused"));
    }
}
