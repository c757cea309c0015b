//! Error taxonomy shared by every layer of the Stellar client
//!
//! Every failure surfaced to a caller is an [`ErrorRecord`] carrying exactly
//! one [`ErrorKind`] from a closed set. Presentation code matches on the kind
//! (or calls [`ErrorRecord::user_message`]) and never needs to branch on raw
//! HTTP status codes.
//!
//! # Error Handling Architecture
//!
//! 1. **`ErrorKind`**: the closed taxonomy (`auth`, `rate_limit`,
//!    `not_found`, `validation`, `server`, `network`, `unknown`).
//!
//! 2. **`ErrorRecord`**: an immutable value describing one failure: kind,
//!    human-readable message, optional status code, request id, raw response
//!    body, retry hint and underlying cause.
//!
//! 3. **`ErrorClassification` trait**: the standard interface for asking an
//!    error whether it is retryable, how severe it is and how long to wait.
//!
//! Building records from HTTP responses is the job of the
//! [`classifier`](crate::error::classifier) module (runtime tier).
//!
//! ## Kind semantics
//!
//! | Kind | Retryable | Typical source |
//! |------|-----------|----------------|
//! | `auth` | no (one refresh-and-retry instead) | 401, 403, missing refresh token |
//! | `rate_limit` | yes | 429, throttling reported through 400/422 |
//! | `not_found` | no | 404 |
//! | `validation` | no | 400, 422 |
//! | `server` | yes | 5xx |
//! | `network` | yes | connection refused, timeouts |
//! | `unknown` | no | anything else, undecodable bodies |

#[cfg(feature = "runtime")]
pub mod classifier;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result alias used across the workspace
pub type StellarResult<T> = Result<T, ErrorRecord>;

/// Closed taxonomy of failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Credential rejected or unavailable
    Auth,
    /// Server-side throttling
    RateLimit,
    /// Resource does not exist
    NotFound,
    /// Request rejected as malformed
    Validation,
    /// Server failure (5xx)
    Server,
    /// No response was received
    Network,
    /// Anything the other kinds do not cover
    Unknown,
}

impl ErrorKind {
    /// Wire-style name of the kind (`"rate_limit"`, `"not_found"`, ...)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::RateLimit => "rate_limit",
            Self::NotFound => "not_found",
            Self::Validation => "validation",
            Self::Server => "server",
            Self::Network => "network",
            Self::Unknown => "unknown",
        }
    }

    /// Whether failures of this kind are transient and may be retried
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        match self {
            Self::RateLimit | Self::Server | Self::Network => true,
            Self::Auth | Self::NotFound | Self::Validation | Self::Unknown => false,
        }
    }

    /// Message used when the response body offers nothing better
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Auth => "Authentication failed",
            Self::RateLimit => "Rate limit exceeded",
            Self::NotFound => "Resource not found",
            Self::Validation => "Request validation failed",
            Self::Server => "Server error",
            Self::Network => "Network request failed",
            Self::Unknown => "Unexpected response",
        }
    }

    /// Severity used for logging and alerting
    #[must_use]
    pub const fn severity(self) -> ErrorSeverity {
        match self {
            Self::NotFound => ErrorSeverity::Info,
            Self::RateLimit | Self::Network => ErrorSeverity::Warning,
            Self::Auth | Self::Validation | Self::Server | Self::Unknown => ErrorSeverity::Error,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed value of a `Retry-After` response header
///
/// The header is kept in its parsed form rather than converted to a duration
/// at classification time, so classifying the same response twice always
/// yields the same record. Use [`RetryAfter::delay_from`] to resolve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAfter {
    /// Delay expressed as a number of seconds
    Seconds(u64),
    /// Absolute point in time (HTTP date)
    At(DateTime<Utc>),
}

impl RetryAfter {
    /// Parse a header value: an integer second count, otherwise an HTTP date
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        if let Ok(seconds) = value.parse::<u64>() {
            return Some(Self::Seconds(seconds));
        }

        DateTime::parse_from_rfc2822(value).ok().map(|at| Self::At(at.with_timezone(&Utc)))
    }

    /// Resolve the hint to a wait duration relative to `now`
    ///
    /// Dates in the past resolve to zero.
    #[must_use]
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        match self {
            Self::Seconds(seconds) => Duration::from_secs(*seconds),
            Self::At(at) => (*at - now).to_std().unwrap_or(Duration::ZERO),
        }
    }
}

/// Normalized description of one failed operation
///
/// Records are built once (by the classifier or one of the constructors
/// below) and never modified afterwards; the `with_*` methods consume the
/// record and return a new one.
#[derive(Debug, Clone, Error)]
#[error("{kind} error: {message}")]
pub struct ErrorRecord {
    kind: ErrorKind,
    message: String,
    status_code: Option<u16>,
    request_id: Option<String>,
    raw_body: Option<Value>,
    retryable: bool,
    retry_after: Option<RetryAfter>,
    #[source]
    cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ErrorRecord {
    /// Create a record of the given kind; retryability follows the kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status_code: None,
            request_id: None,
            raw_body: None,
            retryable: kind.is_retryable(),
            retry_after: None,
            cause: None,
        }
    }

    /// Authentication failure
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    /// Transport failure before any response was received
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// Failure that fits no other kind
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Attach the HTTP status code
    #[must_use]
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    /// Attach the server-assigned request id
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Attach the raw (decoded) response body
    #[must_use]
    pub fn with_raw_body(mut self, body: Value) -> Self {
        self.raw_body = Some(body);
        self
    }

    /// Attach a `Retry-After` hint
    #[must_use]
    pub fn with_retry_after(mut self, retry_after: RetryAfter) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Attach the underlying cause
    #[must_use]
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Taxonomy kind
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Most descriptive message available
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status, absent for transport failures
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    /// Value of the `x-request-id` response header
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Decoded response body, kept for diagnostics
    #[must_use]
    pub fn raw_body(&self) -> Option<&Value> {
        self.raw_body.as_ref()
    }

    /// Whether the retry controller may try again
    #[must_use]
    pub fn retryable(&self) -> bool {
        self.retryable
    }

    /// Raw `Retry-After` hint, if the response carried one
    #[must_use]
    pub fn retry_after_hint(&self) -> Option<RetryAfter> {
        self.retry_after
    }

    /// Retry hint in whole seconds relative to `now`
    #[must_use]
    pub fn retry_after_seconds(&self, now: DateTime<Utc>) -> Option<u64> {
        self.retry_after.map(|hint| hint.delay_from(now).as_secs())
    }

    /// Underlying cause, if one was attached
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// One fixed, non-technical sentence per kind
    ///
    /// Never includes the status code or the raw body. `rate_limit` mentions
    /// the wait time when the server supplied one.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self.kind {
            ErrorKind::Auth => "Your session has expired. Please sign in again.".to_string(),
            ErrorKind::RateLimit => match self.retry_after_seconds(Utc::now()) {
                Some(seconds) => {
                    format!("Rate limit exceeded; wait {seconds} seconds before retrying.")
                }
                None => "Rate limit exceeded; please wait before retrying.".to_string(),
            },
            ErrorKind::NotFound => "The requested item could not be found.".to_string(),
            ErrorKind::Validation => {
                "The request was rejected. Please check the provided values.".to_string()
            }
            ErrorKind::Server => {
                "The service is having trouble right now. Please try again later.".to_string()
            }
            ErrorKind::Network => {
                "Unable to reach the service. Check your network connection.".to_string()
            }
            ErrorKind::Unknown => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// Records compare by their observable fields; the cause is not compared.
impl PartialEq for ErrorRecord {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.message == other.message
            && self.status_code == other.status_code
            && self.request_id == other.request_id
            && self.raw_body == other.raw_body
            && self.retryable == other.retryable
            && self.retry_after == other.retry_after
    }
}

/// Standard trait for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Check if this error is retryable
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    ///
    /// Returns `Some(Duration)` when a specific delay was recommended (e.g.
    /// from a Retry-After header), `None` otherwise.
    fn retry_after(&self) -> Option<Duration>;
}

impl ErrorClassification for ErrorRecord {
    fn is_retryable(&self) -> bool {
        self.retryable
    }

    fn severity(&self) -> ErrorSeverity {
        self.kind.severity()
    }

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after.map(|hint| hint.delay_from(Utc::now()))
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}
