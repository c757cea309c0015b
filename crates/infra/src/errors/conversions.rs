//! Conversions from external infrastructure errors into `ErrorRecord`.

use reqwest::Error as HttpError;
use stellar_common::error::classifier::{classify_transport_failure, kind_for_status};
use stellar_common::{ErrorKind, ErrorRecord};

use crate::config::ConfigError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the shared record type.
#[derive(Debug)]
pub struct InfraError(pub ErrorRecord);

impl From<InfraError> for ErrorRecord {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<ErrorRecord> for InfraError {
    fn from(value: ErrorRecord) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoErrorRecord {
    fn into_record(self) -> ErrorRecord;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → ErrorRecord */
/* -------------------------------------------------------------------------- */

impl IntoErrorRecord for HttpError {
    fn into_record(self) -> ErrorRecord {
        if self.is_builder() {
            return ErrorRecord::new(ErrorKind::Validation, format!("invalid request: {self}"))
                .with_cause(self);
        }

        if self.is_decode() {
            return ErrorRecord::unknown(format!("failed to decode response: {self}"))
                .with_cause(self);
        }

        if let Some(status) = self.status() {
            let kind = kind_for_status(status, None);
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));
            return ErrorRecord::new(kind, message).with_status(code).with_cause(self);
        }

        // Timeouts, refused connections and dropped streams: no response.
        classify_transport_failure(self)
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_record())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → ErrorRecord */
/* -------------------------------------------------------------------------- */

impl IntoErrorRecord for serde_json::Error {
    fn into_record(self) -> ErrorRecord {
        ErrorRecord::unknown(format!("unexpected response shape: {self}")).with_cause(self)
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(value.into_record())
    }
}

/* -------------------------------------------------------------------------- */
/* ConfigError → ErrorRecord */
/* -------------------------------------------------------------------------- */

impl IntoErrorRecord for ConfigError {
    fn into_record(self) -> ErrorRecord {
        ErrorRecord::new(ErrorKind::Validation, self.to_string()).with_cause(self)
    }
}

impl From<ConfigError> for InfraError {
    fn from(value: ConfigError) -> Self {
        InfraError(value.into_record())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
