//! Serde helpers for time values
//!
//! Configuration files carry durations as plain millisecond counts and
//! persisted credentials carry their expiry as epoch milliseconds; these
//! modules plug into `#[serde(with = "...")]` to handle both.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serializer};

/// `Duration` <-> milliseconds (`u64`)
///
/// ```rust
/// use std::time::Duration;
///
/// use serde::{Deserialize, Serialize};
/// use stellar_common::utils::serde::duration_millis;
///
/// #[derive(Serialize, Deserialize)]
/// struct Settings {
///     #[serde(with = "duration_millis")]
///     timeout: Duration,
/// }
/// ```
pub mod duration_millis {
    use super::*;

    /// Write the duration as whole milliseconds
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    /// Read a millisecond count
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// `DateTime<Utc>` <-> milliseconds since the UNIX epoch (`i64`)
pub mod epoch_millis {
    use super::*;

    /// Write the instant as epoch milliseconds
    pub fn serialize<S>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(at.timestamp_millis())
    }

    /// Read epoch milliseconds
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        DateTime::<Utc>::from_timestamp_millis(millis)
            .ok_or_else(|| de::Error::custom(format!("epoch millis out of range: {millis}")))
    }
}
