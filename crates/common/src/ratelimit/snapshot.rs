use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

/// Total requests allowed in the current window
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Requests left in the current window
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Window reset as epoch seconds
pub const RESET_HEADER: &str = "x-ratelimit-reset";
/// Window reset as a display string
pub const RESET_TIME_HEADER: &str = "x-ratelimit-resettime";

/// Rate-limit state reported by the most recent qualifying response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub limit: u64,
    pub remaining: u64,
    pub reset_epoch_seconds: i64,
    pub reset_time_display: String,
}

impl RateLimitSnapshot {
    /// Build a snapshot from response headers
    ///
    /// Returns `None` unless `x-ratelimit-limit` is present and numeric.
    /// Missing or malformed `remaining`/`reset` read as zero; a missing
    /// `resettime` is derived from the reset epoch.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let limit = header_number::<u64>(headers, LIMIT_HEADER)?;
        let remaining = header_number::<u64>(headers, REMAINING_HEADER).unwrap_or(0);
        let reset_epoch_seconds = header_number::<i64>(headers, RESET_HEADER).unwrap_or(0);

        let reset_time_display = headers
            .get(RESET_TIME_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| display_for_epoch(reset_epoch_seconds));

        Some(Self { limit, remaining, reset_epoch_seconds, reset_time_display })
    }

    /// No requests remain in the current window
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Seconds until the window resets, zero once it has passed
    #[must_use]
    pub fn seconds_until_reset(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from(self.reset_epoch_seconds.saturating_sub(now.timestamp())).unwrap_or(0)
    }
}

fn header_number<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn display_for_epoch(epoch_seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch_seconds, 0)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use reqwest::header::HeaderValue;

    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn parses_all_headers() {
        let snapshot = RateLimitSnapshot::from_headers(&headers(&[
            (LIMIT_HEADER, "600"),
            (REMAINING_HEADER, "42"),
            (RESET_HEADER, "1700000000"),
            (RESET_TIME_HEADER, "Tue, 14 Nov 2023 22:13:20 GMT"),
        ]))
        .unwrap();

        assert_eq!(snapshot.limit, 600);
        assert_eq!(snapshot.remaining, 42);
        assert_eq!(snapshot.reset_epoch_seconds, 1_700_000_000);
        assert_eq!(snapshot.reset_time_display, "Tue, 14 Nov 2023 22:13:20 GMT");
        assert!(!snapshot.is_exhausted());
    }

    #[test]
    fn requires_limit_header() {
        assert!(RateLimitSnapshot::from_headers(&headers(&[(REMAINING_HEADER, "1")])).is_none());
        assert!(RateLimitSnapshot::from_headers(&headers(&[(LIMIT_HEADER, "lots")])).is_none());
    }

    #[test]
    fn missing_fields_default() {
        let snapshot =
            RateLimitSnapshot::from_headers(&headers(&[(LIMIT_HEADER, "100")])).unwrap();
        assert_eq!(snapshot.remaining, 0);
        assert_eq!(snapshot.reset_epoch_seconds, 0);
        assert_eq!(snapshot.reset_time_display, "1970-01-01T00:00:00Z");
        assert!(snapshot.is_exhausted());
    }

    #[test]
    fn reset_time_is_derived_from_epoch() {
        let snapshot = RateLimitSnapshot::from_headers(&headers(&[
            (LIMIT_HEADER, "100"),
            (RESET_HEADER, "1700000000"),
        ]))
        .unwrap();
        assert_eq!(snapshot.reset_time_display, "2023-11-14T22:13:20Z");
    }

    #[test]
    fn countdown_never_goes_negative() {
        let snapshot = RateLimitSnapshot {
            limit: 10,
            remaining: 0,
            reset_epoch_seconds: 1_700_000_060,
            reset_time_display: String::new(),
        };
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(snapshot.seconds_until_reset(now), 60);

        let later = Utc.timestamp_opt(1_700_001_000, 0).unwrap();
        assert_eq!(snapshot.seconds_until_reset(later), 0);
    }
}
