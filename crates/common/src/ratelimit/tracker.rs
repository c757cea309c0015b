use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use tracing::debug;

use super::snapshot::RateLimitSnapshot;

/// Callback invoked with every new snapshot
pub type RateLimitObserver = Arc<dyn Fn(&RateLimitSnapshot) + Send + Sync>;

/// Holds the most recent rate-limit snapshot for one client instance
///
/// Snapshots are replaced whole, never merged, so readers always see a
/// consistent set of values.
#[derive(Default)]
pub struct RateLimitTracker {
    snapshot: RwLock<Option<RateLimitSnapshot>>,
    observer: RwLock<Option<RateLimitObserver>>,
}

impl RateLimitTracker {
    /// Tracker with no snapshot and no observer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tracker that notifies `observer` on every update
    pub fn with_observer(observer: RateLimitObserver) -> Self {
        Self { snapshot: RwLock::new(None), observer: RwLock::new(Some(observer)) }
    }

    /// Record the rate-limit headers of a completed response
    ///
    /// Returns the new snapshot when the headers qualified. Responses
    /// without a usable limit header leave the previous snapshot untouched.
    pub fn observe(&self, headers: &HeaderMap) -> Option<RateLimitSnapshot> {
        let snapshot = RateLimitSnapshot::from_headers(headers)?;

        *self.snapshot.write() = Some(snapshot.clone());
        debug!(
            limit = snapshot.limit,
            remaining = snapshot.remaining,
            reset = snapshot.reset_epoch_seconds,
            "rate limit snapshot updated"
        );

        // Clone the handle so the callback runs without any tracker lock held.
        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer(&snapshot);
        }

        Some(snapshot)
    }

    /// Last observed snapshot, `None` before the first qualifying response
    pub fn current(&self) -> Option<RateLimitSnapshot> {
        self.snapshot.read().clone()
    }

    /// Install or replace the observer
    pub fn set_observer(&self, observer: RateLimitObserver) {
        *self.observer.write() = Some(observer);
    }

    /// Remove the observer, if any
    pub fn clear_observer(&self) {
        *self.observer.write() = None;
    }
}

impl fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("snapshot", &*self.snapshot.read())
            .field("has_observer", &self.observer.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use reqwest::header::HeaderValue;

    use super::*;
    use crate::ratelimit::{LIMIT_HEADER, REMAINING_HEADER};

    fn limit_headers(limit: &'static str, remaining: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(LIMIT_HEADER, HeaderValue::from_static(limit));
        headers.insert(REMAINING_HEADER, HeaderValue::from_static(remaining));
        headers
    }

    #[test]
    fn starts_unset() {
        assert!(RateLimitTracker::new().current().is_none());
    }

    #[test]
    fn replaces_snapshot_and_ignores_headerless_responses() {
        let tracker = RateLimitTracker::new();

        tracker.observe(&limit_headers("600", "42"));
        let first = tracker.current().unwrap();
        assert_eq!((first.limit, first.remaining), (600, 42));

        assert!(tracker.observe(&HeaderMap::new()).is_none());
        assert_eq!(tracker.current(), Some(first));

        tracker.observe(&limit_headers("600", "41"));
        assert_eq!(tracker.current().unwrap().remaining, 41);
    }

    #[test]
    fn observer_sees_every_update() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let tracker = RateLimitTracker::with_observer(Arc::new(move |snapshot| {
            assert_eq!(snapshot.limit, 600);
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        tracker.observe(&limit_headers("600", "10"));
        tracker.observe(&HeaderMap::new());
        tracker.observe(&limit_headers("600", "9"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        tracker.clear_observer();
        tracker.observe(&limit_headers("600", "8"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn observer_may_read_tracker() {
        let tracker = Arc::new(RateLimitTracker::new());
        let reader = Arc::downgrade(&tracker);
        let remaining = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&remaining);

        tracker.set_observer(Arc::new(move |_| {
            let current = reader
                .upgrade()
                .and_then(|tracker| tracker.current())
                .map_or(0, |snapshot| snapshot.remaining);
            sink.store(usize::try_from(current).unwrap_or(usize::MAX), Ordering::SeqCst);
        }));

        tracker.observe(&limit_headers("100", "7"));
        assert_eq!(remaining.load(Ordering::SeqCst), 7);
        // The observer holds no strong reference back to the tracker.
        assert_eq!(Arc::strong_count(&tracker), 1);
    }
}
