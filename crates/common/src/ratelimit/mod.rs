//! Rate-limit tracking
//!
//! The API reports its throttling window through `x-ratelimit-*` headers on
//! every response. [`RateLimitTracker`] keeps the latest
//! [`RateLimitSnapshot`] and forwards each update to an optional observer
//! (typically a UI indicator).

mod snapshot;
mod tracker;

pub use snapshot::{
    RateLimitSnapshot, LIMIT_HEADER, REMAINING_HEADER, RESET_HEADER, RESET_TIME_HEADER,
};
pub use tracker::{RateLimitObserver, RateLimitTracker};
