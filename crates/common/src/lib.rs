//! Shared building blocks for the Stellar API client.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error taxonomy, serde helpers
//! - `runtime`: response classifier, rate-limit tracker, retry controller,
//!   token lifecycle, clock (pulls in tokio, reqwest and tracing)
//! - `test-utils`: mock refresher and storage for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod auth;
#[cfg(feature = "runtime")]
pub mod ratelimit;
#[cfg(feature = "runtime")]
pub mod resilience;
#[cfg(feature = "runtime")]
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(all(feature = "runtime", any(feature = "test-utils", test)))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use auth::{Credential, OAuthClientIdentity, TokenManager, TokenRefresher, TokenStorage};
#[cfg(feature = "foundation")]
pub use error::{
    ErrorClassification, ErrorKind, ErrorRecord, ErrorSeverity, RetryAfter, StellarResult,
};
#[cfg(feature = "runtime")]
pub use ratelimit::{RateLimitObserver, RateLimitSnapshot, RateLimitTracker};
#[cfg(feature = "runtime")]
pub use resilience::{AttemptState, RetryConfig, RetryController, RetryDecision};
#[cfg(feature = "runtime")]
pub use time::{Clock, MockClock, SystemClock};
#[cfg(feature = "foundation")]
pub use utils::serde::duration_millis;
