//! Time abstractions
//!
//! Everything that needs "now" (token expiry checks, `Retry-After` dates,
//! rate-limit reset countdowns) reads it through [`Clock`] so tests can use
//! [`MockClock`].

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
