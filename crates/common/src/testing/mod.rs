//! Test doubles shared by unit and integration tests
//!
//! Enabled by the `test-utils` feature (and always inside this crate's own
//! tests). Pair them with [`MockClock`](crate::time::MockClock) for
//! time-dependent scenarios.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use stellar_common::auth::TokenManager;
//! use stellar_common::testing::{MockTokenRefresher, MockTokenStorage};
//!
//! let refresher = MockTokenRefresher::new();
//! let manager = TokenManager::new()
//!     .with_refresher(Arc::new(refresher.clone()))
//!     .with_storage(Arc::new(MockTokenStorage::new()));
//! assert!(manager.has_refresher());
//! ```

pub mod mocks;

pub use mocks::{MockTokenRefresher, MockTokenStorage};
