//! JSON API surface
//!
//! - [`client`]: the request executor with auth, rate-limit tracking and retries
//! - [`auth`]: OAuth authorization-code flow and token refresh
//! - [`envelope`]: removal of the single-namespace response wrapper

pub mod auth;
pub mod client;
pub mod envelope;

pub use auth::{OAuthClient, OAuthEndpoints};
pub use client::{ApiClient, ApiClientBuilder, ACCESS_TOKEN_PARAM};
pub use envelope::unwrap_envelope;
