//! Credential lifecycle for the Stellar API
//!
//! The API authenticates with short-lived access tokens passed as the
//! `access_token` query parameter. This module owns those tokens between
//! requests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  TokenManager   │  Credential owner, staleness checks, single-flight refresh
//! └────────┬────────┘
//!          │
//!          ├──► TokenRefresher   (refresh-token exchange, e.g. infra OAuthClient)
//!          │
//!          └──► TokenStorage     (optional persistence, best-effort)
//! ```
//!
//! # Lifecycle
//!
//! `NoToken → Valid → NearExpiry → Expired`, where `NearExpiry` starts five
//! minutes before the credential's expiry. Any successful refresh replaces
//! the credential wholesale and returns it to `Valid`.
//!
//! # Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::Utc;
//! use stellar_common::auth::{Credential, TokenManager, TokenRefresher};
//!
//! # async fn example(refresher: Arc<dyn TokenRefresher>) -> Result<(), stellar_common::ErrorRecord> {
//! let credential =
//!     Credential::issued_at("access", Some("refresh".to_string()), Some(3600), Utc::now());
//! let manager = TokenManager::new().with_credential(credential).with_refresher(refresher);
//!
//! // Refreshes first if the token is inside the look-ahead window
//! let token = manager.get_access_token().await?;
//! assert!(token.is_some());
//! # Ok(())
//! # }
//! ```

pub mod token_manager;
pub mod traits;
pub mod types;

pub use token_manager::{TokenManager, DEFAULT_REFRESH_THRESHOLD_SECS};
pub use traits::{TokenRefresher, TokenStorage};
pub use types::{
    AccessType, Credential, OAuthClientIdentity, TokenResponse, TokenState,
    DEFAULT_EXPIRES_IN_SECS,
};
