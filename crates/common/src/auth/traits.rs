//! Seams for the token manager's external collaborators
//!
//! The refresh operation and the persistence hook are injected so the
//! manager can be driven by mocks in tests and by the HTTP-backed
//! implementations in `stellar-infra` in production.

use async_trait::async_trait;

use super::types::Credential;
use crate::error::ErrorRecord;

/// Exchanges a refresh token for a new credential
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Obtain a fresh credential
    ///
    /// # Arguments
    /// * `refresh_token` - Refresh token held by the current credential
    ///
    /// # Errors
    /// Returns an `auth` record when the refresh token is rejected, or the
    /// classified failure of the exchange request otherwise
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<Credential, ErrorRecord>;
}

/// Persistence hook for the current credential
///
/// Failures are reported as plain strings; the token manager logs them and
/// carries on, so storage problems never fail a token operation.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Load the persisted credential, `Ok(None)` when nothing is stored
    async fn load(&self) -> Result<Option<Credential>, String>;

    /// Persist `credential`, replacing any stored one
    async fn save(&self, credential: &Credential) -> Result<(), String>;

    /// Remove the stored credential; succeeds if none is stored
    async fn clear(&self) -> Result<(), String>;
}
