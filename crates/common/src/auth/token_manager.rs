//! Token lifecycle manager
//!
//! Owns the current [`Credential`] for one client:
//! - Reports its lifecycle state against a 5 minute look-ahead window
//! - Refreshes proactively when a caller asks for a stale token
//! - Refreshes reactively when the executor reports an `auth` failure
//! - Persists every new credential through an optional [`TokenStorage`]
//!
//! Refreshes are single-flight: they are serialized by an async mutex, and a
//! caller that waited while another task replaced the token it was trying
//! to refresh simply uses the replacement.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::traits::{TokenRefresher, TokenStorage};
use super::types::{Credential, TokenState};
use crate::error::ErrorRecord;
use crate::time::{Clock, SystemClock};

/// Refresh this long before the credential actually expires
pub const DEFAULT_REFRESH_THRESHOLD_SECS: i64 = 300;

/// Shared owner of the current credential
pub struct TokenManager {
    current: RwLock<Option<Arc<Credential>>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    storage: Option<Arc<dyn TokenStorage>>,
    clock: Arc<dyn Clock>,
    refresh_threshold: chrono::Duration,
    refresh_gate: Mutex<()>,
}

impl TokenManager {
    /// Manager with no credential, no refresher and no storage
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            refresher: None,
            storage: None,
            clock: Arc::new(SystemClock),
            refresh_threshold: chrono::Duration::seconds(DEFAULT_REFRESH_THRESHOLD_SECS),
            refresh_gate: Mutex::new(()),
        }
    }

    /// Start with `credential` already held
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.current = RwLock::new(Some(Arc::new(credential)));
        self
    }

    /// Operation used to exchange the refresh token
    #[must_use]
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Persistence hook for new credentials
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn TokenStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Clock used for expiry checks
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the look-ahead window (default 5 minutes)
    #[must_use]
    pub fn with_refresh_threshold(mut self, threshold: chrono::Duration) -> Self {
        self.refresh_threshold = threshold;
        self
    }

    /// Load a persisted credential, if storage is configured
    ///
    /// Best-effort: storage errors are logged and treated as "nothing
    /// stored". An in-memory credential is never overwritten.
    ///
    /// # Returns
    /// `true` if a credential is held afterwards
    pub async fn initialize(&self) -> bool {
        let Some(storage) = &self.storage else {
            return self.is_authenticated().await;
        };

        let mut current = self.current.write().await;
        if current.is_some() {
            return true;
        }

        match storage.load().await {
            Ok(Some(credential)) => {
                *current = Some(Arc::new(credential));
                info!("Token manager initialized with persisted credential");
                true
            }
            Ok(None) => {
                debug!("No persisted credential found");
                false
            }
            Err(e) => {
                warn!(error = %e, "Failed to load persisted credential");
                false
            }
        }
    }

    /// Current credential without triggering a refresh
    pub async fn credential(&self) -> Option<Arc<Credential>> {
        self.current.read().await.clone()
    }

    /// Whether a credential is held, stale or not
    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Whether a refresh operation is configured
    pub fn has_refresher(&self) -> bool {
        self.refresher.is_some()
    }

    /// How long before expiry a proactive refresh starts
    pub fn refresh_threshold(&self) -> chrono::Duration {
        self.refresh_threshold
    }

    /// Lifecycle state at the clock's current time
    pub async fn state(&self) -> TokenState {
        let now = self.clock.now();
        match self.current.read().await.as_deref() {
            None => TokenState::NoToken,
            Some(credential) if credential.is_expired(now) => TokenState::Expired,
            Some(credential) if credential.needs_refresh(now, self.refresh_threshold) => {
                TokenState::NearExpiry
            }
            Some(_) => TokenState::Valid,
        }
    }

    /// True iff a credential is held and `now >= expires_at - threshold`
    pub async fn should_refresh(&self) -> bool {
        let now = self.clock.now();
        self.current
            .read()
            .await
            .as_deref()
            .is_some_and(|credential| credential.needs_refresh(now, self.refresh_threshold))
    }

    /// Access token to attach to the next request
    ///
    /// Returns `Ok(None)` when no credential is held. A stale credential is
    /// refreshed first when a refresher is configured.
    ///
    /// # Errors
    /// Propagates the refresh failure
    pub async fn get_access_token(&self) -> Result<Option<String>, ErrorRecord> {
        let Some(credential) = self.credential().await else {
            return Ok(None);
        };

        if self.refresher.is_some()
            && credential.needs_refresh(self.clock.now(), self.refresh_threshold)
        {
            debug!("Access token inside refresh window, refreshing before use");
            let refreshed = self.refresh_replacing(Some(credential.access_token())).await?;
            return Ok(Some(refreshed.access_token().to_string()));
        }

        Ok(Some(credential.access_token().to_string()))
    }

    /// Refresh the current credential unconditionally
    ///
    /// # Errors
    /// - `auth` if no refresh token is held
    /// - `auth` if no refresh operation is configured
    /// - whatever the refresh operation reports
    pub async fn refresh(&self) -> Result<Arc<Credential>, ErrorRecord> {
        let _gate = self.refresh_gate.lock().await;
        let credential = self.current.read().await.clone();
        self.refresh_locked(credential).await
    }

    /// Refresh unless another task already replaced `stale_token`
    ///
    /// Used by the request executor after a 401: `stale_token` is the token
    /// the failed request carried. If the held token no longer matches it,
    /// a concurrent refresh has already happened and its result is returned
    /// without calling the refresher again.
    ///
    /// # Errors
    /// Same as [`TokenManager::refresh`]
    pub async fn refresh_replacing(
        &self,
        stale_token: Option<&str>,
    ) -> Result<Arc<Credential>, ErrorRecord> {
        let _gate = self.refresh_gate.lock().await;
        let credential = self.current.read().await.clone();

        if let (Some(current), Some(stale)) = (&credential, stale_token) {
            if current.access_token() != stale {
                debug!("Credential already replaced by a concurrent refresh");
                return Ok(Arc::clone(current));
            }
        }

        self.refresh_locked(credential).await
    }

    async fn refresh_locked(
        &self,
        credential: Option<Arc<Credential>>,
    ) -> Result<Arc<Credential>, ErrorRecord> {
        let refresh_token = credential
            .as_deref()
            .and_then(Credential::refresh_token)
            .map(str::to_string)
            .ok_or_else(|| ErrorRecord::auth("No refresh token available"))?;

        let refresher = self
            .refresher
            .as_ref()
            .ok_or_else(|| ErrorRecord::auth("No refresh operation configured"))?;

        let mut fresh = refresher.refresh_access_token(&refresh_token).await?;
        // Servers may omit the refresh token on refresh; keep using the old one.
        if fresh.refresh_token().is_none() {
            fresh = fresh.with_refresh_token(refresh_token);
        }

        let fresh = Arc::new(fresh);
        *self.current.write().await = Some(Arc::clone(&fresh));
        info!(expires_at = %fresh.expires_at(), "Access token refreshed");

        self.persist(&fresh).await;
        Ok(fresh)
    }

    /// Replace the held credential (e.g. after an authorization-code login)
    pub async fn set_credential(&self, credential: Credential) {
        let credential = Arc::new(credential);
        *self.current.write().await = Some(Arc::clone(&credential));
        info!("Credential stored");
        self.persist(&credential).await;
    }

    /// Drop the held credential and clear storage (logout)
    pub async fn clear(&self) {
        *self.current.write().await = None;

        if let Some(storage) = &self.storage {
            if let Err(e) = storage.clear().await {
                warn!(error = %e, "Failed to clear persisted credential");
            }
        }
        info!("Credential cleared");
    }

    async fn persist(&self, credential: &Credential) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.save(credential).await {
                warn!(error = %e, "Failed to persist credential");
            }
        }
    }
}

impl Default for TokenManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("has_refresher", &self.refresher.is_some())
            .field("has_storage", &self.storage.is_some())
            .field("refresh_threshold", &self.refresh_threshold)
            .finish_non_exhaustive()
    }
}
