//! Test doubles for the token manager's collaborators
//!
//! Both mocks are cheap to clone and share their state between clones, so a
//! test can hand one clone to the code under test and inspect another.

#![allow(clippy::missing_errors_doc)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::auth::{Credential, TokenRefresher, TokenStorage};
use crate::error::ErrorRecord;

/// In-memory [`TokenStorage`] with failure injection
#[derive(Debug, Clone, Default)]
pub struct MockTokenStorage {
    stored: Arc<Mutex<Option<Credential>>>,
    should_fail: Arc<AtomicBool>,
    save_count: Arc<AtomicUsize>,
    clear_count: Arc<AtomicUsize>,
}

impl MockTokenStorage {
    /// Empty storage that never fails
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with `credential`
    pub fn with_credential(credential: Credential) -> Self {
        let storage = Self::new();
        *storage.stored.lock() = Some(credential);
        storage
    }

    /// Make every operation fail until reset.
    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    /// Credential currently held
    pub fn stored(&self) -> Option<Credential> {
        self.stored.lock().clone()
    }

    /// Number of `save` calls, failed ones included
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Number of `clear` calls, failed ones included
    pub fn clear_count(&self) -> usize {
        self.clear_count.load(Ordering::SeqCst)
    }

    fn check(&self, operation: &str) -> Result<(), String> {
        if self.should_fail.load(Ordering::SeqCst) {
            Err(format!("mock storage {operation} failure"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TokenStorage for MockTokenStorage {
    async fn load(&self) -> Result<Option<Credential>, String> {
        self.check("load")?;
        Ok(self.stored.lock().clone())
    }

    async fn save(&self, credential: &Credential) -> Result<(), String> {
        self.save_count.fetch_add(1, Ordering::SeqCst);
        self.check("save")?;
        *self.stored.lock() = Some(credential.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), String> {
        self.clear_count.fetch_add(1, Ordering::SeqCst);
        self.check("clear")?;
        *self.stored.lock() = None;
        Ok(())
    }
}

/// Scripted [`TokenRefresher`]
///
/// Without a configured response each call returns a credential whose access
/// token is `refreshed-<n>` (n counting from 1), valid for one hour.
#[derive(Debug, Clone, Default)]
pub struct MockTokenRefresher {
    calls: Arc<AtomicUsize>,
    response: Arc<Mutex<Option<Credential>>>,
    failure: Arc<Mutex<Option<ErrorRecord>>>,
    delay: Arc<Mutex<Option<Duration>>>,
    seen_tokens: Arc<Mutex<Vec<String>>>,
}

impl MockTokenRefresher {
    /// Refresher that issues `refreshed-<n>` credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `credential` from every successful call.
    pub fn set_response(&self, credential: Credential) {
        *self.response.lock() = Some(credential);
    }

    /// Fail every call with `error`; `None` restores success.
    pub fn set_failure(&self, error: Option<ErrorRecord>) {
        *self.failure.lock() = error;
    }

    /// Sleep before answering, to widen race windows in concurrency tests.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Number of refresh calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether any refresh call happened
    pub fn was_called(&self) -> bool {
        self.call_count() > 0
    }

    /// Refresh tokens received, in call order
    pub fn seen_tokens(&self) -> Vec<String> {
        self.seen_tokens.lock().clone()
    }
}

#[async_trait]
impl TokenRefresher for MockTokenRefresher {
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<Credential, ErrorRecord> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.seen_tokens.lock().push(refresh_token.to_string());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }

        let configured = self.response.lock().clone();
        Ok(configured.unwrap_or_else(|| {
            Credential::issued_at(format!("refreshed-{call}"), None, Some(3600), Utc::now())
        }))
    }
}
