//! Request executor
//!
//! [`ApiClient`] runs one logical API call to completion: it attaches the
//! access token, records rate-limit headers, classifies failures, refreshes
//! the credential once on an auth failure and retries transient failures
//! with backoff. Callers only ever see a decoded payload or a single
//! [`ErrorRecord`].

use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use stellar_common::auth::{Credential, TokenManager, TokenRefresher, TokenStorage};
use stellar_common::error::classifier::classify_response;
use stellar_common::ratelimit::{RateLimitObserver, RateLimitSnapshot, RateLimitTracker};
use stellar_common::resilience::{AttemptState, RetryController, RetryDecision};
use stellar_common::{Clock, ErrorKind, ErrorRecord, SystemClock};
use tracing::{debug, instrument, warn};

use super::auth::parse_body;
use super::envelope::unwrap_envelope;
use crate::config::ClientConfig;
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Query parameter the API reads the bearer credential from
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Resilient JSON API client
pub struct ApiClient {
    http: HttpClient,
    config: ClientConfig,
    tokens: Arc<TokenManager>,
    rate_limits: Arc<RateLimitTracker>,
    retry: RetryController,
}

impl ApiClient {
    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Restore a persisted credential, if storage is configured
    ///
    /// Returns whether a credential is held afterwards.
    pub async fn initialize(&self) -> bool {
        self.tokens.initialize().await
    }

    /// Execute a request and decode the unwrapped payload
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP verb
    /// * `path` - Path appended to the configured base URL
    /// * `params` - Query parameters, sent before the access token
    /// * `body` - JSON body, if any
    ///
    /// # Errors
    ///
    /// Returns the classified failure once retries are exhausted or the
    /// failure is not retryable. An auth failure that survives one credential
    /// refresh is returned as-is; a failed refresh is returned with the
    /// original auth failure as its cause.
    #[instrument(skip(self, params, body), fields(%method, path = %path))]
    pub async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: Option<&[(&str, &str)]>,
        body: Option<Value>,
    ) -> Result<T, ErrorRecord> {
        let url = self.url_for(path);
        let mut attempt = AttemptState::new();
        let mut refreshed = false;

        loop {
            let token = self.tokens.get_access_token().await?;

            let mut request = self.http.request(method.clone(), &url);
            if let Some(params) = params {
                request = request.query(params);
            }
            if let Some(token) = token.as_deref() {
                request = request.query(&[(ACCESS_TOKEN_PARAM, token)]);
            }
            if let Some(body) = body.as_ref() {
                request = request.json(body);
            }

            let outcome = match self.http.send(request).await {
                Ok(response) => {
                    self.rate_limits.observe(response.headers());
                    if response.status().is_success() {
                        match decode_success(response).await {
                            Ok(payload) => return Ok(payload),
                            // Body cut off after the headers arrived.
                            Err(record) if record.kind() == ErrorKind::Network => record,
                            Err(record) => return Err(record),
                        }
                    } else {
                        failure_record(response).await
                    }
                }
                Err(record) => record,
            };

            if outcome.kind() == ErrorKind::Auth && !refreshed {
                refreshed = true;
                debug!("Auth failure, refreshing credential before retrying");
                match self.tokens.refresh_replacing(token.as_deref()).await {
                    Ok(_) => continue,
                    Err(refresh_err) => return Err(refresh_err.with_cause(outcome)),
                }
            }

            match self.retry.decide(&outcome, &mut attempt) {
                RetryDecision::Retry(delay) => {
                    warn!(
                        kind = %outcome.kind(),
                        status = ?outcome.status_code(),
                        retry = attempt.retry_count(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::Stop => return Err(outcome),
            }
        }
    }

    /// GET `path` with optional query parameters
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<&[(&str, &str)]>,
    ) -> Result<T, ErrorRecord> {
        self.execute(Method::GET, path, params, None).await
    }

    /// POST a JSON body to `path`
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ErrorRecord>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body).map_err(|e| ErrorRecord::from(InfraError::from(e)))?;
        self.execute(Method::POST, path, None, Some(body)).await
    }

    /// PUT a JSON body to `path`
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ErrorRecord>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body).map_err(|e| ErrorRecord::from(InfraError::from(e)))?;
        self.execute(Method::PUT, path, None, Some(body)).await
    }

    /// DELETE `path`
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ErrorRecord> {
        self.execute(Method::DELETE, path, None, None).await
    }

    /// Token manager shared by every request of this client
    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Tracker updated from every response's rate-limit headers
    pub fn rate_limits(&self) -> &Arc<RateLimitTracker> {
        &self.rate_limits
    }

    /// Most recent rate-limit snapshot
    pub fn rate_limit(&self) -> Option<RateLimitSnapshot> {
        self.rate_limits.current()
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url_for(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

async fn decode_success<T: DeserializeOwned>(response: Response) -> Result<T, ErrorRecord> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(|e| {
        let e = e.without_url();
        ErrorRecord::network(format!("Failed to read response body: {e}")).with_cause(e)
    })?;

    let value = if matches!(status, StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT)
        || bytes.iter().all(u8::is_ascii_whitespace)
    {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).map_err(|e| ErrorRecord::from(InfraError::from(e)))?
    };

    serde_json::from_value(unwrap_envelope(value))
        .map_err(|e| ErrorRecord::from(InfraError::from(e)))
}

async fn failure_record(response: Response) -> ErrorRecord {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.ok().and_then(|text| parse_body(&text));
    classify_response(status, body.as_ref(), &headers)
}

/// Builder for [`ApiClient`]
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ClientConfig>,
    credential: Option<Credential>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    storage: Option<Arc<dyn TokenStorage>>,
    clock: Option<Arc<dyn Clock>>,
    observer: Option<RateLimitObserver>,
}

impl ApiClientBuilder {
    /// Configuration; required
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Initial credential
    #[must_use]
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Use a bare access token with the default lifetime and no refresh token
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        let now = self.clock.as_ref().map_or_else(|| SystemClock.now(), |clock| clock.now());
        self.credential = Some(Credential::from_access_token(token, now));
        self
    }

    /// Operation used to refresh the credential
    #[must_use]
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Hook that persists the credential across restarts
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn TokenStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Clock for expiry and `Retry-After` arithmetic
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Callback invoked with every new rate-limit snapshot
    #[must_use]
    pub fn rate_limit_observer(mut self, observer: RateLimitObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// Returns a `validation` record if no config was given or it fails
    /// validation, or the transport could not be constructed.
    pub fn build(self) -> Result<ApiClient, ErrorRecord> {
        let config = self.config.ok_or_else(|| {
            ErrorRecord::new(ErrorKind::Validation, "ApiClient requires a ClientConfig")
        })?;
        config.validate().map_err(|e| ErrorRecord::from(InfraError::from(e)))?;

        let mut http = HttpClient::builder().timeout(config.timeout);
        if let Some(agent) = config.user_agent.as_deref() {
            http = http.user_agent(agent);
        }
        let http = http.build()?;

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let mut tokens = TokenManager::new().with_clock(Arc::clone(&clock));
        if let Some(credential) = self.credential {
            tokens = tokens.with_credential(credential);
        }
        if let Some(refresher) = self.refresher {
            tokens = tokens.with_refresher(refresher);
        }
        if let Some(storage) = self.storage {
            tokens = tokens.with_storage(storage);
        }

        let rate_limits = match self.observer {
            Some(observer) => RateLimitTracker::with_observer(observer),
            None => RateLimitTracker::new(),
        };

        let retry = RetryController::new(config.retry_config()).with_clock(clock);

        debug!(base_url = %config.base_url, max_retries = config.max_retries, "ApiClient built");

        Ok(ApiClient {
            http,
            config,
            tokens: Arc::new(tokens),
            rate_limits: Arc::new(rate_limits),
            retry,
        })
    }
}
