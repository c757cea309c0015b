//! OAuth credential exchange
//!
//! Talks to the authorization server's fixed endpoints with
//! `application/x-www-form-urlencoded` bodies and JSON responses. The
//! [`OAuthClient`] doubles as the [`TokenRefresher`] injected into the
//! token manager.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use stellar_common::auth::{Credential, OAuthClientIdentity, TokenRefresher, TokenResponse};
use stellar_common::error::classifier::classify_response;
use stellar_common::{Clock, ErrorKind, ErrorRecord, SystemClock};
use tracing::{debug, info, instrument, warn};

use crate::http::HttpClient;

/// Authorization server endpoints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub revoke_url: String,
}

impl OAuthEndpoints {
    /// `/oauth/authorize`, `/oauth/token` and `/oauth/revoke` under `base`
    pub fn under(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize_url: format!("{base}/oauth/authorize"),
            token_url: format!("{base}/oauth/token"),
            revoke_url: format!("{base}/oauth/revoke"),
        }
    }
}

/// OAuth client for the authorization-code flow
pub struct OAuthClient {
    http: HttpClient,
    identity: OAuthClientIdentity,
    endpoints: OAuthEndpoints,
    clock: Arc<dyn Clock>,
}

impl OAuthClient {
    /// Client using the system clock
    pub fn new(http: HttpClient, identity: OAuthClientIdentity, endpoints: OAuthEndpoints) -> Self {
        Self { http, identity, endpoints, clock: Arc::new(SystemClock) }
    }

    /// Clock used to stamp issued credentials
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Application identity sent to the authorization server
    pub fn identity(&self) -> &OAuthClientIdentity {
        &self.identity
    }

    /// Authorization server URLs
    pub fn endpoints(&self) -> &OAuthEndpoints {
        &self.endpoints
    }

    /// Build the URL the user opens to grant access
    ///
    /// # Arguments
    /// * `scopes` - Requested scopes, sent space-separated
    /// * `state` - Opaque value echoed back on the redirect
    ///
    /// # Errors
    /// Returns a `validation` record if the identity has no redirect URI
    pub fn authorization_url(&self, scopes: &[&str], state: &str) -> Result<String, ErrorRecord> {
        let redirect_uri = self.redirect_uri()?;
        let scope = scopes.join(" ");

        let params = [
            ("response_type", "code"),
            ("client_id", self.identity.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("scope", scope.as_str()),
            ("state", state),
            ("access_type", self.identity.access_type.as_str()),
        ];

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!("{}?{}", self.endpoints.authorize_url, query_string))
    }

    /// Exchange an authorization code for a credential
    ///
    /// # Errors
    /// Returns `auth` if the server rejects the code, otherwise the
    /// classified failure
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, ErrorRecord> {
        let redirect_uri = self.redirect_uri()?;
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.identity.client_id.as_str()),
            ("client_secret", self.identity.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ];

        let credential = self.token_request(&form).await?;
        info!("Authorization code exchanged for credential");
        Ok(credential)
    }

    /// Revoke a token at the authorization server
    ///
    /// # Errors
    /// Returns the classified failure of the revoke request
    #[instrument(skip_all)]
    pub async fn revoke(&self, token: &str) -> Result<(), ErrorRecord> {
        let form = [
            ("token", token),
            ("client_id", self.identity.client_id.as_str()),
            ("client_secret", self.identity.client_secret.as_str()),
        ];

        let request = self.http.request(Method::POST, &self.endpoints.revoke_url).form(&form);
        let response = self.http.send(request).await?;
        if !response.status().is_success() {
            return Err(token_endpoint_error(response).await);
        }

        info!("Token revoked");
        Ok(())
    }

    fn redirect_uri(&self) -> Result<&str, ErrorRecord> {
        self.identity.redirect_uri.as_deref().ok_or_else(|| {
            ErrorRecord::new(ErrorKind::Validation, "OAuth redirect URI is not configured")
        })
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<Credential, ErrorRecord> {
        let issued_at = self.clock.now();
        let request = self.http.request(Method::POST, &self.endpoints.token_url).form(form);
        let response = self.http.send(request).await?;

        if !response.status().is_success() {
            return Err(token_endpoint_error(response).await);
        }

        let bytes = response.bytes().await.map_err(|e| {
            ErrorRecord::network(format!("Failed to read token response: {e}")).with_cause(e)
        })?;
        let token_response: TokenResponse = serde_json::from_slice(&bytes).map_err(|e| {
            ErrorRecord::unknown(format!("Malformed token response: {e}")).with_cause(e)
        })?;

        debug!(
            has_refresh_token = token_response.refresh_token.is_some(),
            expires_in = ?token_response.expires_in,
            "Token endpoint responded"
        );
        Ok(token_response.into_credential(issued_at))
    }
}

#[async_trait]
impl TokenRefresher for OAuthClient {
    #[instrument(skip_all)]
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<Credential, ErrorRecord> {
        if refresh_token.is_empty() {
            return Err(ErrorRecord::auth("No refresh token available"));
        }

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.identity.client_id.as_str()),
            ("client_secret", self.identity.client_secret.as_str()),
        ];

        self.token_request(&form).await
    }
}

impl std::fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClient")
            .field("identity", &self.identity)
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

/// Classify a failed token-endpoint response
///
/// The token endpoint answers a revoked or unknown grant with 400, 401 or
/// 403; all three mean the credential cannot be renewed, so they surface as
/// `auth`.
async fn token_endpoint_error(response: Response) -> ErrorRecord {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.ok().and_then(|text| parse_body(&text));

    let classified = classify_response(status, body.as_ref(), &headers);
    if !matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || classified.kind() == ErrorKind::RateLimit
    {
        return classified;
    }

    warn!(status = status.as_u16(), "Token endpoint rejected the grant");
    let mut record =
        ErrorRecord::new(ErrorKind::Auth, classified.message()).with_status(status.as_u16());
    if let Some(request_id) = classified.request_id() {
        record = record.with_request_id(request_id);
    }
    if let Some(body) = body {
        record = record.with_raw_body(body);
    }
    record
}

/// Decoded error body: JSON when possible, the raw text otherwise
pub(crate) fn parse_body(text: &str) -> Option<Value> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}
