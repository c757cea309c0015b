//! Credential and OAuth identity types
//!
//! A [`Credential`] is an immutable value: refresh produces a new one that
//! replaces the old wholesale. Its expiry is an absolute instant computed at
//! issuance, so it never drifts as time passes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::serde::epoch_millis;

/// Lifetime assumed when the server omits `expires_in`
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Access credential for the API
///
/// `Debug` output redacts both tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(rename = "expiresAtEpochMs", with = "epoch_millis")]
    expires_at: DateTime<Utc>,
}

impl Credential {
    /// Credential expiring at an absolute instant
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self { access_token: access_token.into(), refresh_token, expires_at }
    }

    /// Build a credential issued at `issued_at`
    ///
    /// # Arguments
    /// * `expires_in` - Lifetime in seconds as reported by the server;
    ///   `None` or a negative value falls back to [`DEFAULT_EXPIRES_IN_SECS`],
    ///   a value beyond the representable range saturates
    #[must_use]
    pub fn issued_at(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        let seconds = expires_in.filter(|secs| *secs >= 0).unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let lifetime = chrono::Duration::try_seconds(seconds).unwrap_or(chrono::Duration::MAX);
        let expires_at =
            issued_at.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(access_token, refresh_token, expires_at)
    }

    /// Wrap a bare access token with no refresh token and the default lifetime
    #[must_use]
    pub fn from_access_token(access_token: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self::issued_at(access_token, None, None, issued_at)
    }

    /// Token attached to API requests
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Token used to obtain a new access token, if issued
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Instant the access token stops being valid
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Expiry as milliseconds since the Unix epoch
    pub fn expires_at_epoch_ms(&self) -> i64 {
        self.expires_at.timestamp_millis()
    }

    /// True iff `now >= expires_at - threshold`
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
        let refresh_at =
            self.expires_at.checked_sub_signed(threshold).unwrap_or(DateTime::<Utc>::MIN_UTC);
        now >= refresh_at
    }

    /// Whether the access token is past its expiry at `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Copy of this credential carrying `refresh_token`
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Whether the authorization grant should yield a refresh token
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Online,
    #[default]
    Offline,
}

impl AccessType {
    /// Wire value sent as the `access_type` parameter
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registered OAuth application identity
///
/// Needed only for the authorization flow and token refresh.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthClientIdentity {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub access_type: AccessType,
}

impl OAuthClientIdentity {
    /// Identity with no redirect URI and offline access
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: None,
            access_type: AccessType::default(),
        }
    }

    /// Set the URI the authorization server redirects back to
    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    /// Set the requested access type
    #[must_use]
    pub fn with_access_type(mut self, access_type: AccessType) -> Self {
        self.access_type = access_type;
        self
    }
}

impl fmt::Debug for OAuthClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientIdentity")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("access_type", &self.access_type)
            .finish()
    }
}

/// JSON body returned by the credential-exchange endpoints
#[derive(Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    /// Credential issued at `issued_at` from this response
    pub fn into_credential(self, issued_at: DateTime<Utc>) -> Credential {
        Credential::issued_at(self.access_token, self.refresh_token, self.expires_in, issued_at)
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Lifecycle state of the held credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// No credential held
    NoToken,
    /// Valid beyond the refresh threshold
    Valid,
    /// Inside the refresh threshold but not yet expired
    NearExpiry,
    Expired,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn issued() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn oversized_expires_in_saturates() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","expires_in":100000000000000000}"#,
        )
        .unwrap();
        let credential = response.into_credential(issued());

        assert_eq!(credential.expires_at(), DateTime::<Utc>::MAX_UTC);
        assert!(!credential.is_expired(issued()));
    }

    #[test]
    fn negative_expires_in_uses_default_lifetime() {
        let credential = Credential::issued_at("a", None, Some(-30), issued());
        assert_eq!(credential.expires_at(), issued() + chrono::Duration::seconds(3600));
    }

    #[test]
    fn expiry_defaults_to_one_hour() {
        let credential = Credential::from_access_token("abc", issued());
        assert_eq!(credential.expires_at(), issued() + chrono::Duration::seconds(3600));
        assert!(credential.refresh_token().is_none());
    }

    #[test]
    fn explicit_expires_in_wins() {
        let credential = Credential::issued_at("abc", Some("r".into()), Some(120), issued());
        assert_eq!(credential.expires_at(), issued() + chrono::Duration::seconds(120));
    }

    #[test]
    fn refresh_boundary_is_inclusive() {
        let credential = Credential::from_access_token("abc", issued());
        let threshold = chrono::Duration::minutes(5);
        let boundary = credential.expires_at() - threshold;

        assert!(!credential.needs_refresh(boundary - chrono::Duration::milliseconds(1), threshold));
        assert!(credential.needs_refresh(boundary, threshold));
        assert!(!credential.is_expired(boundary));
        assert!(credential.is_expired(credential.expires_at()));
    }

    #[test]
    fn debug_redacts_secrets() {
        let credential =
            Credential::issued_at("secret-access", Some("secret-refresh".into()), None, issued());
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));

        let identity = OAuthClientIdentity::new("client", "hunter2");
        assert!(!format!("{identity:?}").contains("hunter2"));
    }

    #[test]
    fn credential_serializes_epoch_millis() {
        let credential = Credential::from_access_token("abc", issued());
        let json = serde_json::to_value(&credential).unwrap();
        assert_eq!(json["accessToken"], "abc");
        assert_eq!(json["expiresAtEpochMs"], credential.expires_at_epoch_ms());
        assert!(json.get("refreshToken").is_none());

        let back: Credential = serde_json::from_value(json).unwrap();
        assert_eq!(back, credential);
    }

    #[test]
    fn token_response_defaults() {
        let response: TokenResponse = serde_json::from_str(r#"{"access_token":"new"}"#).unwrap();
        let credential = response.into_credential(issued());
        assert_eq!(credential.access_token(), "new");
        assert_eq!(credential.expires_at(), issued() + chrono::Duration::seconds(3600));
    }

    #[test]
    fn access_type_defaults_offline() {
        assert_eq!(AccessType::default(), AccessType::Offline);
        assert_eq!(serde_json::to_string(&AccessType::Online).unwrap(), "\"online\"");
    }
}
