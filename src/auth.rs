//! Session providers supplying bearer tokens for the backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{decode, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::error::{DriveError, Result};
use crate::models::TokenResponse;

/// Refresh this long before the cached token expires.
const EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Assumed lifetime when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// Source of access tokens and authentication state.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Get a valid access token, refreshing silently if needed.
    async fn access_token(&self) -> Result<String>;

    fn is_authenticated(&self) -> bool;

    /// Terminate the session.
    async fn logout(&self) -> Result<()>;
}

/// Cached access token with expiration.
#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: SystemTime,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        self.expires_at > SystemTime::now() + EXPIRY_BUFFER
    }
}

/// OIDC session backed by a refresh token.
#[derive(Clone)]
pub struct OidcSession {
    config: Arc<Config>,
    token_url: String,
    client: Client,
    refresh_token: Arc<RwLock<Option<String>>>,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
}

impl OidcSession {
    pub fn new(config: Config, refresh_token: String) -> Self {
        let token_url = format!("{}/oauth/token", config.issuer_url());
        Self {
            config: Arc::new(config),
            token_url,
            client: Client::new(),
            refresh_token: Arc::new(RwLock::new(Some(refresh_token))),
            cached_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Use a different token endpoint.
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    pub fn logout_url(&self) -> Result<String> {
        logout_url(&self.config)
    }

    /// Exchange the refresh token for a new access token.
    async fn refresh(&self) -> Result<CachedToken> {
        let refresh_token = self
            .refresh_token
            .read()
            .await
            .clone()
            .ok_or_else(|| DriveError::AuthenticationError("not logged in".to_string()))?;

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];

        debug!(url = %self.token_url, "refreshing access token");
        let response = self.client.post(&self.token_url).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "token refresh rejected");
            return Err(DriveError::TokenRefreshError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response.json().await?;

        if let Some(rotated) = token_response.refresh_token {
            *self.refresh_token.write().await = Some(rotated);
        }

        let lifetime = token_response
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);

        Ok(CachedToken {
            access_token: token_response.access_token,
            expires_at: SystemTime::now() + lifetime,
        })
    }
}

#[async_trait]
impl SessionProvider for OidcSession {
    async fn access_token(&self) -> Result<String> {
        {
            let cached = self.cached_token.read().await;
            if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
                return Ok(token.access_token.clone());
            }
        }

        // Held across the refresh so concurrent callers never reuse a rotated refresh token
        let mut cached = self.cached_token.write().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.access_token.clone());
        }

        let new_token = self.refresh().await?;
        let access_token = new_token.access_token.clone();
        *cached = Some(new_token);

        Ok(access_token)
    }

    fn is_authenticated(&self) -> bool {
        // try_read fails only while a refresh is writing, which implies a session
        match self.refresh_token.try_read() {
            Ok(token) => token.is_some(),
            Err(_) => true,
        }
    }

    async fn logout(&self) -> Result<()> {
        *self.refresh_token.write().await = None;
        *self.cached_token.write().await = None;
        info!("session terminated");
        Ok(())
    }
}

/// Identity provider logout URL returning to the callback URI.
pub fn logout_url(config: &Config) -> Result<String> {
    let mut url = Url::parse(&format!("{}/v2/logout", config.issuer_url()))
        .map_err(|e| DriveError::ConfigError(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("returnTo", &config.callback_uri);
    Ok(url.to_string())
}

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    exp: u64,
}

/// Read the `exp` claim of a JWT without verifying its signature.
pub fn token_expiry(token: &str) -> Result<SystemTime> {
    let header = jsonwebtoken::decode_header(token)?;
    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(UNIX_EPOCH + Duration::from_secs(data.claims.exp))
}

/// Session around a pre-issued bearer token.
///
/// Opaque tokens never expire from the client's point of view; JWTs
/// expire at their `exp` claim.
pub struct StaticTokenSession {
    token: String,
    expires_at: Option<SystemTime>,
    active: AtomicBool,
}

impl StaticTokenSession {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let expires_at = token_expiry(&token).ok();
        Self {
            token,
            expires_at,
            active: AtomicBool::new(true),
        }
    }

    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| exp <= SystemTime::now())
    }
}

#[async_trait]
impl SessionProvider for StaticTokenSession {
    async fn access_token(&self) -> Result<String> {
        if !self.active.load(Ordering::SeqCst) {
            return Err(DriveError::AuthenticationError("not logged in".to_string()));
        }
        if self.is_expired() {
            return Err(DriveError::AuthenticationError(
                "access token expired".to_string(),
            ));
        }
        Ok(self.token.clone())
    }

    fn is_authenticated(&self) -> bool {
        self.active.load(Ordering::SeqCst) && !self.is_expired()
    }

    async fn logout(&self) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: u64,
    }

    fn jwt(exp: u64) -> String {
        let claims = Claims {
            sub: "user".to_string(),
            exp,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"secret")).unwrap()
    }

    fn now_secs() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
    }

    #[test]
    fn test_token_expiry_reads_exp() {
        let exp = now_secs() + 600;
        let expiry = token_expiry(&jwt(exp)).unwrap();
        assert_eq!(expiry, UNIX_EPOCH + Duration::from_secs(exp));
    }

    #[test]
    fn test_token_expiry_reads_rs256_exp() {
        // {"alg":"RS256","typ":"JWT"}.{"sub":"user","exp":4102444800}.<unverified signature>
        let token = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.\
                     eyJzdWIiOiJ1c2VyIiwiZXhwIjo0MTAyNDQ0ODAwfQ.\
                     c2lnbmF0dXJl";
        let expected = UNIX_EPOCH + Duration::from_secs(4_102_444_800);

        assert_eq!(token_expiry(token).unwrap(), expected);
        assert_eq!(StaticTokenSession::new(token).expires_at(), Some(expected));
    }

    #[test]
    fn test_token_expiry_rejects_opaque_token() {
        assert!(token_expiry("opaque-token").is_err());
    }

    #[tokio::test]
    async fn test_static_opaque_token() {
        let session = StaticTokenSession::new("opaque-token");
        assert!(session.expires_at().is_none());
        assert!(session.is_authenticated());
        assert_eq!(session.access_token().await.unwrap(), "opaque-token");
    }

    #[tokio::test]
    async fn test_static_expired_jwt() {
        let session = StaticTokenSession::new(jwt(now_secs() - 10));
        assert!(!session.is_authenticated());
        assert!(matches!(
            session.access_token().await,
            Err(DriveError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_static_logout() {
        let session = StaticTokenSession::new(jwt(now_secs() + 600));
        assert!(session.is_authenticated());

        session.logout().await.unwrap();
        assert!(!session.is_authenticated());
        assert!(session.access_token().await.is_err());
    }

    #[test]
    fn test_logout_url() {
        let session = OidcSession::new(Config::default(), "refresh".to_string());
        let url = session.logout_url().unwrap();
        assert!(url.starts_with("https://royerm.eu.auth0.com/v2/logout?"));
        assert!(url.contains("client_id=bVa2PDrmp8zmJ9tumzIrDa1lmgQ9IkxX"));
        assert!(url.contains("returnTo=https%3A%2F%2Funicorn.royerm.fr%2F"));
    }

    #[tokio::test]
    async fn test_oidc_logout_clears_session() {
        let session = OidcSession::new(Config::default(), "refresh".to_string());
        assert!(session.is_authenticated());

        session.logout().await.unwrap();
        assert!(!session.is_authenticated());
        assert!(matches!(
            session.access_token().await,
            Err(DriveError::AuthenticationError(_))
        ));
    }
}
