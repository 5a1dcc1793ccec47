//! Environment-supplied configuration.

use std::path::Path;

use url::Url;

use crate::error::{DriveError, Result};

pub const DEFAULT_AUTH_DOMAIN: &str = "royerm.eu.auth0.com";
pub const DEFAULT_CLIENT_ID: &str = "bVa2PDrmp8zmJ9tumzIrDa1lmgQ9IkxX";
pub const DEFAULT_CALLBACK_URI: &str = "https://unicorn.royerm.fr/";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";

pub const AUTH_DOMAIN_VAR: &str = "AUTH0_DOMAIN";
pub const CLIENT_ID_VAR: &str = "AUTH0_CLIENT_ID";
pub const CALLBACK_URI_VAR: &str = "AUTH0_CALLBACK_URI";
pub const API_BASE_URL_VAR: &str = "API_BASE_URL";

/// Identity provider and backend settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Identity provider domain, without scheme.
    pub auth_domain: String,
    pub client_id: String,
    /// Where the identity provider sends the user after login/logout.
    pub callback_uri: String,
    /// Backend base URL, never ending in `/`.
    pub api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_domain: DEFAULT_AUTH_DOMAIN.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            callback_uri: DEFAULT_CALLBACK_URI.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
        }
    }
}

impl Config {
    /// Load from the process environment, falling back to the defaults.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an explicit `.env` file, then the process environment.
    pub fn from_env_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        dotenv::from_path(path).map_err(|e| {
            DriveError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Config {
            auth_domain: get(AUTH_DOMAIN_VAR, DEFAULT_AUTH_DOMAIN),
            client_id: get(CLIENT_ID_VAR, DEFAULT_CLIENT_ID),
            callback_uri: get(CALLBACK_URI_VAR, DEFAULT_CALLBACK_URI),
            api_base_url: get(API_BASE_URL_VAR, DEFAULT_API_BASE_URL),
        }
        .validated()
    }

    /// Check URLs and normalise the backend base URL.
    pub fn validated(mut self) -> Result<Self> {
        Url::parse(&self.callback_uri).map_err(|e| {
            DriveError::ConfigError(format!("{}: {}", CALLBACK_URI_VAR, e))
        })?;

        let base = Url::parse(&self.api_base_url)
            .map_err(|e| DriveError::ConfigError(format!("{}: {}", API_BASE_URL_VAR, e)))?;
        if base.cannot_be_a_base() {
            return Err(DriveError::ConfigError(format!(
                "{}: not a base URL: {}",
                API_BASE_URL_VAR, self.api_base_url
            )));
        }
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();

        let domain = self.auth_domain.trim();
        let domain = domain
            .strip_prefix("https://")
            .or_else(|| domain.strip_prefix("http://"))
            .unwrap_or(domain)
            .trim_end_matches('/');
        if domain.is_empty() {
            return Err(DriveError::ConfigError(format!("{} is empty", AUTH_DOMAIN_VAR)));
        }
        self.auth_domain = domain.to_string();

        Ok(self)
    }

    /// Identity provider base URL.
    pub fn issuer_url(&self) -> String {
        format!("https://{}", self.auth_domain)
    }
}
