//! Error types for the drive_md crate.

use thiserror::Error;

/// Errors that can occur when talking to the identity provider or the backend.
#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// The backend rejected the session; the user must go through `redirect`.
    #[error("Unauthorized, redirect to {redirect}")]
    Unauthorized { redirect: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid link or ID: {0}")]
    InvalidLinkOrId(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Glob pattern error: {0}")]
    GlobPatternError(#[from] glob::PatternError),

    #[error("JWT decoding error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Token refresh failed: {0}")]
    TokenRefreshError(String),
}

/// Result type alias for DriveError.
pub type Result<T> = std::result::Result<T, DriveError>;
