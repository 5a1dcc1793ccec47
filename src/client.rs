//! Client for the backend REST API that wraps Google Drive.

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::SessionProvider;
use crate::error::{DriveError, Result};
use crate::models::{ApiErrorResponse, ConvertRequest, DownloadRequest, DriveFile};

const FILES_PATH: &str = "/drive/files";
const CONVERT_PATH: &str = "/drive/update-file-extension";
const DOWNLOAD_PATH: &str = "/drive/download";
const AUTH_PATH: &str = "/auth/google";

/// Client for the Drive backend.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    session: Arc<dyn SessionProvider>,
    http: Client,
}

impl BackendClient {
    /// Create a new BackendClient.
    ///
    /// # Arguments
    /// * `base_url` - Backend base URL, without trailing slash
    /// * `session` - Source of bearer tokens
    pub fn new(base_url: impl Into<String>, session: Arc<dyn SessionProvider>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            session,
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<dyn SessionProvider> {
        &self.session
    }

    /// Backend route that starts the Google OAuth flow.
    pub fn auth_url(&self) -> String {
        format!("{}{}", self.base_url, AUTH_PATH)
    }

    /// List the files visible to the authenticated user.
    ///
    /// A 401 becomes [`DriveError::Unauthorized`] carrying [`Self::auth_url`].
    pub async fn list_files(&self) -> Result<Vec<DriveFile>> {
        let token = self.session.access_token().await?;

        debug!(base = %self.base_url, "GET {}", FILES_PATH);
        let response = self
            .http
            .get(format!("{}{}", self.base_url, FILES_PATH))
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("listing rejected with 401");
            return Err(DriveError::Unauthorized {
                redirect: self.auth_url(),
            });
        }

        let files: Vec<DriveFile> = check_status(response).await?.json().await?;
        debug!(count = files.len(), "listing received");
        Ok(files)
    }

    /// Convert the given files to Markdown and return the updated listing.
    pub async fn convert_to_markdown(&self, file_ids: Vec<String>) -> Result<Vec<DriveFile>> {
        let body = ConvertRequest { file_ids };

        debug!(count = body.file_ids.len(), "POST {}", CONVERT_PATH);
        let response = self.post(CONVERT_PATH, &body).await.send().await?;

        let files: Vec<DriveFile> = check_status(response).await?.json().await?;
        Ok(files)
    }

    /// Ask the backend to download and process a single file.
    ///
    /// The response body is ignored.
    pub async fn request_download(&self, file_id: &str) -> Result<()> {
        let body = DownloadRequest {
            file_id: file_id.to_string(),
        };

        debug!(file_id, "POST {}", DOWNLOAD_PATH);
        let response = self.post(DOWNLOAD_PATH, &body).await.send().await?;

        check_status(response).await?;
        Ok(())
    }

    /// JSON POST, carrying the bearer token when one is available.
    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> RequestBuilder {
        let request = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body);

        match self.session.access_token().await {
            Ok(token) => request.bearer_auth(token),
            Err(e) => {
                debug!(error = %e, "sending {} without bearer token", path);
                request
            }
        }
    }
}

/// Turn a non-success response into [`DriveError::ApiError`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
        .map(|e| e.message)
        .unwrap_or(error_body);

    Err(DriveError::ApiError {
        status: status.as_u16(),
        message,
    })
}
