//! Data models for the backend REST API.

use serde::{Deserialize, Serialize};

/// One file as returned by the backend listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub web_view_link: String,
    #[serde(default)]
    pub web_content_link: String,
}

impl DriveFile {
    /// The substring after the final `.` in the name, case preserved.
    ///
    /// Returns `None` when the name has no dot or ends with one.
    pub fn extension(&self) -> Option<&str> {
        match self.name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => Some(ext),
            _ => None,
        }
    }
}

impl std::fmt::Display for DriveFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}", self.id, self.name)
    }
}

/// Body of `POST /drive/update-file-extension`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub file_ids: Vec<String>,
}

/// Body of `POST /drive/download`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    pub file_id: String,
}

/// Error body the backend may send with a non-success status.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(alias = "error")]
    pub message: String,
}

/// OAuth2 token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> DriveFile {
        DriveFile {
            id: "id".to_string(),
            name: name.to_string(),
            web_view_link: String::new(),
            web_content_link: String::new(),
        }
    }

    #[test]
    fn test_extension() {
        assert_eq!(file("notes.txt").extension(), Some("txt"));
        assert_eq!(file("archive.tar.gz").extension(), Some("gz"));
        assert_eq!(file("README.MD").extension(), Some("MD"));
        assert_eq!(file(".bashrc").extension(), Some("bashrc"));
        assert_eq!(file("Makefile").extension(), None);
        assert_eq!(file("trailing.").extension(), None);
    }

    #[test]
    fn test_drive_file_deserialize() {
        let json = r#"{
            "id": "abc123",
            "name": "test.txt",
            "webViewLink": "https://drive.google.com/file/d/abc123/view",
            "webContentLink": "https://drive.google.com/uc?id=abc123&export=download"
        }"#;

        let file: DriveFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, "abc123");
        assert_eq!(file.name, "test.txt");
        assert_eq!(
            file.web_content_link,
            "https://drive.google.com/uc?id=abc123&export=download"
        );
    }

    #[test]
    fn test_drive_file_missing_links() {
        let file: DriveFile = serde_json::from_str(r#"{"id": "1", "name": "c"}"#).unwrap();
        assert!(file.web_view_link.is_empty());
        assert!(file.web_content_link.is_empty());
    }

    #[test]
    fn test_request_bodies_are_camel_case() {
        let convert = ConvertRequest {
            file_ids: vec!["1".to_string(), "2".to_string()],
        };
        assert_eq!(
            serde_json::to_string(&convert).unwrap(),
            r#"{"fileIds":["1","2"]}"#
        );

        let download = DownloadRequest {
            file_id: "1".to_string(),
        };
        assert_eq!(serde_json::to_string(&download).unwrap(), r#"{"fileId":"1"}"#);
    }

    #[test]
    fn test_api_error_accepts_either_key() {
        let a: ApiErrorResponse = serde_json::from_str(r#"{"message": "boom"}"#).unwrap();
        let b: ApiErrorResponse = serde_json::from_str(r#"{"error": "boom"}"#).unwrap();
        assert_eq!(a.message, "boom");
        assert_eq!(b.message, "boom");
    }
}
