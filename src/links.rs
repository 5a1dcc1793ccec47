//! Resolution of Drive file IDs from the links the backend hands out.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{DriveError, Result};

/// `webViewLink` style: `/file/d/<ID>/view`.
static VIEW_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://drive\.google\.com/file/d/([a-zA-Z0-9_-]+)")
        .expect("Invalid view link regex")
});

/// `webContentLink` and legacy open links: `/uc?id=<ID>` or `/open?id=<ID>`.
static QUERY_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://drive\.google\.com/(?:uc|open)\?(?:[^#]*&)?id=([a-zA-Z0-9_-]+)")
        .expect("Invalid query link regex")
});

/// Editor links: `docs.google.com/<kind>/d/<ID>/edit`.
static EDITOR_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://docs\.google\.com/(?:document|spreadsheets|presentation)/d/([a-zA-Z0-9_-]+)",
    )
    .expect("Invalid editor link regex")
});

static ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Invalid ID regex"));

/// Resolve a file ID from a Drive link or validate a raw ID.
///
/// ```
/// use drive_md::links::file_id_from_link;
///
/// let id = file_id_from_link("https://drive.google.com/uc?id=1abc&export=download").unwrap();
/// assert_eq!(id, "1abc");
///
/// let id = file_id_from_link("1abc").unwrap();
/// assert_eq!(id, "1abc");
/// ```
pub fn file_id_from_link(link_or_id: &str) -> Result<String> {
    let trimmed = link_or_id.trim();

    [&*VIEW_LINK_REGEX, &*QUERY_LINK_REGEX, &*EDITOR_LINK_REGEX]
        .iter()
        .find_map(|re| re.captures(trimmed))
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
        .or_else(|| ID_REGEX.is_match(trimmed).then(|| trimmed.to_string()))
        .ok_or_else(|| DriveError::InvalidLinkOrId(link_or_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_link() {
        let link = "https://drive.google.com/file/d/1abc123XYZ/view?usp=drivesdk";
        assert_eq!(file_id_from_link(link).unwrap(), "1abc123XYZ");
    }

    #[test]
    fn test_content_link() {
        let link = "https://drive.google.com/uc?id=1abc123XYZ&export=download";
        assert_eq!(file_id_from_link(link).unwrap(), "1abc123XYZ");

        let link = "https://drive.google.com/uc?export=download&id=1abc123XYZ";
        assert_eq!(file_id_from_link(link).unwrap(), "1abc123XYZ");
    }

    #[test]
    fn test_editor_link() {
        let link = "https://docs.google.com/document/d/1abc-_XYZ/edit";
        assert_eq!(file_id_from_link(link).unwrap(), "1abc-_XYZ");
    }

    #[test]
    fn test_raw_id_with_whitespace() {
        assert_eq!(file_id_from_link("  abc-123_XYZ ").unwrap(), "abc-123_XYZ");
    }

    #[test]
    fn test_rejects_unknown() {
        assert!(file_id_from_link("https://example.com/file/d/123").is_err());
        assert!(file_id_from_link("").is_err());
        assert!(file_id_from_link("   ").is_err());
        assert!(file_id_from_link("a.txt").is_err());
    }
}
