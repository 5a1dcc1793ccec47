//! Grouping of listed files by extension.

use indexmap::IndexMap;

use crate::models::DriveFile;

/// Files keyed by extension, in order of first occurrence of each extension.
pub type Grouping = IndexMap<String, Vec<DriveFile>>;

/// Group files by extension.
///
/// Files keep their relative order inside a group. Files without an
/// extension are dropped.
pub fn group_by_extension(files: impl IntoIterator<Item = DriveFile>) -> Grouping {
    let mut grouped = Grouping::new();

    for file in files {
        if let Some(ext) = file.extension() {
            let ext = ext.to_string();
            grouped.entry(ext).or_default().push(file);
        }
    }

    grouped
}
