//! Drive file metadata and the MIME types the organizer cares about.

#[cfg(feature = "http")]
use serde::Deserialize;

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const PDF_MIME: &str = "application/pdf";
pub const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";
pub const GOOGLE_SHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// One item in the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "http", derive(Deserialize))]
#[cfg_attr(feature = "http", serde(rename_all = "camelCase"))]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[cfg_attr(feature = "http", serde(default))]
    pub parents: Vec<String>,
}

impl DriveFile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
            parents: Vec::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }
}
