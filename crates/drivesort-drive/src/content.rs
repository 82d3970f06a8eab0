//! Getting classifiable text out of a stored file.
//!
//! Acquisition is best-effort: any failure is logged and yields an empty
//! string, and classification proceeds on the file name alone.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::storage::Storage;
use crate::types::{GOOGLE_DOC_MIME, GOOGLE_SHEET_MIME, PDF_MIME};
use crate::{DriveError, DriveFile};

/// How content is obtained for a given MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Download, then extract text.
    Pdf,
    /// Export as `text/plain`.
    GoogleDoc,
    /// Export as `text/csv`.
    GoogleSheet,
    /// No extraction; file name only.
    Unsupported,
}

impl ContentKind {
    pub fn from_mime(mime_type: &str) -> Self {
        match mime_type {
            PDF_MIME => Self::Pdf,
            GOOGLE_DOC_MIME => Self::GoogleDoc,
            GOOGLE_SHEET_MIME => Self::GoogleSheet,
            _ => Self::Unsupported,
        }
    }

    pub fn export_mime(self) -> Option<&'static str> {
        match self {
            Self::GoogleDoc => Some("text/plain"),
            Self::GoogleSheet => Some("text/csv"),
            Self::Pdf | Self::Unsupported => None,
        }
    }
}

/// Text of a PDF, or empty if it cannot be parsed.
///
/// The PDF parser can panic on malformed fonts; that is contained here.
pub fn extract_pdf_text(bytes: &[u8]) -> String {
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            warn!(error = %e, "PDF text extraction failed");
            String::new()
        }
        Err(_) => {
            warn!("PDF text extraction panicked; treating as empty");
            String::new()
        }
    }
}

/// UTF-8 text, or empty if the bytes are not valid UTF-8.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(e) => {
            debug!(error = %e, "content is not valid UTF-8");
            String::new()
        }
    }
}

async fn fetch(
    storage: &dyn Storage,
    file: &DriveFile,
    kind: ContentKind,
) -> Result<String, DriveError> {
    match (kind, kind.export_mime()) {
        (ContentKind::Pdf, _) => {
            info!(file = %file.name, "downloading and extracting PDF text");
            let bytes = storage.download_file(&file.id).await?;
            Ok(extract_pdf_text(&bytes))
        }
        (_, Some(mime)) => {
            info!(file = %file.name, export = mime, "exporting document content");
            let bytes = storage.export_file(&file.id, mime).await?;
            Ok(decode_text(&bytes))
        }
        (_, None) => {
            info!(
                file = %file.name,
                mime = %file.mime_type,
                "unsupported type; using file name only"
            );
            Ok(String::new())
        }
    }
}

/// Best-effort text for `file`. Never fails.
pub async fn acquire_text(storage: &dyn Storage, file: &DriveFile) -> String {
    let kind = ContentKind::from_mime(&file.mime_type);
    match fetch(storage, file, kind).await {
        Ok(text) => text,
        Err(e) => {
            warn!(file = %file.name, error = %e, "cannot fetch content; classifying on name only");
            String::new()
        }
    }
}

/// Text of a local file: PDFs by extension, anything else decoded as UTF-8.
pub fn read_local_text(path: &Path) -> Result<String, DriveError> {
    let bytes = std::fs::read(path).map_err(|e| DriveError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    Ok(if is_pdf {
        extract_pdf_text(&bytes)
    } else {
        decode_text(&bytes)
    })
}
