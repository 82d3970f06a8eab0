//! The storage capability the organizer consumes.

use async_trait::async_trait;

use crate::{DriveError, DriveFile};

/// Remote file store with reparenting moves.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Every non-trashed item directly under the root.
    async fn list_files(&self) -> Result<Vec<DriveFile>, DriveError>;

    /// Id of the folder called `name` under `parent` (root when `None`),
    /// creating it if absent.
    async fn find_or_create_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<String, DriveError>;

    /// Reparent `file_id` so that `folder_id` is its only parent.
    async fn move_file(&self, file_id: &str, folder_id: &str) -> Result<(), DriveError>;

    /// Export a native document (Docs, Sheets) as `mime_type`.
    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, DriveError>;

    /// Raw bytes of a binary file.
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, DriveError>;
}
