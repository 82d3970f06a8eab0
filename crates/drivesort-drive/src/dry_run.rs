//! Dry-run wrapper: reads pass through, moves are logged and recorded but
//! never sent.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::storage::Storage;
use crate::{DriveError, DriveFile};

/// A move that would have happened. Each one is also logged at info level
/// as `[DRY RUN] would move file` with both ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub file_id: String,
    pub folder_id: String,
}

pub struct DryRunStorage<S> {
    inner: S,
    planned: Mutex<Vec<PlannedMove>>,
}

impl<S: Storage> DryRunStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            planned: Mutex::new(Vec::new()),
        }
    }

    /// Moves suppressed so far, in call order.
    pub fn planned_moves(&self) -> Vec<PlannedMove> {
        self.planned
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl<S: Storage> Storage for DryRunStorage<S> {
    async fn list_files(&self) -> Result<Vec<DriveFile>, DriveError> {
        self.inner.list_files().await
    }

    // Folder creation is not suppressed: resolving a target needs a real id.
    async fn find_or_create_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<String, DriveError> {
        self.inner.find_or_create_folder(name, parent).await
    }

    async fn move_file(&self, file_id: &str, folder_id: &str) -> Result<(), DriveError> {
        info!(file_id, folder_id, "[DRY RUN] would move file");
        let planned = PlannedMove {
            file_id: file_id.to_string(),
            folder_id: folder_id.to_string(),
        };
        match self.planned.lock() {
            Ok(mut p) => p.push(planned),
            Err(poisoned) => poisoned.into_inner().push(planned),
        }
        Ok(())
    }

    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, DriveError> {
        self.inner.export_file(file_id, mime_type).await
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        self.inner.download_file(file_id).await
    }
}
