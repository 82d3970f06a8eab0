//! Category to folder-id resolution with a run-lifetime cache.
//!
//! The first lookup for a category does a remote find-or-create; later
//! lookups are served from memory. No eviction: the process handles one run.
//! Callers resolve one file at a time, so `&mut self` is the only guard the
//! find-or-create sequence needs.

use std::collections::HashMap;

use drivesort_core::Category;
use tracing::debug;

use crate::DriveError;
use crate::storage::Storage;

/// Resolves category folders directly under the storage root.
#[derive(Debug, Default)]
pub struct FolderResolver {
    cache: HashMap<Category, String>,
}

impl FolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn resolve(
        &mut self,
        storage: &dyn Storage,
        category: &Category,
    ) -> Result<String, DriveError> {
        if let Some(id) = self.cache.get(category) {
            return Ok(id.clone());
        }

        let id = storage
            .find_or_create_folder(category.as_str(), None)
            .await?;
        debug!(%category, folder_id = %id, "folder resolved");
        self.cache.insert(category.clone(), id.clone());
        Ok(id)
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
