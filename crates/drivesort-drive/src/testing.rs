//! In-memory storage for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::storage::Storage;
use crate::{DriveError, DriveFile};

#[derive(Default)]
pub struct MockStorage {
    pub files: Vec<DriveFile>,
    /// Bytes returned by export and download, keyed by file id.
    pub contents: HashMap<String, Vec<u8>>,
    pub fail_moves: bool,
    pub fail_folders: bool,
    pub exports: Mutex<Vec<(String, String)>>,
    pub(crate) folder_calls: AtomicUsize,
    pub(crate) move_calls: AtomicUsize,
    pub(crate) download_calls: AtomicUsize,
}

impl MockStorage {
    pub fn with_files(files: Vec<DriveFile>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    pub fn folder_calls(&self) -> usize {
        self.folder_calls.load(Ordering::SeqCst)
    }

    pub fn move_calls(&self) -> usize {
        self.move_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    fn content(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        self.contents
            .get(file_id)
            .cloned()
            .ok_or_else(|| DriveError::Server {
                status: 404,
                body: format!("file {file_id} not found"),
            })
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn list_files(&self) -> Result<Vec<DriveFile>, DriveError> {
        Ok(self.files.clone())
    }

    async fn find_or_create_folder(
        &self,
        name: &str,
        _parent: Option<&str>,
    ) -> Result<String, DriveError> {
        self.folder_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_folders {
            return Err(DriveError::Server {
                status: 403,
                body: "insufficient permissions".into(),
            });
        }
        Ok(format!("folder-{name}"))
    }

    async fn move_file(&self, _file_id: &str, _folder_id: &str) -> Result<(), DriveError> {
        self.move_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_moves {
            return Err(DriveError::Server {
                status: 500,
                body: "backend error".into(),
            });
        }
        Ok(())
    }

    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, DriveError> {
        self.exports
            .lock()
            .unwrap()
            .push((file_id.to_string(), mime_type.to_string()));
        self.content(file_id)
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        self.content(file_id)
    }
}
