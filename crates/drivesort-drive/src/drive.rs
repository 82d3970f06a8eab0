//! Google Drive v3 REST client.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::storage::Storage;
use crate::token::TokenStore;
use crate::types::FOLDER_MIME;
use crate::{DriveError, DriveFile};

pub const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";

const LIST_PAGE_SIZE: u32 = 100;
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, parents)";
const ROOT_QUERY: &str = "'root' in parents and trashed=false";

/// Drive client authorized with a saved user token.
pub struct GoogleDrive {
    client: reqwest::Client,
    base_url: String,
    tokens: Mutex<TokenStore>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct FileId {
    id: String,
}

#[derive(Deserialize)]
struct FileParents {
    #[serde(default)]
    parents: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewFolder<'a> {
    name: &'a str,
    mime_type: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parents: Vec<&'a str>,
}

/// Quote `value` as a Drive query string literal.
pub fn quote_query(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn folder_query(name: &str, parent: Option<&str>) -> String {
    let mut q = format!(
        "mimeType={} and name={} and trashed=false",
        quote_query(FOLDER_MIME),
        quote_query(name)
    );
    if let Some(parent) = parent {
        q.push_str(&format!(" and {} in parents", quote_query(parent)));
    }
    q
}

impl GoogleDrive {
    /// Open the token file at `credentials` and build a client whose every
    /// request is bounded by `timeout`.
    pub fn connect(credentials: impl Into<PathBuf>, timeout: Duration) -> Result<Self, DriveError> {
        let tokens = TokenStore::open(credentials)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: DRIVE_API_URL.to_string(),
            tokens: Mutex::new(tokens),
        })
    }

    async fn token(&self) -> Result<String, DriveError> {
        self.tokens.lock().await.access_token(&self.client).await
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, DriveError> {
        let resp = req.bearer_auth(self.token().await?).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DriveError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.base_url, file_id)
    }
}

#[async_trait]
impl Storage for GoogleDrive {
    async fn list_files(&self) -> Result<Vec<DriveFile>, DriveError> {
        let url = format!("{}/files", self.base_url);
        let page_size = LIST_PAGE_SIZE.to_string();
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        info!("listing files in Drive root");
        loop {
            let mut query = vec![
                ("q", ROOT_QUERY),
                ("fields", LIST_FIELDS),
                ("pageSize", page_size.as_str()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.as_str()));
            }

            let page: FileList = self
                .send(self.client.get(&url).query(&query))
                .await?
                .json()
                .await?;
            debug!(count = page.files.len(), "received file page");
            files.extend(page.files);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(count = files.len(), "listed Drive root");
        Ok(files)
    }

    async fn find_or_create_folder(
        &self,
        name: &str,
        parent: Option<&str>,
    ) -> Result<String, DriveError> {
        let url = format!("{}/files", self.base_url);
        let q = folder_query(name, parent);

        let existing: FileList = self
            .send(self.client.get(&url).query(&[("q", q.as_str()), ("fields", "files(id)")]))
            .await?
            .json()
            .await?;
        if let Some(folder) = existing.files.into_iter().next() {
            debug!(folder = name, id = %folder.id, "found existing folder");
            return Ok(folder.id);
        }

        let body = NewFolder {
            name,
            mime_type: FOLDER_MIME,
            parents: parent.into_iter().collect(),
        };
        let created: FileId = self
            .send(self.client.post(&url).query(&[("fields", "id")]).json(&body))
            .await?
            .json()
            .await?;
        info!(folder = name, id = %created.id, "created folder");
        Ok(created.id)
    }

    async fn move_file(&self, file_id: &str, folder_id: &str) -> Result<(), DriveError> {
        let url = self.file_url(file_id);

        let current: FileParents = self
            .send(self.client.get(&url).query(&[("fields", "parents")]))
            .await?
            .json()
            .await?;
        let previous = current.parents.join(",");

        self.send(
            self.client
                .patch(&url)
                .query(&[
                    ("addParents", folder_id),
                    ("removeParents", previous.as_str()),
                    ("fields", "id, parents"),
                ])
                .json(&serde_json::json!({})),
        )
        .await?;
        debug!(file_id, folder_id, removed = %previous, "file reparented");
        Ok(())
    }

    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, DriveError> {
        let url = format!("{}/export", self.file_url(file_id));
        let resp = self
            .send(self.client.get(&url).query(&[("mimeType", mime_type)]))
            .await?;
        Ok(resp.bytes().await?.to_vec())
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>, DriveError> {
        let url = self.file_url(file_id);
        let resp = self
            .send(self.client.get(&url).query(&[("alt", "media")]))
            .await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_query_escapes_quotes_and_backslashes() {
        assert_eq!(quote_query("Finance"), "'Finance'");
        assert_eq!(quote_query("Bob's Files"), r"'Bob\'s Files'");
        assert_eq!(quote_query(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn folder_query_without_parent() {
        assert_eq!(
            folder_query("HR", None),
            "mimeType='application/vnd.google-apps.folder' and name='HR' and trashed=false"
        );
    }

    #[test]
    fn folder_query_with_parent() {
        let q = folder_query("HR", Some("0Aparent"));
        assert!(q.ends_with(" and '0Aparent' in parents"));
    }

    #[test]
    fn new_folder_body_omits_empty_parents() {
        let body = NewFolder {
            name: "Finance",
            mime_type: FOLDER_MIME,
            parents: vec![],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["mimeType"], FOLDER_MIME);
        assert!(json.get("parents").is_none());
    }

    #[test]
    fn file_list_page_decodes() {
        let json = r#"{
            "nextPageToken": "tok2",
            "files": [
                {"id": "a", "name": "invoice.pdf", "mimeType": "application/pdf", "parents": ["root0"]},
                {"id": "b", "name": "Finance", "mimeType": "application/vnd.google-apps.folder"}
            ]
        }"#;
        let page: FileList = serde_json::from_str(json).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("tok2"));
        assert_eq!(page.files.len(), 2);
        assert!(page.files[1].is_folder());
    }

    #[test]
    fn last_page_has_no_token() {
        let page: FileList = serde_json::from_str(r#"{"files": []}"#).unwrap();
        assert!(page.next_page_token.is_none());
        assert!(page.files.is_empty());
    }

    #[test]
    fn connect_without_token_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = GoogleDrive::connect(dir.path().join("token.json"), Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, DriveError::MissingCredentials(_)));
    }
}
