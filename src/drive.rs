//! Google Drive storage collaborator: listing folders, photo uploads, search
//! and deletion against the Drive v3 REST API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info, warn};

const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Folder metadata as the delete flow needs it: name plus parent links.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FolderMeta {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

/// Contract for the remote file storage.
#[async_trait]
pub trait DriveStorage: Send + Sync {
    /// Create a folder under `parent_id` and return its id.
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String>;

    /// Grant public read access to a folder.
    async fn set_public_read(&self, folder_id: &str) -> Result<()>;

    /// Upload every regular file in `local_dir` into `folder_id`, returning
    /// one shareable link per uploaded file.
    async fn upload_all(&self, local_dir: &Path, folder_id: &str) -> Result<Vec<String>>;

    /// Find folders whose name contains `keyword`.
    async fn search_folders(&self, keyword: &str) -> Result<Vec<FolderMeta>>;

    /// Fetch a single folder's metadata.
    async fn folder_metadata(&self, folder_id: &str) -> Result<FolderMeta>;

    /// Delete a folder by id. Reports the outcome instead of erroring so the
    /// deletion orchestrator can aggregate it with the database side.
    async fn delete_folder(&self, folder_id: &str) -> (bool, String);
}

/// Drive v3 REST client.
pub struct GoogleDrive {
    client: reqwest::Client,
    access_token: String,
}

#[derive(Deserialize)]
struct FileResource {
    id: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<FolderMeta>,
}

impl GoogleDrive {
    /// Create from config values.
    pub fn from_config(access_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token,
        }
    }

    async fn create_file_entry(&self, name: &str, parent_id: &str) -> Result<String> {
        let body = json!({
            "name": name,
            "parents": [parent_id],
        });
        let resp = self
            .client
            .post(format!("{DRIVE_BASE_URL}/files?fields=id"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("drive file create request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(anyhow!("drive file create returned {status}"));
        }
        let file: FileResource = resp
            .json()
            .await
            .context("drive file create: failed to decode response")?;
        Ok(file.id)
    }

    async fn upload_content(&self, file_id: &str, bytes: Vec<u8>) -> Result<()> {
        let resp = self
            .client
            .patch(format!(
                "{DRIVE_UPLOAD_URL}/files/{file_id}?uploadType=media"
            ))
            .bearer_auth(&self.access_token)
            .body(bytes)
            .send()
            .await
            .context("drive content upload request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(anyhow!("drive content upload returned {status}"));
        }
        Ok(())
    }
}

#[async_trait]
impl DriveStorage for GoogleDrive {
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        let body = json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
            "parents": [parent_id],
        });
        let resp = self
            .client
            .post(format!("{DRIVE_BASE_URL}/files?fields=id"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("drive folder create request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(anyhow!("drive folder create returned {status}"));
        }
        let folder: FileResource = resp
            .json()
            .await
            .context("drive folder create: failed to decode response")?;
        info!(folder_id = %folder.id, name = %name, "drive folder created");
        Ok(folder.id)
    }

    async fn set_public_read(&self, folder_id: &str) -> Result<()> {
        let body = json!({
            "type": "anyone",
            "role": "reader",
        });
        let resp = self
            .client
            .post(format!("{DRIVE_BASE_URL}/files/{folder_id}/permissions"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("drive permission request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(anyhow!("drive permission create returned {status}"));
        }
        Ok(())
    }

    async fn upload_all(&self, local_dir: &Path, folder_id: &str) -> Result<Vec<String>> {
        let mut entries: Vec<_> = std::fs::read_dir(local_dir)
            .with_context(|| format!("failed to read staging dir {}", local_dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        entries.sort();

        let mut links = Vec::with_capacity(entries.len());
        for path in entries {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("photo")
                .to_string();
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read staged file {}", path.display()))?;

            let file_id = self.create_file_entry(&file_name, folder_id).await?;
            self.upload_content(&file_id, bytes).await?;
            debug!(file = %file_name, file_id = %file_id, "photo uploaded");
            links.push(format!("https://drive.google.com/file/d/{file_id}/view"));
        }
        Ok(links)
    }

    async fn search_folders(&self, keyword: &str) -> Result<Vec<FolderMeta>> {
        let escaped = keyword.replace('\\', "\\\\").replace('\'', "\\'");
        let query = format!(
            "name contains '{escaped}' and mimeType = '{FOLDER_MIME_TYPE}' and trashed = false"
        );
        let resp = self
            .client
            .get(format!("{DRIVE_BASE_URL}/files"))
            .query(&[("q", query.as_str()), ("fields", "files(id,name,parents)")])
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("drive search request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(anyhow!("drive search returned {status}"));
        }
        let list: FileList = resp
            .json()
            .await
            .context("drive search: failed to decode response")?;
        Ok(list.files)
    }

    async fn folder_metadata(&self, folder_id: &str) -> Result<FolderMeta> {
        let resp = self
            .client
            .get(format!("{DRIVE_BASE_URL}/files/{folder_id}"))
            .query(&[("fields", "id,name,parents")])
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("drive metadata request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(anyhow!("drive metadata returned {status}"));
        }
        resp.json()
            .await
            .context("drive metadata: failed to decode response")
    }

    async fn delete_folder(&self, folder_id: &str) -> (bool, String) {
        let result = self
            .client
            .delete(format!("{DRIVE_BASE_URL}/files/{folder_id}"))
            .bearer_auth(&self.access_token)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                info!(folder_id = %folder_id, "drive folder deleted");
                (true, "deleted".to_string())
            }
            Ok(resp) => {
                let status = resp.status();
                warn!(folder_id = %folder_id, status = %status, "drive folder delete rejected");
                (false, format!("delete returned {status}"))
            }
            Err(e) => {
                warn!(folder_id = %folder_id, error = %e, "drive folder delete failed");
                (false, format!("delete request failed: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_meta_parses_without_parents() {
        let meta: FolderMeta =
            serde_json::from_str(r#"{"id":"abc123","name":"Listings"}"#).unwrap();
        assert_eq!(meta.id, "abc123");
        assert!(meta.parents.is_empty());
    }

    #[test]
    fn test_file_list_parses() {
        let list: FileList = serde_json::from_str(
            r#"{"files":[{"id":"f1","name":"Acme Heights-Elm St-3 + 1 #LISTABOT","parents":["root1"]}]}"#,
        )
        .unwrap();
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].parents, vec!["root1".to_string()]);
    }
}
