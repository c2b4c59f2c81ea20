//! Uploaded file storage
//!
//! Statements that are not plain CSV are stored first and then referenced by
//! URL, either handed to the LLM (PDF) or fetched back as text. The local
//! implementation writes to a directory and hands out `file://` URLs; files
//! are named by SHA-256 of their content so re-uploads are idempotent.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};

/// Stores uploaded bytes and resolves their URLs
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store a file and return a URL that later resolves to it
    async fn upload(&self, bytes: &[u8], file_name: &str) -> Result<String>;

    /// Fetch a previously uploaded file as UTF-8 text
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Directory-backed storage issuing `file://` URLs
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    http_client: reqwest::Client,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn upload(&self, bytes: &[u8], file_name: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.root).await?;

        let hash = hex::encode(Sha256::digest(bytes));
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_else(|| "bin".to_string());
        let path = self.root.join(format!("{}.{}", &hash[..16], extension));

        tokio::fs::write(&path, bytes).await?;
        let absolute = tokio::fs::canonicalize(&path).await?;
        debug!(path = %absolute.display(), size = bytes.len(), "Stored upload");

        Ok(format!("file://{}", absolute.display()))
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = read_file_url(&self.http_client, url).await?;
        String::from_utf8(bytes)
            .map_err(|_| Error::Storage(format!("File is not valid UTF-8 text: {}", url)))
    }
}

/// Read the bytes behind a `file://` or `http(s)://` URL
pub async fn read_file_url(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    if let Some(path) = url.strip_prefix("file://") {
        return tokio::fs::read(path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to read {}: {}", path, e)));
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        let response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Storage(format!(
                "Fetching {} failed with status {}",
                url,
                response.status()
            )));
        }
        return Ok(response.bytes().await?.to_vec());
    }

    Err(Error::Storage(format!("Unsupported file URL: {}", url)))
}
