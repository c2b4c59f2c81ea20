//! Statement file reader
//!
//! CSV statements are decoded in place. Everything else goes through file
//! storage first: PDFs are handed to the LLM by URL, other formats are
//! fetched back and read as text.

use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::storage::FileStorage;

/// An uploaded statement
#[derive(Debug, Clone)]
pub struct StatementFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl StatementFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Lowercased extension, empty if the name has none
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default()
    }
}

/// What the extraction step receives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementContent {
    /// Statement text inlined into the prompt
    Text(String),
    /// Hosted file the LLM reads itself
    FileUrl(String),
}

/// Turn an uploaded file into extraction input
pub async fn read_statement(
    file: &StatementFile,
    storage: &dyn FileStorage,
) -> Result<StatementContent> {
    if file.bytes.is_empty() {
        return Err(Error::InvalidData(format!("{} is empty", file.file_name)));
    }

    let extension = file.extension();
    if extension == "csv" {
        let text = String::from_utf8(file.bytes.clone())
            .map_err(|_| Error::InvalidData(format!("{} is not valid UTF-8", file.file_name)))?;
        return Ok(StatementContent::Text(text));
    }

    let url = storage.upload(&file.bytes, &file.file_name).await?;
    debug!(file = %file.file_name, url = %url, "Statement uploaded");

    if extension == "pdf" {
        Ok(StatementContent::FileUrl(url))
    } else {
        Ok(StatementContent::Text(storage.fetch_text(&url).await?))
    }
}
