//! Error types for Caixa

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether this error looks like a request timeout
    ///
    /// HTTP errors are checked structurally; anything else falls back to
    /// looking for the word "timeout" in the message.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Http(e) if e.is_timeout() => true,
            other => other.to_string().to_lowercase().contains("timeout"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
