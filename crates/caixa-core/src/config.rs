//! Import settings
//!
//! Loaded from an optional TOML file (`CAIXA_CONFIG`, or
//! ~/.local/share/caixa/config/caixa.toml), then overridden by environment
//! variables. Missing keys fall back to defaults.
//!
//! ```toml
//! [import]
//! batch_size = 50
//! timeout_secs = 120
//!
//! [storage]
//! upload_dir = "/var/lib/caixa/uploads"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable pointing at a config file
pub const CONFIG_ENV: &str = "CAIXA_CONFIG";

/// Environment variable overriding the upload directory
pub const UPLOAD_DIR_ENV: &str = "CAIXA_UPLOAD_DIR";

/// Transactions per categorization call
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// LLM request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct CaixaConfig {
    pub batch_size: usize,
    pub request_timeout: Duration,
    pub upload_dir: PathBuf,
}

impl Default for CaixaConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            request_timeout: DEFAULT_TIMEOUT,
            upload_dir: default_upload_dir(),
        }
    }
}

impl CaixaConfig {
    /// Load from the default locations and apply env overrides
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV)
            .ok()
            .map(PathBuf::from)
            .or_else(default_config_path);

        let mut config = match path {
            Some(ref p) if p.exists() => Self::from_file(p)?,
            _ => Self::default(),
        };

        if let Ok(dir) = std::env::var(UPLOAD_DIR_ENV) {
            if !dir.is_empty() {
                config.upload_dir = PathBuf::from(dir);
            }
        }

        debug!(
            batch_size = config.batch_size,
            timeout_secs = config.request_timeout.as_secs(),
            upload_dir = %config.upload_dir.display(),
            "Loaded config"
        );
        Ok(config)
    }

    /// Read settings from a TOML file (no env overrides)
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        parse_config(&content)
    }
}

/// Default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("caixa").join("config").join("caixa.toml"))
}

/// Default directory for uploaded statements
pub fn default_upload_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("caixa").join("uploads"))
        .unwrap_or_else(|| std::env::temp_dir().join("caixa-uploads"))
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    import: Option<RawImport>,
    storage: Option<RawStorage>,
}

#[derive(Debug, Deserialize)]
struct RawImport {
    batch_size: Option<usize>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawStorage {
    upload_dir: Option<PathBuf>,
}

fn parse_config(content: &str) -> Result<CaixaConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = CaixaConfig::default();

    if let Some(import) = raw.import {
        if let Some(size) = import.batch_size {
            if size == 0 {
                return Err(Error::Config("import.batch_size must be at least 1".into()));
            }
            config.batch_size = size;
        }
        if let Some(secs) = import.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
    }

    if let Some(dir) = raw.storage.and_then(|s| s.upload_dir) {
        config.upload_dir = dir;
    }

    Ok(config)
}
