//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `llm_from_env` - Shared utility to build the LLM client
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{bail, Context, Result};
use caixa_core::ai::{AIClient, LlmBackend};
use caixa_core::config::CaixaConfig;
use caixa_core::db::Database;
use tracing::{debug, warn};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Import settings, falling back to defaults when the config file is broken
pub fn load_settings() -> CaixaConfig {
    match CaixaConfig::load() {
        Ok(settings) => settings,
        Err(e) => {
            warn!(error = %e, "Invalid config file, using defaults");
            CaixaConfig::default()
        }
    }
}

/// Build the LLM client from the environment or explain how to configure one
pub fn llm_from_env() -> Result<AIClient> {
    let settings = load_settings();
    match AIClient::from_env_with_timeout(Some(settings.request_timeout)) {
        Some(client) => {
            debug!(host = client.host(), model = client.model(), "LLM backend configured");
            Ok(client)
        }
        None => bail!(
            "LLM backend not configured. Set OPENAI_COMPATIBLE_API_KEY (and optionally \
             OPENAI_COMPATIBLE_HOST / OPENAI_COMPATIBLE_MODEL)"
        ),
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let transactions = db.count_transactions(&Default::default())?;
    println!("   Tables ready ({} transactions)", transactions);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Import a statement: caixa import --file extrato.pdf --account Nubank");
    println!("  2. Start web UI: caixa serve");

    Ok(())
}
