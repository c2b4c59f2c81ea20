//! Status command implementation

use std::path::Path;

use anyhow::Result;
use caixa_core::ai::{AIClient, LlmBackend};
use caixa_core::db::DB_KEY_ENV;

use super::{format_brl, load_settings, open_db};

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!();
    println!("📊 Caixa Status");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Database: {}", db_path.display());

    match std::fs::metadata(db_path) {
        Ok(meta) => println!("   Size: {:.1} KB", meta.len() as f64 / 1024.0),
        Err(_) => println!("   Size: (run 'caixa init' first)"),
    }

    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    match (no_encrypt, has_key) {
        (true, _) => println!("   ⚠️  Encryption: DISABLED (--no-encrypt)"),
        (false, true) => println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV),
        (false, false) => println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV),
    }

    let settings = load_settings();
    println!("   Uploads: {}", settings.upload_dir.display());
    println!(
        "   Import: batches of {}, {}s timeout",
        settings.batch_size,
        settings.request_timeout.as_secs()
    );
    match AIClient::from_env() {
        Some(client) => println!("   🤖 LLM: {} ({})", client.model(), client.host()),
        None => println!("   🤖 LLM: not configured (set OPENAI_COMPATIBLE_API_KEY)"),
    }

    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                let summary = db.dashboard(None, None)?;
                let recurring = db.list_recurring_expenses(true)?;
                let monthly: f64 = recurring.iter().map(|e| e.amount).sum();

                println!();
                println!("   Transactions: {}", summary.transaction_count);
                println!(
                    "   Recurring: {} active ({} per month)",
                    recurring.len(),
                    format_brl(monthly)
                );
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    Ok(())
}
