//! Statement import command

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use caixa_core::ai::AIClient;
use caixa_core::config::CaixaConfig;
use caixa_core::db::Database;
use caixa_core::import::{
    ImportPipeline, ImportProgress, ImportRequest, ImportStatus, ImportSummary, StatementFile,
};
use caixa_core::storage::LocalFileStorage;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::load_settings;

pub async fn cmd_import(db: &Database, ai: AIClient, file: &Path, account: &str) -> Result<()> {
    let settings = load_settings();
    let summary = import_statement(db, ai, file, account, &settings).await?;

    println!();
    println!("✅ Import complete!");
    println!("   Imported: {} transactions", summary.imported);
    if summary.skipped > 0 {
        println!(
            "   Skipped:  {} (missing date, description, amount or type)",
            summary.skipped
        );
    }
    if summary.categorization.failed_batches > 0 {
        println!(
            "   ⚠️  {} of {} categorization batches failed; those transactions got the default category",
            summary.categorization.failed_batches, summary.categorization.batches
        );
    }
    println!();
    println!("   Review them with: caixa transactions list");

    Ok(())
}

/// Run one statement through the pipeline, printing progress as it moves
pub async fn import_statement(
    db: &Database,
    ai: AIClient,
    file: &Path,
    account: &str,
    settings: &CaixaConfig,
) -> Result<ImportSummary> {
    let bytes = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "extrato".to_string());

    println!("📥 Importing {} into '{}'...", file_name, account);

    let pipeline = ImportPipeline::new(
        Arc::new(ai),
        Arc::new(db.clone()),
        Arc::new(LocalFileStorage::new(settings.upload_dir.clone())),
    )
    .with_batch_size(settings.batch_size);

    let printer = spawn_progress_printer(pipeline.progress().subscribe());

    let request = ImportRequest {
        file: StatementFile::new(file_name, bytes),
        bank_account: account.to_string(),
        created_by: None,
    };
    let result = pipeline.run(request).await;

    // The pipeline owns the only sender; dropping it lets the printer drain
    drop(pipeline);
    if let Err(e) = printer.await {
        debug!(error = %e, "Progress printer stopped early");
    }

    result.map_err(|e| {
        let message = e.user_message();
        println!("   ❌ {}", message.title);
        anyhow::anyhow!("{}. {}", message.title, message.detail)
    })
}

/// Print progress until the sending side closes, returning the printed lines
///
/// Updates are coalesced, so only the latest state is guaranteed to show up.
pub fn spawn_progress_printer(
    mut updates: watch::Receiver<ImportProgress>,
) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let mut printed = Vec::new();
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            if state.status.is_running() || state.status == ImportStatus::Success {
                let line = format!("[{:>3}%] {}", state.progress, state.message);
                println!("   {}", line);
                printed.push(line);
            }
        }
        printed
    })
}
