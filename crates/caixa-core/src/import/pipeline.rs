//! Statement import orchestration
//!
//! Stages run strictly in sequence: read, extract, validate, categorize,
//! persist. Every attempt starts from the uploaded file; retrying a failed
//! run repeats all stages with nothing reused from the failed attempt.

use std::sync::{Arc, Mutex};

use chrono::{Datelike, Local};
use serde::Serialize;
use tracing::{error, info};

use crate::ai::LlmBackend;
use crate::config::DEFAULT_BATCH_SIZE;
use crate::prompts::{PromptId, PromptLibrary};
use crate::storage::FileStorage;
use crate::store::TransactionStore;

use super::categorizer::{BatchCategorizer, CategorizationStats};
use super::error::ImportError;
use super::extraction::extract_transactions;
use super::persistence::to_new_transactions;
use super::reader::{read_statement, StatementContent, StatementFile};
use super::status::{checkpoints, ProgressController};
use super::validation::validate_transactions;

/// Input for one import run
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub file: StatementFile,
    /// Label tagged onto every imported record
    pub bank_account: String,
    /// User that triggered the import
    pub created_by: Option<String>,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub ids: Vec<i64>,
    /// Records returned by extraction, before validation
    pub extracted: usize,
    /// Records dropped by validation
    pub skipped: usize,
    pub categorization: CategorizationStats,
}

/// Runs statement imports against pluggable collaborators
#[derive(Clone)]
pub struct ImportPipeline {
    llm: Arc<dyn LlmBackend>,
    store: Arc<dyn TransactionStore>,
    storage: Arc<dyn FileStorage>,
    prompts: Arc<PromptLibrary>,
    progress: ProgressController,
    batch_size: usize,
    failed_request: Arc<Mutex<Option<ImportRequest>>>,
}

impl ImportPipeline {
    pub fn new(
        llm: Arc<dyn LlmBackend>,
        store: Arc<dyn TransactionStore>,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            llm,
            store,
            storage,
            prompts: Arc::new(PromptLibrary::new()),
            progress: ProgressController::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            failed_request: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_prompts(mut self, prompts: PromptLibrary) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    pub fn progress(&self) -> &ProgressController {
        &self.progress
    }

    /// Whether a failed run is waiting to be retried
    pub fn has_failed_request(&self) -> bool {
        self.failed_request
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    /// Import a statement
    pub async fn run(&self, request: ImportRequest) -> Result<ImportSummary, ImportError> {
        let bank_account = request.bank_account.trim();
        if bank_account.is_empty() {
            return Err(ImportError::MissingBankAccount);
        }
        let request = ImportRequest {
            bank_account: bank_account.to_string(),
            ..request
        };

        if !self.progress.start() {
            return Err(ImportError::AlreadyRunning);
        }

        info!(
            file = %request.file.file_name,
            bank_account = %request.bank_account,
            "Starting statement import"
        );

        match self.execute(&request).await {
            Ok(summary) => {
                self.store_failed(None);
                self.progress.succeed(summary.imported);
                info!(
                    imported = summary.imported,
                    skipped = summary.skipped,
                    failed_batches = summary.categorization.failed_batches,
                    "Statement import complete"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(error = %e, file = %request.file.file_name, "Statement import failed");
                self.progress.fail(&e);
                self.store_failed(Some(request));
                Err(e)
            }
        }
    }

    /// Re-run the last failed import from the top
    pub async fn retry(&self) -> Result<ImportSummary, ImportError> {
        if self.progress.is_running() {
            return Err(ImportError::AlreadyRunning);
        }
        let request = self
            .failed_request
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or(ImportError::NothingToRetry)?;
        info!(file = %request.file.file_name, "Retrying statement import");
        self.run(request).await
    }

    async fn execute(&self, request: &ImportRequest) -> Result<ImportSummary, ImportError> {
        let content = read_statement(&request.file, self.storage.as_ref())
            .await
            .map_err(ImportError::Read)?;
        let reading = match content {
            StatementContent::Text(_) => "Extraindo transações do extrato...",
            StatementContent::FileUrl(_) => "Lendo PDF e extraindo transações...",
        };
        self.progress.advance(checkpoints::FILE_READ, reading);

        let extract_prompt = self
            .prompts
            .load(PromptId::ExtractTransactions)
            .map_err(ImportError::Llm)?;
        let raw = extract_transactions(
            self.llm.as_ref(),
            &extract_prompt,
            &content,
            Local::now().year(),
        )
        .await?;
        self.progress.advance(
            checkpoints::EXTRACTED,
            &format!("{} transações encontradas. Validando...", raw.len()),
        );

        let valid = validate_transactions(&raw);
        if valid.is_empty() {
            return Err(ImportError::NoValidTransactions);
        }
        self.progress.advance(
            checkpoints::VALIDATED,
            &format!("Categorizando {} transações...", valid.len()),
        );

        // Categorization failures degrade to default categories, never abort
        let categorize_prompt = self
            .prompts
            .load(PromptId::CategorizeTransactions)
            .map_err(ImportError::Llm)?;
        let categorizer =
            BatchCategorizer::new(self.llm.as_ref(), &categorize_prompt, self.batch_size);
        let (categories, stats) = categorizer
            .categorize(&valid, |done, total| {
                let span = u32::from(checkpoints::CATEGORIZED - checkpoints::VALIDATED);
                let step = span * done as u32 / total.max(1) as u32;
                self.progress.advance(
                    checkpoints::VALIDATED + step as u8,
                    &format!("Categorizando lote {} de {}...", done, total),
                );
            })
            .await;

        self.progress
            .advance(checkpoints::SAVING, "Salvando transações...");
        let records = to_new_transactions(
            &valid,
            &categories,
            &request.bank_account,
            Local::now().date_naive(),
            request.created_by.as_deref(),
        );
        let ids = self
            .store
            .bulk_create(&records)
            .await
            .map_err(ImportError::Persistence)?;

        Ok(ImportSummary {
            imported: ids.len(),
            ids,
            extracted: raw.len(),
            skipped: raw.len() - valid.len(),
            categorization: stats,
        })
    }

    fn store_failed(&self, request: Option<ImportRequest>) {
        if let Ok(mut slot) = self.failed_request.lock() {
            *slot = request;
        }
    }
}
