//! Statement import handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    Json,
};
use tracing::info;

use crate::{get_user_email, AppError, AppState, MAX_UPLOAD_SIZE};
use caixa_core::import::{
    ImportPipeline, ImportProgress, ImportRequest, ImportSummary, ProgressController,
    StatementFile, SUCCESS_RESET_DELAY,
};

fn pipeline(state: &AppState) -> Result<ImportPipeline, AppError> {
    state
        .import
        .clone()
        .ok_or_else(|| AppError::unavailable("LLM backend not configured"))
}

/// POST /api/import - Import a bank statement
///
/// Expects multipart form with:
/// - file: CSV, PDF or text statement (required, max 10MB)
/// - bank_account: label applied to every imported transaction (required)
///
/// The run and its success reset live on a detached task, so a dropped
/// connection still ends in `idle`; progress is at `/api/import/status`.
pub async fn import_statement(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<ImportSummary>, AppError> {
    let pipeline = pipeline(&state)?;

    let mut file: Option<StatementFile> = None;
    let mut bank_account = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("extrato").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;

                if bytes.len() > MAX_UPLOAD_SIZE {
                    return Err(AppError::bad_request(&format!(
                        "File too large. Maximum size is {} MB",
                        MAX_UPLOAD_SIZE / 1024 / 1024
                    )));
                }
                file = Some(StatementFile::new(file_name, bytes.to_vec()));
            }
            "bank_account" => {
                bank_account = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read bank_account"))?;
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| AppError::bad_request("Missing file field"))?;
    info!(file = %file.file_name, size = file.bytes.len(), "Statement upload received");

    let request = ImportRequest {
        file,
        bank_account,
        created_by: Some(get_user_email(&headers)),
    };

    let summary = tokio::spawn(async move {
        let result = pipeline.run(request).await;
        if result.is_ok() {
            pipeline.progress().reset_after(SUCCESS_RESET_DELAY);
        }
        result
    })
    .await?
    .map_err(AppError::from_import)?;

    Ok(Json(summary))
}

/// GET /api/import/status - Latest import progress
pub async fn import_status(State(state): State<Arc<AppState>>) -> Json<ImportProgress> {
    let snapshot = match state.import {
        Some(ref pipeline) => pipeline.progress().snapshot(),
        None => ProgressController::new().snapshot(),
    };
    Json(snapshot)
}

/// POST /api/import/retry - Re-run the last failed import from the top
pub async fn retry_import(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ImportSummary>, AppError> {
    let pipeline = pipeline(&state)?;

    let summary = tokio::spawn(async move {
        let result = pipeline.retry().await;
        if result.is_ok() {
            pipeline.progress().reset_after(SUCCESS_RESET_DELAY);
        }
        result
    })
    .await?
    .map_err(AppError::from_import)?;

    Ok(Json(summary))
}
