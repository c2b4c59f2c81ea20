//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::validate_date_param;
use crate::{get_user_email, AppError, AppState, SuccessResponse, MAX_PAGE_LIMIT};
use caixa_core::db::TransactionFilter;
use caixa_core::models::{ManualTransaction, Transaction, TransactionType};

/// Query parameters for listing transactions
#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    /// income or expense
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Start date (YYYY-MM-DD, inclusive)
    pub from: Option<String>,
    /// End date (YYYY-MM-DD, inclusive)
    pub to: Option<String>,
    pub bank_account: Option<String>,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct TransactionResponse {
    pub transactions: Vec<Transaction>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// GET /api/transactions - List transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionQuery>,
) -> Result<Json<TransactionResponse>, AppError> {
    // Input validation: clamp pagination parameters
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    let offset = params.offset.max(0);

    let mut filter = TransactionFilter::date_range(
        validate_date_param(params.from, "from")?,
        validate_date_param(params.to, "to")?,
    );
    filter.transaction_type = params.transaction_type;
    filter.bank_account = params.bank_account.filter(|s| !s.trim().is_empty());

    let total = state.db.count_transactions(&filter)?;
    filter.limit = Some(limit);
    filter.offset = Some(offset);
    let transactions = state.db.list_transactions(&filter)?;

    Ok(Json(TransactionResponse {
        transactions,
        total,
        limit,
        offset,
    }))
}

/// POST /api/transactions - Record a transaction by hand
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ManualTransaction>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let user_email = get_user_email(&headers);
    let new = body
        .into_new(Some(&user_email))
        .map_err(AppError::from_core)?;

    let id = state.db.create_transaction(&new)?;
    let stored = state
        .db
        .get_transaction(id)?
        .ok_or_else(|| AppError::internal("Transaction vanished after insert"))?;

    info!(id, user = %user_email, "Manual transaction created");
    Ok((StatusCode::CREATED, Json(stored)))
}

/// DELETE /api/transactions/:id
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .db
        .delete_transaction(id)
        .map_err(AppError::from_core)?;
    Ok(Json(SuccessResponse { success: true }))
}
