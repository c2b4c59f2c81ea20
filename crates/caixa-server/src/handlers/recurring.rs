//! Recurring expense handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Local;
use serde::Deserialize;

use crate::{AppError, AppState, SuccessResponse};
use caixa_core::models::{NewRecurringExpense, RecurringExpense, RecurringExpenseUpdate};
use caixa_core::recurring::{UpcomingExpense, DEFAULT_REMINDER_DAYS};

/// Longest reminder horizon accepted
const MAX_REMINDER_DAYS: i64 = 366;

#[derive(Debug, Deserialize)]
pub struct RecurringQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub days: Option<i64>,
}

/// GET /api/recurring
pub async fn list_recurring(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecurringQuery>,
) -> Result<Json<Vec<RecurringExpense>>, AppError> {
    Ok(Json(state.db.list_recurring_expenses(params.active_only)?))
}

/// POST /api/recurring
pub async fn create_recurring(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewRecurringExpense>,
) -> Result<(StatusCode, Json<RecurringExpense>), AppError> {
    let id = state
        .db
        .create_recurring_expense(&body)
        .map_err(AppError::from_core)?;
    let stored = state
        .db
        .get_recurring_expense(id)?
        .ok_or_else(|| AppError::internal("Recurring expense vanished after insert"))?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// PATCH /api/recurring/:id - Partial update (e.g. toggle `active`)
pub async fn update_recurring(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<RecurringExpenseUpdate>,
) -> Result<Json<RecurringExpense>, AppError> {
    let updated = state
        .db
        .update_recurring_expense(id, &body)
        .map_err(AppError::from_core)?;
    Ok(Json(updated))
}

/// DELETE /api/recurring/:id
pub async fn delete_recurring(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    state
        .db
        .delete_recurring_expense(id)
        .map_err(AppError::from_core)?;
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/recurring/upcoming?days=N - Active expenses due soon
pub async fn upcoming_recurring(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UpcomingQuery>,
) -> Result<Json<Vec<UpcomingExpense>>, AppError> {
    let days = params
        .days
        .unwrap_or(DEFAULT_REMINDER_DAYS)
        .clamp(0, MAX_REMINDER_DAYS);
    let today = Local::now().date_naive();
    Ok(Json(state.db.upcoming_recurring_expenses(today, days)?))
}
