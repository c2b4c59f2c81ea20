//! Health and reference data

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use caixa_core::models::{Category, TransactionType};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub llm_configured: bool,
}

/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        llm_configured: state.ai.is_some(),
    })
}

#[derive(Serialize)]
pub struct CategoryInfo {
    pub id: Category,
    pub label: &'static str,
}

#[derive(Serialize)]
pub struct CategoriesResponse {
    pub income: Vec<CategoryInfo>,
    pub expense: Vec<CategoryInfo>,
}

fn infos(kind: TransactionType) -> Vec<CategoryInfo> {
    Category::for_type(kind)
        .iter()
        .map(|&id| CategoryInfo {
            id,
            label: id.label(),
        })
        .collect()
}

/// GET /api/categories - The fixed category taxonomy
pub async fn list_categories() -> Json<CategoriesResponse> {
    Json(CategoriesResponse {
        income: infos(TransactionType::Income),
        expense: infos(TransactionType::Expense),
    })
}
