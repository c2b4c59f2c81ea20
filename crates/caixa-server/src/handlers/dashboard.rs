//! Dashboard and report handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use serde::Deserialize;

use super::validate_date_param;
use crate::{AppError, AppState};
use caixa_core::dashboard::DashboardSummary;
use caixa_core::report::report_file_name;

/// Optional inclusive date range
#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl PeriodQuery {
    fn validated(self) -> Result<(Option<String>, Option<String>), AppError> {
        Ok((
            validate_date_param(self.from, "from")?,
            validate_date_param(self.to, "to")?,
        ))
    }
}

/// GET /api/dashboard - Totals, category breakdown and monthly series
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PeriodQuery>,
) -> Result<Json<DashboardSummary>, AppError> {
    let (from, to) = params.validated()?;
    let summary = state.db.dashboard(from.as_deref(), to.as_deref())?;
    Ok(Json(summary))
}

/// GET /api/reports/monthly.csv - Monthly totals as a CSV download
pub async fn monthly_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PeriodQuery>,
) -> Result<Response, AppError> {
    let (from, to) = params.validated()?;
    let csv = state.db.monthly_report(from.as_deref(), to.as_deref())?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                report_file_name(from.as_deref(), to.as_deref())
            ),
        )
        .body(Body::from(csv))
        .map_err(|e| AppError::internal(&e.to_string()))
}
